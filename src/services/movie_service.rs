use std::collections::HashMap;

use chrono::NaiveDate;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set,
    TransactionTrait,
};

use crate::entities::{movie_entity as movies, movie_genre_entity as genres, purchase_entity};
use crate::error::{AppError, AppResult};
use crate::models::{MovieRequest, MovieResponse, MovieSearchRequest, Page, clamp_page_size};

#[derive(Clone)]
pub struct MovieService {
    pool: DatabaseConnection,
}

impl MovieService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn get_movie(&self, id: i64) -> AppResult<MovieResponse> {
        let movie = self
            .find_model(&self.pool, id)
            .await?
            .ok_or_else(|| not_found(id))?;
        let mut genre_map = self.load_genres(&[movie.id]).await?;
        let genre_list = genre_map.remove(&movie.id).unwrap_or_default();
        Ok(MovieResponse::from_model(movie, genre_list))
    }

    pub(crate) async fn find_model<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: i64,
    ) -> AppResult<Option<movies::Model>> {
        Ok(movies::Entity::find_by_id(id).one(conn).await?)
    }

    pub async fn list_movies(&self) -> AppResult<Vec<MovieResponse>> {
        let list = movies::Entity::find()
            .order_by_asc(movies::Column::Title)
            .all(&self.pool)
            .await?;
        self.attach_genres(list).await
    }

    /// 条件搜索 + 分页 (page 从 0 开始)
    pub async fn search(&self, query: &MovieSearchRequest) -> AppResult<Page<MovieResponse>> {
        let sort_column = sort_column(&query.sort_by)?;
        let order = if query.ascending { Order::Asc } else { Order::Desc };
        let size = clamp_page_size(query.size);

        let mut cond = Condition::all();
        if let Some(title) = non_empty(&query.title) {
            cond = cond.add(lower_like(movies::Column::Title, title));
        }
        if let Some(director) = non_empty(&query.director) {
            cond = cond.add(lower_like(movies::Column::Director, director));
        }
        if let Some(genre) = non_empty(&query.genre) {
            let matching = genres::Entity::find()
                .select_only()
                .column(genres::Column::MovieId)
                .filter(lower_like(genres::Column::Genre, genre))
                .into_query();
            cond = cond.add(movies::Column::Id.in_subquery(matching));
        }
        if let Some(start) = query.release_year_start {
            cond = cond.add(movies::Column::ReleaseDate.gte(start));
        }
        if let Some(end) = query.release_year_end {
            cond = cond.add(movies::Column::ReleaseDate.lte(end));
        }
        if let Some(min_rating) = query.min_rating {
            cond = cond.add(movies::Column::Rating.gte(min_rating));
        }
        if let Some(featured) = query.featured {
            cond = cond.add(movies::Column::Featured.eq(featured));
        }

        let paginator = movies::Entity::find()
            .filter(cond)
            .order_by(sort_column, order)
            .order_by_asc(movies::Column::Id)
            .paginate(&self.pool, size);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(query.page).await?;
        let content = self.attach_genres(items).await?;

        Ok(Page::new(content, query.page, size, total))
    }

    pub async fn create_movie(&self, request: MovieRequest) -> AppResult<MovieResponse> {
        validate_movie(&request)?;

        let txn = self.pool.begin().await?;
        let movie = movies::ActiveModel {
            title: Set(request.title.trim().to_string()),
            director: Set(request.director.trim().to_string()),
            release_date: Set(request.release_date),
            duration_minutes: Set(request.duration_minutes),
            rating: Set(request.rating),
            plot: Set(request.plot),
            featured: Set(request.featured),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        let genre_list = insert_genres(&txn, movie.id, &request.genres).await?;
        txn.commit().await?;

        log::info!("Movie created: {} (id={})", movie.title, movie.id);
        Ok(MovieResponse::from_model(movie, genre_list))
    }

    pub async fn update_movie(&self, id: i64, request: MovieRequest) -> AppResult<MovieResponse> {
        validate_movie(&request)?;

        let txn = self.pool.begin().await?;
        let existing = self
            .find_model(&txn, id)
            .await?
            .ok_or_else(|| not_found(id))?;

        let mut am = existing.into_active_model();
        am.title = Set(request.title.trim().to_string());
        am.director = Set(request.director.trim().to_string());
        am.release_date = Set(request.release_date);
        am.duration_minutes = Set(request.duration_minutes);
        am.rating = Set(request.rating);
        am.plot = Set(request.plot);
        am.featured = Set(request.featured);
        let movie = am.update(&txn).await?;

        genres::Entity::delete_many()
            .filter(genres::Column::MovieId.eq(id))
            .exec(&txn)
            .await?;
        let genre_list = insert_genres(&txn, id, &request.genres).await?;
        txn.commit().await?;

        Ok(MovieResponse::from_model(movie, genre_list))
    }

    pub async fn delete_movie(&self, id: i64) -> AppResult<()> {
        let txn = self.pool.begin().await?;
        if self.find_model(&txn, id).await?.is_none() {
            return Err(not_found(id));
        }

        // 已有购买记录的影片不可删除
        let purchased = purchase_entity::Entity::find()
            .filter(purchase_entity::Column::MovieId.eq(id))
            .count(&txn)
            .await?;
        if purchased > 0 {
            return Err(AppError::ValidationError(
                "Movie has purchase records and cannot be deleted".to_string(),
            ));
        }

        genres::Entity::delete_many()
            .filter(genres::Column::MovieId.eq(id))
            .exec(&txn)
            .await?;
        movies::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        log::info!("Movie deleted: id={id}");
        Ok(())
    }

    /// 开发环境示例数据，表非空时跳过
    pub async fn seed_sample_movies(&self) -> AppResult<usize> {
        if movies::Entity::find().count(&self.pool).await? > 0 {
            return Ok(0);
        }

        let samples = sample_movies();
        let count = samples.len();
        for request in samples {
            self.create_movie(request).await?;
        }
        log::info!("Seeded {count} sample movies");
        Ok(count)
    }

    async fn load_genres(&self, ids: &[i64]) -> AppResult<HashMap<i64, Vec<String>>> {
        let mut map: HashMap<i64, Vec<String>> = HashMap::new();
        if ids.is_empty() {
            return Ok(map);
        }
        let rows = genres::Entity::find()
            .filter(genres::Column::MovieId.is_in(ids.iter().copied()))
            .all(&self.pool)
            .await?;
        for row in rows {
            map.entry(row.movie_id).or_default().push(row.genre);
        }
        Ok(map)
    }

    async fn attach_genres(&self, list: Vec<movies::Model>) -> AppResult<Vec<MovieResponse>> {
        let ids: Vec<i64> = list.iter().map(|m| m.id).collect();
        let mut genre_map = self.load_genres(&ids).await?;
        Ok(list
            .into_iter()
            .map(|m| {
                let genre_list = genre_map.remove(&m.id).unwrap_or_default();
                MovieResponse::from_model(m, genre_list)
            })
            .collect())
    }
}

async fn insert_genres<C: ConnectionTrait>(
    conn: &C,
    movie_id: i64,
    requested: &[String],
) -> AppResult<Vec<String>> {
    let mut unique: Vec<String> = requested
        .iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect();
    unique.sort();
    unique.dedup();

    for genre in &unique {
        genres::ActiveModel {
            movie_id: Set(movie_id),
            genre: Set(genre.clone()),
        }
        .insert(conn)
        .await?;
    }
    Ok(unique)
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Movie not found with ID: {id}"))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn lower_like<C: ColumnTrait>(column: C, needle: &str) -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(format!("%{}%", needle.to_lowercase()))
}

fn sort_column(sort_by: &str) -> AppResult<movies::Column> {
    match sort_by {
        "title" => Ok(movies::Column::Title),
        "director" => Ok(movies::Column::Director),
        "releaseDate" | "release_date" => Ok(movies::Column::ReleaseDate),
        "rating" => Ok(movies::Column::Rating),
        "durationMinutes" | "duration_minutes" => Ok(movies::Column::DurationMinutes),
        "id" => Ok(movies::Column::Id),
        other => Err(AppError::ValidationError(format!(
            "Unsupported sort field: {other}"
        ))),
    }
}

fn validate_movie(request: &MovieRequest) -> AppResult<()> {
    if request.title.trim().is_empty() {
        return Err(AppError::ValidationError("Title is required".to_string()));
    }
    if request.director.trim().is_empty() {
        return Err(AppError::ValidationError("Director is required".to_string()));
    }
    if !(0.0..=10.0).contains(&request.rating) {
        return Err(AppError::ValidationError(
            "Rating must be between 0 and 10".to_string(),
        ));
    }
    if matches!(request.duration_minutes, Some(d) if d <= 0) {
        return Err(AppError::ValidationError(
            "Duration must be positive".to_string(),
        ));
    }
    Ok(())
}

fn sample_movie(
    title: &str,
    director: &str,
    genre_list: &[&str],
    release_date: (i32, u32, u32),
    duration_minutes: i32,
    rating: f64,
    plot: &str,
    featured: bool,
) -> MovieRequest {
    MovieRequest {
        title: title.to_string(),
        director: director.to_string(),
        genres: genre_list.iter().map(|g| g.to_string()).collect(),
        release_date: NaiveDate::from_ymd_opt(release_date.0, release_date.1, release_date.2),
        duration_minutes: Some(duration_minutes),
        rating,
        plot: Some(plot.to_string()),
        featured,
    }
}

fn sample_movies() -> Vec<MovieRequest> {
    vec![
        sample_movie(
            "The Shawshank Redemption",
            "Frank Darabont",
            &["Drama"],
            (1994, 9, 23),
            142,
            9.3,
            "Two imprisoned men bond over a number of years, finding solace and eventual redemption through acts of common decency.",
            true,
        ),
        sample_movie(
            "The Godfather",
            "Francis Ford Coppola",
            &["Crime", "Drama"],
            (1972, 3, 24),
            175,
            9.2,
            "The aging patriarch of an organized crime dynasty transfers control to his reluctant son.",
            true,
        ),
        sample_movie(
            "Pulp Fiction",
            "Quentin Tarantino",
            &["Crime", "Drama"],
            (1994, 10, 14),
            154,
            8.9,
            "The lives of two mob hitmen, a boxer, a gangster and his wife, and a pair of diner bandits intertwine in four tales of violence and redemption.",
            false,
        ),
        sample_movie(
            "The Dark Knight",
            "Christopher Nolan",
            &["Action", "Crime", "Drama", "Thriller"],
            (2008, 7, 18),
            152,
            9.0,
            "When the menace known as the Joker wreaks havoc and chaos on the people of Gotham, Batman must accept one of the greatest psychological and physical tests of his ability to fight injustice.",
            true,
        ),
        sample_movie(
            "Forrest Gump",
            "Robert Zemeckis",
            &["Drama", "Romance"],
            (1994, 7, 6),
            142,
            8.8,
            "The presidencies of Kennedy and Johnson, the Vietnam War, the Watergate scandal and other historical events unfold from the perspective of an Alabama man with an IQ of 75, whose only desire is to be reunited with his childhood sweetheart.",
            false,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::setup_db;

    async fn seeded() -> MovieService {
        let service = MovieService::new(setup_db().await);
        assert_eq!(service.seed_sample_movies().await.unwrap(), 5);
        service
    }

    fn titles(page: &Page<MovieResponse>) -> Vec<&str> {
        page.content.iter().map(|m| m.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_seed_only_when_empty() {
        let service = seeded().await;
        assert_eq!(service.seed_sample_movies().await.unwrap(), 0);
        assert_eq!(service.list_movies().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_search_filters() {
        let service = seeded().await;

        let by_title = MovieSearchRequest {
            title: Some("godFATHER".to_string()),
            ..Default::default()
        };
        assert_eq!(titles(&service.search(&by_title).await.unwrap()), vec!["The Godfather"]);

        let by_genre = MovieSearchRequest {
            genre: Some("thrill".to_string()),
            ..Default::default()
        };
        assert_eq!(titles(&service.search(&by_genre).await.unwrap()), vec!["The Dark Knight"]);

        let nineties_featured = MovieSearchRequest {
            release_year_start: NaiveDate::from_ymd_opt(1990, 1, 1),
            release_year_end: NaiveDate::from_ymd_opt(1999, 12, 31),
            featured: Some(true),
            ..Default::default()
        };
        assert_eq!(
            titles(&service.search(&nineties_featured).await.unwrap()),
            vec!["The Shawshank Redemption"]
        );

        let top_rated = MovieSearchRequest {
            min_rating: Some(9.1),
            sort_by: "rating".to_string(),
            ascending: false,
            ..Default::default()
        };
        assert_eq!(
            titles(&service.search(&top_rated).await.unwrap()),
            vec!["The Shawshank Redemption", "The Godfather"]
        );
    }

    #[tokio::test]
    async fn test_search_paginates() {
        let service = seeded().await;
        let first = MovieSearchRequest {
            page: 0,
            size: 2,
            ..Default::default()
        };
        let page = service.search(&first).await.unwrap();
        assert_eq!(page.total_elements, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(titles(&page), vec!["Forrest Gump", "Pulp Fiction"]);

        let second = MovieSearchRequest {
            page: 1,
            size: 2,
            ..Default::default()
        };
        let page = service.search(&second).await.unwrap();
        assert_eq!(titles(&page), vec!["The Dark Knight", "The Godfather"]);

        let last = MovieSearchRequest {
            page: 2,
            size: 2,
            ..Default::default()
        };
        let page = service.search(&last).await.unwrap();
        assert_eq!(titles(&page), vec!["The Shawshank Redemption"]);
    }

    #[tokio::test]
    async fn test_unknown_sort_field_is_rejected() {
        let service = seeded().await;
        let query = MovieSearchRequest {
            sort_by: "plot; drop table movies".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            service.search(&query).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let service = MovieService::new(setup_db().await);
        let created = service
            .create_movie(MovieRequest {
                title: "Heat".to_string(),
                director: "Michael Mann".to_string(),
                genres: vec!["Crime".to_string(), "Crime".to_string(), "Drama".to_string()],
                release_date: NaiveDate::from_ymd_opt(1995, 12, 15),
                duration_minutes: Some(170),
                rating: 8.3,
                plot: None,
                featured: false,
            })
            .await
            .unwrap();
        assert_eq!(created.genres, vec!["Crime", "Drama"]);

        let mut update = MovieRequest {
            title: "Heat".to_string(),
            director: "Michael Mann".to_string(),
            genres: vec!["Thriller".to_string()],
            release_date: created.release_date,
            duration_minutes: created.duration_minutes,
            rating: 8.4,
            plot: None,
            featured: true,
        };
        let updated = service.update_movie(created.id, update.clone()).await.unwrap();
        assert_eq!(updated.genres, vec!["Thriller"]);
        assert!(updated.featured);
        assert_eq!(service.get_movie(created.id).await.unwrap(), updated);

        update.rating = 11.0;
        assert!(matches!(
            service.update_movie(created.id, update).await,
            Err(AppError::ValidationError(_))
        ));

        service.delete_movie(created.id).await.unwrap();
        assert!(matches!(
            service.get_movie(created.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_movie(created.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}

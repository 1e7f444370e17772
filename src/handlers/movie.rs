use actix_web::{HttpResponse, ResponseError, Result, web};

use crate::models::*;
use crate::services::MovieService;

#[utoipa::path(
    get,
    path = "/movies",
    tag = "movie",
    responses(
        (status = 200, description = "获取影片列表成功", body = [MovieResponse])
    )
)]
pub async fn list_movies(movie_service: web::Data<MovieService>) -> Result<HttpResponse> {
    match movie_service.list_movies().await {
        Ok(movies) => Ok(HttpResponse::Ok().json(ApiResponse::success(movies))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/movies/{id}",
    tag = "movie",
    params(
        ("id" = i64, Path, description = "影片ID")
    ),
    responses(
        (status = 200, description = "获取影片成功", body = MovieResponse),
        (status = 404, description = "影片不存在")
    )
)]
pub async fn get_movie(
    movie_service: web::Data<MovieService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match movie_service.get_movie(path.into_inner()).await {
        Ok(movie) => Ok(HttpResponse::Ok().json(ApiResponse::success(movie))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/movies/search",
    tag = "movie",
    request_body = MovieSearchRequest,
    responses(
        (status = 200, description = "搜索成功"),
        (status = 400, description = "排序字段无效")
    )
)]
pub async fn search_movies(
    movie_service: web::Data<MovieService>,
    request: web::Json<MovieSearchRequest>,
) -> Result<HttpResponse> {
    match movie_service.search(&request).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/movies",
    tag = "movie",
    request_body = MovieRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "创建成功", body = MovieResponse),
        (status = 400, description = "请求参数错误"),
        (status = 401, description = "未授权")
    )
)]
pub async fn create_movie(
    movie_service: web::Data<MovieService>,
    request: web::Json<MovieRequest>,
) -> Result<HttpResponse> {
    match movie_service.create_movie(request.into_inner()).await {
        Ok(movie) => Ok(HttpResponse::Created().json(ApiResponse::success(movie))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/movies/{id}",
    tag = "movie",
    params(
        ("id" = i64, Path, description = "影片ID")
    ),
    request_body = MovieRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "更新成功", body = MovieResponse),
        (status = 404, description = "影片不存在")
    )
)]
pub async fn update_movie(
    movie_service: web::Data<MovieService>,
    path: web::Path<i64>,
    request: web::Json<MovieRequest>,
) -> Result<HttpResponse> {
    match movie_service
        .update_movie(path.into_inner(), request.into_inner())
        .await
    {
        Ok(movie) => Ok(HttpResponse::Ok().json(ApiResponse::success(movie))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/movies/{id}",
    tag = "movie",
    params(
        ("id" = i64, Path, description = "影片ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 204, description = "删除成功"),
        (status = 404, description = "影片不存在")
    )
)]
pub async fn delete_movie(
    movie_service: web::Data<MovieService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match movie_service.delete_movie(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn movie_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/movies")
            .route("", web::get().to(list_movies))
            .route("", web::post().to(create_movie))
            .route("/search", web::post().to(search_movies))
            .route("/{id}", web::get().to(get_movie))
            .route("/{id}", web::put().to(update_movie))
            .route("/{id}", web::delete().to(delete_movie)),
    );
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::movie_entity;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovieRequest {
    #[schema(example = "The Godfather")]
    pub title: String,
    #[schema(example = "Francis Ford Coppola")]
    pub director: String,
    #[serde(default)]
    pub genres: Vec<String>,
    pub release_date: Option<NaiveDate>,
    pub duration_minutes: Option<i32>,
    #[schema(example = 9.2)]
    pub rating: f64,
    pub plot: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MovieResponse {
    pub id: i64,
    pub title: String,
    pub director: String,
    pub genres: Vec<String>,
    pub release_date: Option<NaiveDate>,
    pub duration_minutes: Option<i32>,
    pub rating: f64,
    pub plot: Option<String>,
    pub featured: bool,
}

impl MovieResponse {
    pub fn from_model(m: movie_entity::Model, mut genres: Vec<String>) -> Self {
        genres.sort();
        Self {
            id: m.id,
            title: m.title,
            director: m.director,
            genres,
            release_date: m.release_date,
            duration_minutes: m.duration_minutes,
            rating: m.rating,
            plot: m.plot,
            featured: m.featured,
        }
    }
}

fn default_size() -> u64 {
    10
}

fn default_sort_by() -> String {
    "title".to_string()
}

fn default_ascending() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovieSearchRequest {
    pub title: Option<String>,
    pub director: Option<String>,
    pub genre: Option<String>,
    pub release_year_start: Option<NaiveDate>,
    pub release_year_end: Option<NaiveDate>,
    pub min_rating: Option<f64>,
    pub featured: Option<bool>,
    /// 0-based
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_size")]
    pub size: u64,
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default = "default_ascending")]
    pub ascending: bool,
}

impl Default for MovieSearchRequest {
    fn default() -> Self {
        Self {
            title: None,
            director: None,
            genre: None,
            release_year_start: None,
            release_year_end: None,
            min_rating: None,
            featured: None,
            page: 0,
            size: default_size(),
            sort_by: default_sort_by(),
            ascending: default_ascending(),
        }
    }
}

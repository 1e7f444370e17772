//! 分页相关的数据结构

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::MovieResponse;

pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[aliases(MoviePage = Page<MovieResponse>)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    /// 0-based
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, page: u64, size: u64, total_elements: u64) -> Self {
        let total_pages = if size == 0 {
            0
        } else {
            total_elements.div_ceil(size)
        };
        Self {
            content,
            page,
            size,
            total_elements,
            total_pages,
        }
    }
}

/// Clamps the requested page size into `1..=MAX_PAGE_SIZE`.
pub fn clamp_page_size(size: u64) -> u64 {
    size.clamp(1, MAX_PAGE_SIZE)
}

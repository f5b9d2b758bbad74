use serde::Serialize;

use crate::error::AppError;

/// Largest accepted `per_page`.
pub const MAX_PER_PAGE: u64 = 100;

/// Pagination metadata included in list responses.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Pagination {
    /// Current page number (1-based).
    #[schema(example = 1)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 20)]
    pub per_page: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    /// Total number of pages.
    #[schema(example = 3)]
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        Self {
            page,
            per_page,
            total,
            total_pages: total.div_ceil(per_page),
        }
    }
}

/// Resolve optional paging parameters to `(page, per_page)`, 1-based.
pub fn resolve_page(page: Option<u64>, per_page: Option<u64>) -> Result<(u64, u64), AppError> {
    let page = page.unwrap_or(1);
    let per_page = per_page.unwrap_or(20);
    if page == 0 {
        return Err(AppError::Validation("page must be >= 1".into()));
    }
    if per_page == 0 || per_page > MAX_PER_PAGE {
        return Err(AppError::Validation(format!(
            "per_page must be between 1 and {MAX_PER_PAGE}"
        )));
    }
    Ok((page, per_page))
}

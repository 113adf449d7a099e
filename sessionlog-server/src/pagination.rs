//! Pagination for session log listings

use serde::Serialize;

/// Rows per page for every listing
pub const PAGE_SIZE: i64 = 100;

/// Page window over a listing, serialized alongside the rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// Total rows across all pages
    pub total: i64,
    /// Current page (1-indexed, clamped into range)
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    /// SQL OFFSET for this page
    #[serde(skip)]
    pub offset: i64,
}

impl Pagination {
    /// SQL LIMIT for this page
    pub fn limit(&self) -> i64 {
        self.page_size
    }
}

/// Clamp `requested_page` into `[1, total_pages]` and compute the offset
///
/// # Examples
/// ```
/// use sessionlog_server::pagination::calculate_pagination;
///
/// let p = calculate_pagination(250, 2);
/// assert_eq!((p.page, p.total_pages, p.offset), (2, 3, 100));
///
/// let p = calculate_pagination(250, 99);
/// assert_eq!((p.page, p.offset), (3, 200));
/// ```
pub fn calculate_pagination(total: i64, requested_page: i64) -> Pagination {
    let total_pages = (total + PAGE_SIZE - 1) / PAGE_SIZE;
    let page = requested_page.max(1).min(total_pages.max(1));

    Pagination {
        total,
        page,
        page_size: PAGE_SIZE,
        total_pages,
        offset: (page - 1) * PAGE_SIZE,
    }
}

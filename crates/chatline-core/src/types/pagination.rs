//! Pagination types for list endpoints.

use serde::{Deserialize, Serialize};

/// Default page size.
const DEFAULT_PAGE_SIZE: u64 = 50;
/// Maximum page size.
const MAX_PAGE_SIZE: u64 = 100;

/// Request parameters for paginated queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-based).
    #[serde(default = "default_page")]
    pub page: u64,
    /// Number of items per page.
    #[serde(default = "default_page_size")]
    pub limit: u64,
}

impl PageRequest {
    /// Creates a page request, clamping out-of-range values.
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Effective page size, clamped to the maximum.
    pub fn limit(&self) -> u64 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        (self.page.max(1) - 1) * self.limit()
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_page_size(),
        }
    }
}

/// A page of results together with paging metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Page number (1-based).
    pub page: u64,
    /// Page size used for the query.
    pub limit: u64,
    /// Whether more pages exist after this one.
    pub has_more: bool,
}

impl<T> PageResponse<T> {
    /// Builds a response, inferring `has_more` from a full page.
    pub fn new(items: Vec<T>, request: &PageRequest) -> Self {
        let has_more = items.len() as u64 == request.limit();
        Self {
            items,
            page: request.page.max(1),
            limit: request.limit(),
            has_more,
        }
    }
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

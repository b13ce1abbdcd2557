//! Page parameters accepted by list endpoints.

use serde::{Deserialize, Serialize};

/// 1-based page index and page size, as sent in the query string.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn first_page() -> u32 { 1 }
fn default_page_size() -> u32 { 20 }

impl Pagination {
    /// Zero-based page index and a page size clamped to 1..=100.
    pub fn normalize(self) -> (u64, u64) {
        let page = self.page.max(1);
        let page_size = self.page_size.clamp(1, 100);
        ((page - 1) as u64, page_size as u64)
    }
}

impl Default for Pagination {
    fn default() -> Self { Self { page: first_page(), page_size: default_page_size() } }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

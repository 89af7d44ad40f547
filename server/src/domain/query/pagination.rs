//! Page/limit to skip/limit conversion

use serde::Serialize;

/// One page of results plus the total row count of the unpaged query.
///
/// Pages are 1-based; pages below 1 are treated as the first page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pagination<T> {
    pub page: i64,
    pub limit: i64,
    pub total_rows: i64,
    pub rows: Vec<T>,
}

impl<T> Pagination<T> {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page,
            limit,
            total_rows: 0,
            rows: Vec::new(),
        }
    }

    /// Rows before this page; saturates instead of overflowing on huge pages
    pub fn skip(&self) -> i64 {
        self.page.saturating_sub(1).max(0).saturating_mul(self.limit.max(0))
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn set_total_rows(&mut self, total_rows: i64) {
        self.total_rows = total_rows;
    }

    pub fn set_rows(&mut self, rows: Vec<T>) {
        self.rows = rows;
    }

    pub fn total_pages(&self) -> i64 {
        if self.limit <= 0 || self.total_rows <= 0 {
            return 0;
        }
        let full = self.total_rows / self.limit;
        if self.total_rows % self.limit == 0 {
            full
        } else {
            full + 1
        }
    }
}

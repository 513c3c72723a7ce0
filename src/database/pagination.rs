use serde::Serialize;

use crate::constants::MAX_COUNT_PER_PAGE;

/// A 1-based page request. Out of range values are clamped rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_COUNT_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

pub fn page_count(total_rows: i64, page_size: i64) -> i64 {
    if page_size <= 0 {
        return 0;
    }
    (total_rows + page_size - 1) / page_size
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, request: PageRequest) -> Self {
        Self {
            items: rows,
            total: total_rows,
            page: request.page,
            total_pages: page_count(total_rows, request.limit),
        }
    }

    /// Cuts the requested window out of an already filtered and ordered result set.
    pub fn slice(rows: Vec<T>, request: PageRequest) -> Self {
        let total_rows = rows.len() as i64;
        let items = rows
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit as usize)
            .collect();

        Self::from_rows(items, total_rows, request)
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            total_pages: self.total_pages,
        }
    }
}

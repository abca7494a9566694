use serde::{Deserialize, Serialize};

use super::error::ActionError;
use crate::constants::MAX_PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// `page` is 1-based; `limit` falls back to `default_limit` and is capped.
    pub fn new(
        page: Option<i64>,
        limit: Option<i64>,
        default_limit: i64,
    ) -> Result<Self, ActionError> {
        let page = page.unwrap_or(1);
        if page < 1 {
            return Err(ActionError::Validation(String::from(
                "Page: must be at least 1",
            )));
        }

        let limit = limit.unwrap_or(default_limit);
        if limit < 1 {
            return Err(ActionError::Validation(String::from(
                "Limit: must be at least 1",
            )));
        }

        let limit = limit.min(MAX_PAGE_SIZE);
        if (page - 1).checked_mul(limit).is_none() {
            return Err(ActionError::Validation(String::from("Page: out of range")));
        }

        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, request: PageRequest) -> Self {
        let previous = if request.page > 1 {
            Some(request.page - 1)
        } else {
            None
        };

        if rows.is_empty() {
            return Self {
                previous,
                ..Self::no_rows()
            };
        }

        let next = if request.page.saturating_mul(request.limit) < total_rows {
            request.page.checked_add(1)
        } else {
            None
        };

        Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        }
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        }
    }

    pub fn map<U, F>(self, f: F) -> PageContext<U>
    where
        F: FnMut(T) -> U,
    {
        PageContext {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

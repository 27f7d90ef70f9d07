//! Request and response envelopes shared by every content type.
//!
//! Create and update bodies arrive as `{"data": {...}}`. Responses are
//! `{"data": ..., "meta": {...}}`; list responses carry pagination in `meta`.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Largest page size a client may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Wrapped request body: `{"data": T}`.
#[derive(Debug, Deserialize)]
pub struct DataBody<T> {
    pub data: T,
}

/// Wrapped response body.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: T,
    pub meta: Meta,
}

/// Response metadata.
#[derive(Debug, Default, Serialize)]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> Envelope<T> {
    /// Envelope for a single record.
    pub fn single(data: T) -> Self {
        Self {
            data,
            meta: Meta::default(),
        }
    }
}

impl<T> Envelope<Vec<T>> {
    /// Envelope for one page of a list.
    pub fn page(data: Vec<T>, page: PageRequest, total: i64) -> Self {
        Self {
            data,
            meta: Meta {
                pagination: Some(Pagination::new(page, total)),
            },
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Build from raw query values. Missing or zero values fall back to the
    /// defaults and `page_size` is capped at [`MAX_PAGE_SIZE`].
    #[must_use]
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let page_size = page_size
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        Self { page, page_size }
    }

    /// SQL `LIMIT`.
    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    /// SQL `OFFSET`.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination block of list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub page_count: i64,
    pub total: i64,
}

impl Pagination {
    #[must_use]
    pub fn new(page: PageRequest, total: i64) -> Self {
        let size = i64::from(page.page_size);
        let total = total.max(0);
        Self {
            page: page.page,
            page_size: page.page_size,
            page_count: (total + size - 1) / size,
            total,
        }
    }
}

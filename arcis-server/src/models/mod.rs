//! Data models

pub mod detection;
pub mod alert;
pub mod frame;

pub use detection::*;
pub use alert::*;
pub use frame::*;

pub const DEFAULT_PAGE_SIZE: i64 = 50;

pub const MAX_PAGE_SIZE: i64 = 500;

/// Clamp `limit`/`offset` query parameters
pub fn page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

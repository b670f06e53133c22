//! Relay-style cursors and global ids.
//!
//! A cursor is the base64 of `arrayconnection:<offset>` where offset is the
//! zero-based position in the filtered list. A global id is the base64 of
//! `<entity_type>:<id>`.

use base64::{engine::general_purpose::STANDARD, Engine};
use danesh_core::{EntityId, EntityType};

use crate::error::{ApiError, ApiResult};

const CURSOR_PREFIX: &str = "arrayconnection:";

/// Largest page a connection query may request.
pub const MAX_FIRST: usize = 100;

pub fn encode_cursor(offset: usize) -> String {
    STANDARD.encode(format!("{CURSOR_PREFIX}{offset}"))
}

pub fn decode_cursor(cursor: &str) -> ApiResult<usize> {
    STANDARD
        .decode(cursor)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .and_then(|s| s.strip_prefix(CURSOR_PREFIX)?.parse().ok())
        .ok_or_else(|| ApiError::invalid_format("after", "a cursor returned by this API"))
}

pub fn encode_global_id(entity_type: &EntityType, id: EntityId) -> String {
    STANDARD.encode(format!("{entity_type}:{id}"))
}

pub fn decode_global_id(global_id: &str) -> ApiResult<(EntityType, EntityId)> {
    let invalid = || ApiError::invalid_format("id", "a global id returned by this API");
    let decoded = STANDARD
        .decode(global_id)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(invalid)?;
    let (name, id) = decoded.split_once(':').ok_or_else(invalid)?;
    let entity_type = EntityType::new(name).map_err(|_| invalid())?;
    let id = id.parse().map_err(|_| invalid())?;
    Ok((entity_type, id))
}

/// Slice bounds of one page over `total` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub start: usize,
    pub end: usize,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl PageWindow {
    /// Window for a forward connection query. `first` defaults to and is
    /// capped at [`MAX_FIRST`].
    pub fn forward(total: usize, first: Option<i32>, after: Option<&str>) -> ApiResult<Self> {
        let first = match first {
            Some(n) if n < 0 => {
                return Err(ApiError::invalid_input("first must not be negative"));
            }
            Some(n) => (n as usize).min(MAX_FIRST),
            None => MAX_FIRST,
        };
        let start = match after {
            Some(cursor) => decode_cursor(cursor)?.saturating_add(1).min(total),
            None => 0,
        };
        let end = start.saturating_add(first).min(total);
        Ok(Self {
            start,
            end,
            has_next_page: end < total,
            has_previous_page: start > 0,
        })
    }

    /// Window for offset paging. `limit` is clamped to `max`.
    pub fn offset(total: usize, offset: usize, limit: usize, max: usize) -> Self {
        let start = offset.min(total);
        let end = start.saturating_add(limit.min(max)).min(total);
        Self {
            start,
            end,
            has_next_page: end < total,
            has_previous_page: start > 0,
        }
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

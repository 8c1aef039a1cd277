//! Page requests, cursor pages and ranked pages.
//!
//! Both page shapes detect "has more" the same way: the caller asks the store
//! for one row beyond the page size and the extra row, if it arrives, is
//! dropped and recorded as `has_next`. No separate count query is needed.

use serde::Serialize;

use crate::cursor::{parse_after, PageCursor};
use crate::error::{DomainError, DomainResult};

/// Page size used when a request does not set one.
pub const DEFAULT_PAGE_SIZE: usize = 60;

/// Largest page size a client may request.
pub const MAX_PAGE_SIZE: usize = 200;

/// Page size bounds applied to client requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

/// Client pagination arguments as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Requested page size. `None` or `0` selects the default.
    pub first: Option<i32>,
    /// Cursor returned with the previous page.
    pub after: Option<String>,
}

impl PageRequest {
    pub fn new(first: Option<i32>, after: Option<String>) -> Self {
        Self { first, after }
    }

    /// Resolves the page size. Out-of-range sizes are rejected, never clamped.
    pub fn limit(&self, limits: &PageLimits) -> DomainResult<usize> {
        match self.first {
            None | Some(0) => Ok(limits.default_page_size),
            Some(first) if first < 0 => Err(DomainError::validation(format!(
                "first parameter {first} must not be negative"
            ))),
            Some(first) => {
                let first = first as usize;
                if first > limits.max_page_size {
                    return Err(DomainError::validation(format!(
                        "first parameter {first} higher than allowed maximum of {}",
                        limits.max_page_size
                    )));
                }
                Ok(first)
            }
        }
    }

    /// Validates size and cursor together.
    pub fn validate<C: PageCursor>(&self, limits: &PageLimits) -> DomainResult<ValidatedPage<C>> {
        let limit = self.limit(limits)?;
        let after = parse_after::<C>(self.after.as_deref())?;
        Ok(ValidatedPage { limit, after })
    }
}

/// A page request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPage<C> {
    pub limit: usize,
    pub after: Option<C>,
}

impl<C> ValidatedPage<C> {
    /// Rows to request from the store: the page plus one look-ahead row.
    pub fn fetch_limit(&self) -> usize {
        self.limit + 1
    }
}

/// Drops look-ahead rows beyond `limit`; returns whether any were present.
fn trim_lookahead<T>(items: &mut Vec<T>, limit: usize) -> bool {
    if items.len() > limit {
        items.truncate(limit);
        true
    } else {
        false
    }
}

/// One page of a cursor-ordered listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_next: bool,
    /// Cursor of the last returned item, for the next request.
    pub end_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Builds a page from rows fetched with one look-ahead row.
    pub fn from_lookahead<C, F>(mut items: Vec<T>, limit: usize, cursor_of: F) -> Self
    where
        C: PageCursor,
        F: Fn(&T) -> C,
    {
        let has_next = trim_lookahead(&mut items, limit);
        let end_cursor = items.last().map(|item| cursor_of(item).encode());
        Self {
            items,
            has_next,
            end_cursor,
        }
    }
}

/// A record with its 1-based position in a ranked listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ranked<T> {
    pub rank: usize,
    #[serde(flatten)]
    pub item: T,
}

/// One page of a ranked ("top N") listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedPage<T> {
    pub items: Vec<Ranked<T>>,
    pub has_next: bool,
}

impl<T> RankedPage<T> {
    /// Trims a pre-sorted candidate list to `limit` and assigns dense ranks.
    ///
    /// `items` is expected to hold up to `limit + 1` rows starting at
    /// `offset`. A `limit` of zero means "everything": nothing is trimmed
    /// and `has_next` is false.
    pub fn paginate(mut items: Vec<T>, limit: usize, offset: usize) -> Self {
        let has_next = limit != 0 && trim_lookahead(&mut items, limit);
        let items = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| Ranked {
                rank: offset + index + 1,
                item,
            })
            .collect();
        Self { items, has_next }
    }

    pub fn ranks(&self) -> Vec<usize> {
        self.items.iter().map(|r| r.rank).collect()
    }
}

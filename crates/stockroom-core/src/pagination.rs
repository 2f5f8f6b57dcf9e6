//! # Pagination
//!
//! Page math for every listing, and the shape of a cached page.
//!
//! ## Conventions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Page Numbering                                       │
//! │                                                                         │
//! │  In state (this module)     zero-based     page = 0, 1, 2 ...          │
//! │  On the wire (?page=)       one-based      page = 1, 2, 3 ...          │
//! │                                                                         │
//! │  The only conversion point is PageState::to_query() on the way out     │
//! │  and PaginatedCollection::from_envelope() on the way in.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Delete Reconciliation
//! ```text
//! total=25, size=10, page=2 (rows 20..25)
//!      │
//!      ▼ delete row 20..24 one at a time, total drops to 20
//!      │
//!      ▼ page * size = 20 >= total = 20  →  out of range
//!      │
//!      ▼ refetch page 0 instead of rendering an empty page
//! ```

use serde::{Deserialize, Serialize};

use crate::contract::PageEnvelope;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

// =============================================================================
// Paginated Collection
// =============================================================================

/// One page of a server-side collection, as held by the store.
///
/// ## Invariants
/// - `page_size > 0`
/// - `items.len() <= page_size`
/// - `total_count` is the server's full count, not `items.len()`
///
/// An empty `items` means "no results". "Not loaded yet" is represented by
/// the store holding no collection at all (`Option::None`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedCollection<T> {
    items: Vec<T>,
    page: usize,
    page_size: usize,
    total_count: usize,
}

impl<T> PaginatedCollection<T> {
    /// Creates a page, enforcing the size invariant.
    pub fn new(items: Vec<T>, page: usize, page_size: usize, total_count: usize) -> CoreResult<Self> {
        if page_size == 0 {
            return Err(ValidationError::MustBePositive {
                field: "page size".to_string(),
            }
            .into());
        }
        if items.len() > page_size {
            return Err(CoreError::PageOverflow {
                items: items.len(),
                page_size,
            });
        }
        Ok(PaginatedCollection {
            items,
            page,
            page_size,
            total_count,
        })
    }

    /// An explicit "no rows" page for the given position.
    pub fn empty(state: PageState) -> Self {
        PaginatedCollection {
            items: Vec::new(),
            page: state.page(),
            page_size: state.page_size(),
            total_count: 0,
        }
    }

    /// Builds a page from the REST envelope.
    ///
    /// `currentPage` on the wire is one-based. A missing or zero `pageSize`
    /// falls back to the size that was requested.
    pub fn from_envelope(envelope: PageEnvelope<T>, requested: PageState) -> CoreResult<Self> {
        let page = envelope
            .current_page
            .map(|p| p.saturating_sub(1))
            .unwrap_or(requested.page());
        let page_size = envelope
            .page_size
            .filter(|size| *size > 0)
            .unwrap_or(requested.page_size());
        Self::new(envelope.items, page, page_size, envelope.total_count)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Removes one row, keeping `total_count` in step.
    ///
    /// Returns the removed row, or `None` when no row matched.
    pub fn remove_where<F>(&mut self, mut matches: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        let idx = self.items.iter().position(|item| matches(item))?;
        self.total_count = self.total_count.saturating_sub(1);
        Some(self.items.remove(idx))
    }

    /// Replaces one row in place. Returns false when no row matched.
    pub fn replace_where<F>(&mut self, mut matches: F, item: T) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        match self.items.iter_mut().find(|existing| matches(existing)) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }
}

// =============================================================================
// Page State
// =============================================================================

/// Where a listing currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
    page: usize,
    page_size: usize,
}

/// Query parameters sent to a list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    /// One-based.
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageState {
    fn default() -> Self {
        PageState {
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageState {
    /// First page of the given size.
    pub fn first(page_size: usize) -> CoreResult<Self> {
        validate_page_size(page_size)?;
        Ok(PageState { page: 0, page_size })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Moves to `page`. Returns true when the position changed.
    pub fn set_page(&mut self, page: usize) -> bool {
        let changed = self.page != page;
        self.page = page;
        changed
    }

    /// Changes the page size and rewinds to the first page.
    pub fn set_page_size(&mut self, page_size: usize) -> CoreResult<bool> {
        validate_page_size(page_size)?;
        let changed = self.page_size != page_size || self.page != 0;
        self.page_size = page_size;
        self.page = 0;
        Ok(changed)
    }

    /// Number of pages for `total` rows (0 rows → 0 pages).
    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size)
    }

    /// True when the current page lies past the last row.
    ///
    /// Page 0 is never out of range; an empty collection renders as an
    /// empty first page.
    pub fn is_out_of_range(&self, total: usize) -> bool {
        self.page > 0 && self.page * self.page_size >= total
    }

    /// Rewinds to page 0 if the current page fell out of range.
    /// Returns true when it rewound.
    pub fn reconcile(&mut self, total: usize) -> bool {
        if self.is_out_of_range(total) {
            self.page = 0;
            true
        } else {
            false
        }
    }

    /// Whether a next page exists.
    pub fn has_next(&self, total: usize) -> bool {
        self.page + 1 < self.page_count(total)
    }

    /// Whether a previous page exists.
    pub fn has_prev(&self) -> bool {
        self.page > 0
    }

    /// One-based row range shown on this page, e.g. `(21, 25)`.
    /// `None` when the page holds no rows.
    pub fn row_range(&self, rows_on_page: usize, total: usize) -> Option<(usize, usize)> {
        if rows_on_page == 0 || total == 0 {
            return None;
        }
        let start = self.page * self.page_size + 1;
        Some((start, (start + rows_on_page - 1).min(total)))
    }

    /// Wire parameters (one-based page).
    pub fn to_query(&self) -> PageQuery {
        PageQuery {
            page: self.page + 1,
            page_size: self.page_size,
        }
    }
}

fn validate_page_size(page_size: usize) -> CoreResult<()> {
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(ValidationError::OutOfRange {
            field: "page size".to_string(),
            min: 1,
            max: MAX_PAGE_SIZE as i64,
        }
        .into());
    }
    Ok(())
}

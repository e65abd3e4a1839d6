//! Pager
//!
//! Packages a window of rows into a `PageResult`. `build_simple` is given
//! the exact total up front; `build_optimized` receives a count supplier and
//! only calls it when the rows themselves cannot prove the total.

use std::future::Future;

use mq_queries::PageRequest;
use serde::Serialize;

/// Total number of rows matching a query, before windowing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalCount {
    Exact(u64),
    Unknown,
}

impl TotalCount {
    pub fn exact(&self) -> Option<u64> {
        match self {
            TotalCount::Exact(n) => Some(*n),
            TotalCount::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, TotalCount::Exact(_))
    }
}

/// Query result with pagination metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    pub content: Vec<T>,
    pub total: TotalCount,
    pub offset: u64,
    pub limit: u64,
}

impl<T> PageResult<T> {
    pub fn new(content: Vec<T>, total: TotalCount, page: &PageRequest) -> Self {
        Self {
            content,
            total,
            offset: page.offset,
            limit: page.limit,
        }
    }

    /// Requested page size
    pub fn size(&self) -> u64 {
        self.limit
    }

    /// Number of rows actually on this page
    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn total_elements(&self) -> Option<u64> {
        self.total.exact()
    }

    /// Zero-based page index
    pub fn page(&self) -> u64 {
        self.offset / self.limit.max(1)
    }

    pub fn total_pages(&self) -> Option<u64> {
        self.total.exact().map(|total| total.div_ceil(self.limit.max(1)))
    }

    pub fn has_next(&self) -> bool {
        match self.total {
            TotalCount::Exact(total) => self.offset.saturating_add(self.limit) < total,
            TotalCount::Unknown => self.content.len() as u64 >= self.limit,
        }
    }

    pub fn has_prev(&self) -> bool {
        self.offset > 0
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Convert the rows while keeping the paging metadata
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PageResult<U> {
        PageResult {
            content: self.content.into_iter().map(f).collect(),
            total: self.total,
            offset: self.offset,
            limit: self.limit,
        }
    }
}

/// Page with an exact total obtained from a count query
pub fn build_simple<T>(rows: Vec<T>, page: &PageRequest, total: u64) -> PageResult<T> {
    PageResult::new(rows, TotalCount::Exact(total), page)
}

/// The total implied by a page's rows, when the rows alone prove it.
///
/// A short page (fewer rows than the limit) is the last page, so the total is
/// `offset + rows`. An empty page past the first tells nothing: the offset
/// may simply lie beyond the end of the data.
pub fn proven_total(row_count: usize, page: &PageRequest) -> Option<u64> {
    let rows = row_count as u64;
    if rows >= page.limit {
        return None;
    }
    if page.offset == 0 {
        Some(rows)
    } else if rows > 0 {
        Some(page.offset + rows)
    } else {
        None
    }
}

/// Page whose total is computed from the rows when possible; `count` is
/// awaited only otherwise
pub async fn build_optimized<T, F, Fut, E>(
    rows: Vec<T>,
    page: &PageRequest,
    count: F,
) -> Result<PageResult<T>, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<u64, E>>,
{
    let total = match proven_total(rows.len(), page) {
        Some(total) => {
            tracing::debug!(total, offset = page.offset, "count query skipped");
            total
        }
        None => count().await?,
    };
    Ok(build_simple(rows, page, total))
}

//! Page requests
//!
//! A window (`offset`, `limit`) over an ordered result set.

use mq_core::SearchConfig;
use serde::{Deserialize, Serialize};

use crate::sorts::SortOrder;

/// Offset/limit window plus the sort keys that define the order being windowed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub offset: u64,
    /// Always positive
    pub limit: u64,
    #[serde(default)]
    pub sort: SortOrder,
}

/// Wire shape of a page request, before the limit is clamped
#[derive(Deserialize)]
struct RawPageRequest {
    #[serde(default)]
    offset: u64,
    limit: u64,
    #[serde(default)]
    sort: SortOrder,
}

impl<'de> Deserialize<'de> for PageRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawPageRequest::deserialize(deserializer)?;
        Ok(Self::new(raw.offset, raw.limit).with_sort(raw.sort))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, 20)
    }
}

impl PageRequest {
    /// Limit used for unpaged requests; fits in a signed 64-bit SQL bind
    pub const UNBOUNDED: u64 = i64::MAX as u64;

    /// Create a window; a zero limit is raised to 1
    pub fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit: limit.clamp(1, Self::UNBOUNDED),
            sort: SortOrder::new(),
        }
    }

    /// Zero-based page index and page size
    pub fn of(page: u64, size: u64) -> Self {
        let size = size.max(1);
        Self::new(page.saturating_mul(size), size)
    }

    /// Zero-based page index with the configured default and maximum page size
    pub fn configured(page: u64, size: Option<u64>, config: &SearchConfig) -> Self {
        Self::of(page, config.clamp_page_size(size))
    }

    /// Same window with the limit capped at the configured maximum
    pub fn capped(&self, config: &SearchConfig) -> Self {
        Self {
            limit: config.clamp_page_size(Some(self.limit)),
            ..self.clone()
        }
    }

    /// Everything, in one window
    pub fn unpaged() -> Self {
        Self::new(0, Self::UNBOUNDED)
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn is_unpaged(&self) -> bool {
        self.offset == 0 && self.limit == Self::UNBOUNDED
    }

    /// Zero-based page index
    pub fn page_number(&self) -> u64 {
        self.offset / self.limit.max(1)
    }

    pub fn next(&self) -> Self {
        Self {
            offset: self.offset.saturating_add(self.limit),
            ..self.clone()
        }
    }

    /// Offset as a signed SQL bind value
    pub fn offset_i64(&self) -> i64 {
        i64::try_from(self.offset).unwrap_or(i64::MAX)
    }

    /// Limit as a signed SQL bind value
    pub fn limit_i64(&self) -> i64 {
        i64::try_from(self.limit).unwrap_or(i64::MAX)
    }

    /// Apply the window to an already ordered row list
    pub fn slice<T>(&self, rows: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        rows.into_iter().skip(offset).take(limit).collect()
    }
}

//! Offset/limit pagination for list operations.

use serde::{Deserialize, Serialize};

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Number of records to skip (0-based).
    pub offset: u32,
    /// Maximum number of records to return.
    pub limit: u32,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 100;
    pub const MAX_LIMIT: u32 = 1000;

    pub fn new(offset: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            offset: offset.unwrap_or(0),
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).min(Self::MAX_LIMIT),
        }
    }

    /// Apply this page to an already ordered sequence.
    pub fn slice<T>(self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_capped() {
        assert_eq!(Page::new(None, Some(5_000)).limit, Page::MAX_LIMIT);
        assert_eq!(Page::default().limit, 100);
    }

    #[test]
    fn slice_skips_and_takes() {
        let page = Page::new(Some(2), Some(3));
        assert_eq!(page.slice(0..10), vec![2, 3, 4]);
        assert!(Page::new(Some(20), None).slice(0..10).is_empty());
    }
}

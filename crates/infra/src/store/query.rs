//! Paging for ledger listings.

use serde::{Deserialize, Serialize};

/// Pagination parameters for ledger queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Maximum number of rows to return.
    pub limit: u32,
    /// Rows to skip (0-based).
    pub offset: u32,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 200;

    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }

    /// Apply to an already newest-first iterator.
    pub fn slice<T, I: IntoIterator<Item = T>>(&self, rows: I) -> Vec<T> {
        rows.into_iter()
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
    fn limits_are_clamped() {
        assert_eq!(Page::new(None, None).limit, 50);
        assert_eq!(Page::new(Some(1_000), None).limit, 200);
        assert_eq!(Page::new(Some(0), Some(3)), Page { limit: 1, offset: 3 });
    }

    #[test]
    fn slice_skips_then_takes() {
        let p = Page::new(Some(2), Some(1));
        assert_eq!(p.slice(1..=5), vec![2, 3]);
    }
}

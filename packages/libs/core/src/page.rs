//! Page descriptor

use serde::{Deserialize, Serialize};

/// One window of a result set. `number` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Page {
    pub size: u64,
    pub number: u64,
}

impl Page {
    pub fn new(size: u64, number: u64) -> Self {
        Self { size, number }
    }

    /// Pagination only applies when both size and number are non-zero.
    pub fn is_active(&self) -> bool {
        self.size != 0 && self.number != 0
    }

    pub fn offset(&self) -> u64 {
        self.size.saturating_mul(self.number.saturating_sub(1))
    }

    pub fn limit(&self) -> u64 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_arithmetic() {
        assert_eq!(Page::new(10, 1).offset(), 0);
        assert_eq!(Page::new(10, 2).offset(), 10);
        assert_eq!(Page::new(25, 4).offset(), 75);
        assert_eq!(Page::new(10, 3).limit(), 10);
    }

    #[test]
    fn test_zero_fields_disable_paging() {
        assert!(!Page::new(0, 1).is_active());
        assert!(!Page::new(10, 0).is_active());
        assert!(Page::new(10, 1).is_active());
    }
}

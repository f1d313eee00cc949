//! Core type definitions for BucketDB.

use std::fmt;

/// Unique identifier for a write transaction.
///
/// Transaction IDs are monotonically increasing and never reused, even when
/// the transaction that received one is rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxId(pub u64);

impl TxId {
    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_id_ordering() {
        let t1 = TxId::new(1);
        let t2 = TxId::new(2);
        assert!(t1 < t2);
        assert_eq!(t2.as_u64(), 2);
    }

    #[test]
    fn tx_id_display_is_decimal() {
        assert_eq!(format!("{}", TxId::new(42)), "42");
    }
}

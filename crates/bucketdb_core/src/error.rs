//! Error types for BucketDB core.

use crate::journal::JournalError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in BucketDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The journal vetoed the commit; the transaction was rolled back.
    #[error("commit rejected by journal: {0}")]
    Journal(#[from] JournalError),

    /// Bucket does not exist.
    #[error("bucket not found: {name}")]
    BucketNotFound {
        /// Name of the bucket.
        name: String,
    },

    /// Bucket already exists.
    #[error("bucket already exists: {name}")]
    BucketExists {
        /// Name of the bucket.
        name: String,
    },

    /// Bucket name is empty.
    #[error("bucket name required")]
    BucketNameRequired,

    /// Key is empty.
    #[error("key required")]
    KeyRequired,

    /// Key exceeds the configured maximum.
    #[error("key too large: {size} bytes (max {max})")]
    KeyTooLarge {
        /// Actual key size.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Value exceeds the configured maximum.
    #[error("value too large: {size} bytes (max {max})")]
    ValueTooLarge {
        /// Actual value size.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Key refers to a bucket where a value was expected, or the reverse.
    #[error("incompatible value for key: {name}")]
    IncompatibleValue {
        /// The offending key.
        name: String,
    },

    /// Source and destination of a move are the same bucket.
    #[error("source and target buckets are the same")]
    SameBuckets,

    /// Bucket handle does not refer to a live bucket in this transaction.
    #[error("stale bucket handle: {id}")]
    StaleBucket {
        /// The handle's raw index.
        id: usize,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates a bucket not found error.
    pub fn bucket_not_found(name: &[u8]) -> Self {
        Self::BucketNotFound {
            name: String::from_utf8_lossy(name).into_owned(),
        }
    }

    /// Creates a bucket exists error.
    pub fn bucket_exists(name: &[u8]) -> Self {
        Self::BucketExists {
            name: String::from_utf8_lossy(name).into_owned(),
        }
    }

    /// Creates an incompatible value error.
    pub fn incompatible_value(name: &[u8]) -> Self {
        Self::IncompatibleValue {
            name: String::from_utf8_lossy(name).into_owned(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true if this error came from a journal commit veto.
    #[must_use]
    pub fn is_journal_veto(&self) -> bool {
        matches!(self, Self::Journal(_))
    }
}

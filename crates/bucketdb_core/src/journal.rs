//! Journal hooks for observing writes.
//!
//! A [`Journal`] lets you inspect every write a [`Store`](crate::Store)
//! applies inside a write transaction. There are no events for reads.
//!
//! A hook is only called when the update it describes actually had to be
//! performed. For instance
//! [`create_bucket_if_not_exists`](crate::WriteTx::create_bucket_if_not_exists)
//! only fires [`Journal::bucket_created`] when the bucket was missing, and
//! storing a value identical to the current one fires nothing.
//!
//! # Ordering
//!
//! Within one transaction the engine calls, in order:
//! 1. [`Journal::write_tx_started`]
//! 2. one mutation hook per applied mutation, in application order
//! 3. the terminal hooks: either [`Journal::write_tx_committed`] returning
//!    `Ok`, or `write_tx_committed` returning `Err` followed by
//!    [`Journal::write_tx_rolled_back`], or `write_tx_rolled_back` alone
//!
//! # Threading
//!
//! Hooks run synchronously, on the thread driving the transaction, while the
//! store's writer lock is held. A hook must not start a write transaction on
//! the same store (it would deadlock) and should return promptly, because
//! the transaction cannot make progress until it does.

use crate::bucket::Bucket;
use crate::types::TxId;
use std::error::Error as StdError;
use thiserror::Error;

/// Result type returned by [`Journal::write_tx_committed`].
pub type JournalResult = Result<(), JournalError>;

/// Error a journal returns to veto a commit.
#[derive(Debug, Error)]
pub enum JournalError {
    /// The journal refused the commit.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The journal failed while recording the commit.
    #[error("journal failure: {0}")]
    Failed(Box<dyn StdError + Send + Sync>),
}

impl JournalError {
    /// Creates a rejection error.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    /// Wraps an underlying failure.
    pub fn failed(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Failed(err.into())
    }
}

/// Observer for all writes applied to a store.
///
/// Byte slices passed to the hooks borrow engine memory and are only valid
/// for the duration of the call; an implementation that keeps them must copy
/// them.
pub trait Journal: Send {
    /// Called when a new write transaction is opened.
    fn write_tx_started(&mut self, id: TxId);

    /// Called when a bucket that did not exist is created.
    fn bucket_created(&mut self, bucket: Bucket<'_>);

    /// Called when a bucket is deleted, before it is unlinked.
    fn bucket_deleted(&mut self, bucket: Bucket<'_>);

    /// Called when a bucket is moved from one parent to another.
    ///
    /// `moved` already hangs off its new parent. `old_parent` is `None` when
    /// the bucket used to be a top-level bucket.
    fn bucket_moved(&mut self, old_parent: Option<Bucket<'_>>, moved: Bucket<'_>);

    /// Called when an existing key is deleted from a bucket.
    fn key_deleted(&mut self, bucket: Bucket<'_>, key: &[u8]);

    /// Called when a key is inserted or its value changes.
    fn key_updated(&mut self, bucket: Bucket<'_>, key: &[u8], value: &[u8]);

    /// Called when a bucket's sequence number changes to `value`.
    fn sequence_updated(&mut self, bucket: Bucket<'_>, value: u64);

    /// Called when the current write transaction is about to be committed.
    ///
    /// Returning an error aborts the commit: the engine rolls the transaction
    /// back, calls [`Journal::write_tx_rolled_back`], and returns the error
    /// from [`WriteTx::commit`](crate::WriteTx::commit).
    fn write_tx_committed(&mut self) -> JournalResult;

    /// Called after the current write transaction has been rolled back.
    fn write_tx_rolled_back(&mut self);
}

/// A journal that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopJournal;

impl Journal for NoopJournal {
    fn write_tx_started(&mut self, _id: TxId) {}

    fn bucket_created(&mut self, _bucket: Bucket<'_>) {}

    fn bucket_deleted(&mut self, _bucket: Bucket<'_>) {}

    fn bucket_moved(&mut self, _old_parent: Option<Bucket<'_>>, _moved: Bucket<'_>) {}

    fn key_deleted(&mut self, _bucket: Bucket<'_>, _key: &[u8]) {}

    fn key_updated(&mut self, _bucket: Bucket<'_>, _key: &[u8], _value: &[u8]) {}

    fn sequence_updated(&mut self, _bucket: Bucket<'_>, _value: u64) {}

    fn write_tx_committed(&mut self) -> JournalResult {
        Ok(())
    }

    fn write_tx_rolled_back(&mut self) {}
}

impl<J: Journal + ?Sized> Journal for Box<J> {
    fn write_tx_started(&mut self, id: TxId) {
        (**self).write_tx_started(id);
    }

    fn bucket_created(&mut self, bucket: Bucket<'_>) {
        (**self).bucket_created(bucket);
    }

    fn bucket_deleted(&mut self, bucket: Bucket<'_>) {
        (**self).bucket_deleted(bucket);
    }

    fn bucket_moved(&mut self, old_parent: Option<Bucket<'_>>, moved: Bucket<'_>) {
        (**self).bucket_moved(old_parent, moved);
    }

    fn key_deleted(&mut self, bucket: Bucket<'_>, key: &[u8]) {
        (**self).key_deleted(bucket, key);
    }

    fn key_updated(&mut self, bucket: Bucket<'_>, key: &[u8], value: &[u8]) {
        (**self).key_updated(bucket, key, value);
    }

    fn sequence_updated(&mut self, bucket: Bucket<'_>, value: u64) {
        (**self).sequence_updated(bucket, value);
    }

    fn write_tx_committed(&mut self) -> JournalResult {
        (**self).write_tx_committed()
    }

    fn write_tx_rolled_back(&mut self) {
        (**self).write_tx_rolled_back();
    }
}

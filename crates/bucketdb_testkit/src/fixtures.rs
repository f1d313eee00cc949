//! Test fixtures and store helpers.
//!
//! Provides stores wired to a [`StringJournal`] and a few common scenarios.

use crate::journal::StringJournal;
use bucketdb_core::{BucketId, Config, CoreResult, Store};

/// A store whose writes are recorded as text.
pub type RecordedStore = Store<StringJournal>;

/// Creates an empty store wired to a fresh recorder.
#[must_use]
pub fn recorded_store() -> RecordedStore {
    Store::with_journal(StringJournal::new())
}

/// Creates an empty recorded store with explicit configuration.
#[must_use]
pub fn recorded_store_with_config(config: Config) -> RecordedStore {
    Store::with_config(config, StringJournal::new())
}

/// Runs a test with a fresh recorded store.
///
/// # Example
///
/// ```rust
/// use bucketdb_testkit::{with_recorded_store, TraceAssertions};
///
/// with_recorded_store(|store| {
///     store.begin_write().rollback();
///     store.verify_trace(&["WriteTxStarted(1)", "WriteTxRolledBack()"]);
/// });
/// ```
pub fn with_recorded_store<F, R>(f: F) -> R
where
    F: FnOnce(&RecordedStore) -> R,
{
    let store = recorded_store();
    f(&store)
}

/// Trace assertions on a recorded store.
pub trait TraceAssertions {
    /// Compares the recorded trace with `expected`, panicking on mismatch,
    /// and clears it.
    fn verify_trace(&self, expected: &[&str]);

    /// Returns the trace recorded so far without clearing it.
    fn trace(&self) -> String;

    /// Pauses the recorder.
    fn pause_trace(&self);

    /// Resumes the recorder.
    fn resume_trace(&self);
}

impl TraceAssertions for RecordedStore {
    #[track_caller]
    fn verify_trace(&self, expected: &[&str]) {
        self.journal().verify(expected);
    }

    fn trace(&self) -> String {
        self.journal().as_str().to_owned()
    }

    fn pause_trace(&self) {
        self.journal().pause();
    }

    fn resume_trace(&self) {
        self.journal().resume();
    }
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates the chain `names[0]/names[1]/...` in one committed
    /// transaction and returns the handles, outermost first.
    pub fn nested_chain(store: &RecordedStore, names: &[&[u8]]) -> CoreResult<Vec<BucketId>> {
        store.update(|tx| {
            let mut ids: Vec<BucketId> = Vec::with_capacity(names.len());
            for name in names {
                let id = match ids.last() {
                    None => tx.create_bucket(name)?,
                    Some(&parent) => tx.create_nested_bucket(parent, name)?,
                };
                ids.push(id);
            }
            Ok(ids)
        })
    }

    /// Creates bucket `name` holding `count` entries `key-<i>` → `value-<i>`.
    pub fn populated_bucket(
        store: &RecordedStore,
        name: &[u8],
        count: usize,
    ) -> CoreResult<BucketId> {
        store.update(|tx| {
            let bucket = tx.create_bucket(name)?;
            for i in 0..count {
                tx.put(
                    bucket,
                    format!("key-{i}").as_bytes(),
                    format!("value-{i}").as_bytes(),
                )?;
            }
            Ok(bucket)
        })
    }
}

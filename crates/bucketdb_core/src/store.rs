//! Single-writer bucket store.
//!
//! The store keeps the last committed bucket tree behind an `RwLock` and the
//! journal behind the single-writer `Mutex`. A [`WriteTx`] holds that mutex
//! for its whole lifetime and mutates a private copy of the tree; commit
//! publishes the copy, rollback drops it.
//!
//! Every mutation that changes state calls the matching [`Journal`] hook
//! inline, before the mutating method returns.

use crate::bucket::{Bucket, BucketId, Tree};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::journal::{Journal, NoopJournal};
use crate::types::TxId;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Writer-side state, guarded by the single-writer lock.
struct Writer<J> {
    journal: J,
    /// Arena slots handed out by any transaction, including rolled-back ones.
    slots: usize,
}

/// An in-memory transactional store of nested buckets.
///
/// ## Single-Writer Guarantee
///
/// Only one write transaction can be active at a time. [`Store::begin_write`]
/// blocks until the previous [`WriteTx`] is committed, rolled back or
/// dropped. Readers use [`Store::view`] and never block on the writer.
///
/// # Example
///
/// ```rust
/// use bucketdb_core::Store;
///
/// let store = Store::new();
/// let mut tx = store.begin_write();
/// let users = tx.create_bucket(b"users").unwrap();
/// tx.put(users, b"alice", b"admin").unwrap();
/// tx.commit().unwrap();
/// ```
pub struct Store<J = NoopJournal> {
    config: Config,
    /// Last committed tree.
    committed: RwLock<Arc<Tree>>,
    /// Write lock - only one writer at a time.
    writer: Mutex<Writer<J>>,
    /// Next transaction ID.
    next_tx_id: AtomicU64,
}

impl Store<NoopJournal> {
    /// Creates an empty store with no journal attached.
    #[must_use]
    pub fn new() -> Self {
        Self::with_journal(NoopJournal)
    }
}

impl Default for Store<NoopJournal> {
    fn default() -> Self {
        Self::new()
    }
}

impl<J: Journal> Store<J> {
    /// Creates an empty store that reports writes to `journal`.
    pub fn with_journal(journal: J) -> Self {
        Self::with_config(Config::default(), journal)
    }

    /// Creates an empty store with explicit configuration.
    pub fn with_config(config: Config, journal: J) -> Self {
        let next_tx_id = AtomicU64::new(config.initial_tx_id);
        Self {
            config,
            committed: RwLock::new(Arc::new(Tree::default())),
            writer: Mutex::new(Writer { journal, slots: 0 }),
            next_tx_id,
        }
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Begins a new write transaction.
    ///
    /// Acquires the write lock and holds it until the transaction finishes.
    /// Calls [`Journal::write_tx_started`] before returning.
    pub fn begin_write(&self) -> WriteTx<'_, J> {
        let mut writer = self.writer.lock();
        let id = TxId::new(self.next_tx_id.fetch_add(1, Ordering::SeqCst));
        let mut tree = Tree::clone(&self.committed.read());
        tree.retire_slots(writer.slots);

        debug!(tx_id = %id, "write transaction started");
        writer.journal.write_tx_started(id);

        WriteTx {
            store: self,
            writer,
            tree,
            id,
            finished: false,
        }
    }

    /// Executes a function within a write transaction.
    ///
    /// If the function returns `Ok`, the transaction is committed.
    /// If it returns `Err`, the transaction is rolled back and the error
    /// returned unchanged.
    pub fn update<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut WriteTx<'_, J>) -> CoreResult<T>,
    {
        let mut tx = self.begin_write();
        match f(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                tx.rollback();
                Err(err)
            }
        }
    }

    /// Returns a read-only view of the last committed state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tree: Arc::clone(&self.committed.read()),
        }
    }

    /// Runs `f` against the last committed state.
    pub fn view<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&Snapshot) -> T,
    {
        f(&self.snapshot())
    }

    /// Locks and returns the journal.
    ///
    /// Takes the write lock, so it must not be called while a write
    /// transaction is open on the current thread.
    pub fn journal(&self) -> MappedMutexGuard<'_, J> {
        MutexGuard::map(self.writer.lock(), |writer| &mut writer.journal)
    }

    /// Consumes the store and returns its journal.
    pub fn into_journal(self) -> J {
        self.writer.into_inner().journal
    }

    /// Returns the ID of the most recently started write transaction.
    pub fn last_tx_id(&self) -> Option<TxId> {
        let next = self.next_tx_id.load(Ordering::SeqCst);
        (next > self.config.initial_tx_id).then(|| TxId::new(next - 1))
    }
}

/// The single active write transaction of a [`Store`].
///
/// Dropping an unfinished transaction rolls it back.
pub struct WriteTx<'s, J: Journal> {
    store: &'s Store<J>,
    writer: MutexGuard<'s, Writer<J>>,
    /// Working copy of the tree.
    tree: Tree,
    id: TxId,
    finished: bool,
}

impl<'s, J: Journal> WriteTx<'s, J> {
    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TxId {
        self.id
    }

    /// Creates a top-level bucket.
    ///
    /// Fails with [`CoreError::BucketExists`] if it already exists.
    pub fn create_bucket(&mut self, name: &[u8]) -> CoreResult<BucketId> {
        self.create_in(None, name)
    }

    /// Creates a top-level bucket unless it already exists.
    ///
    /// Only an actual creation is reported to the journal.
    pub fn create_bucket_if_not_exists(&mut self, name: &[u8]) -> CoreResult<BucketId> {
        self.ensure_in(None, name)
    }

    /// Looks up a top-level bucket.
    #[must_use]
    pub fn bucket(&self, name: &[u8]) -> Option<BucketId> {
        self.tree.lookup(None, name).ok().flatten()
    }

    /// Deletes a top-level bucket and everything nested in it.
    pub fn delete_bucket(&mut self, name: &[u8]) -> CoreResult<()> {
        self.delete_in(None, name)
    }

    /// Creates a bucket nested in `parent`.
    pub fn create_nested_bucket(&mut self, parent: BucketId, name: &[u8]) -> CoreResult<BucketId> {
        self.create_in(Some(parent), name)
    }

    /// Creates a bucket nested in `parent` unless it already exists.
    pub fn create_nested_bucket_if_not_exists(
        &mut self,
        parent: BucketId,
        name: &[u8],
    ) -> CoreResult<BucketId> {
        self.ensure_in(Some(parent), name)
    }

    /// Looks up a bucket nested in `parent`.
    pub fn nested_bucket(&self, parent: BucketId, name: &[u8]) -> CoreResult<Option<BucketId>> {
        self.tree.lookup(Some(parent), name)
    }

    /// Deletes a bucket nested in `parent` and everything under it.
    pub fn delete_nested_bucket(&mut self, parent: BucketId, name: &[u8]) -> CoreResult<()> {
        self.delete_in(Some(parent), name)
    }

    /// Moves bucket `name` from `from` to `to`. `None` means the top level.
    ///
    /// The bucket keeps its handle, name and contents.
    pub fn move_bucket(
        &mut self,
        name: &[u8],
        from: Option<BucketId>,
        to: Option<BucketId>,
    ) -> CoreResult<()> {
        self.check_name(name)?;
        if from == to {
            return Err(CoreError::SameBuckets);
        }
        let id = self.existing_bucket(from, name)?;

        if let Some(target) = to {
            self.tree.live(target)?;
            if self.tree.is_self_or_ancestor(id, target) {
                return Err(CoreError::invalid_operation(
                    "cannot move a bucket into itself or one of its descendants",
                ));
            }
        }
        if self.tree.has_value(to, name)? {
            return Err(CoreError::incompatible_value(name));
        }
        if self.tree.lookup(to, name)?.is_some() {
            return Err(CoreError::bucket_exists(name));
        }

        self.tree.relink(id, from, to)?;
        let old_parent = from.and_then(|p| self.tree.view(p));
        self.writer
            .journal
            .bucket_moved(old_parent, self.tree.live(id)?);
        Ok(())
    }

    /// Sets `key` to `value` in `bucket`.
    ///
    /// Storing the value a key already has is not reported.
    pub fn put(&mut self, bucket: BucketId, key: &[u8], value: &[u8]) -> CoreResult<()> {
        self.check_key(key)?;
        if value.len() > self.store.config.max_value_size {
            return Err(CoreError::ValueTooLarge {
                size: value.len(),
                max: self.store.config.max_value_size,
            });
        }
        if self.tree.lookup(Some(bucket), key)?.is_some() {
            return Err(CoreError::incompatible_value(key));
        }

        if self.tree.put(bucket, key, value)? {
            self.writer
                .journal
                .key_updated(self.tree.live(bucket)?, key, value);
        }
        Ok(())
    }

    /// Returns the value of `key` in `bucket`, including uncommitted writes.
    pub fn get(&self, bucket: BucketId, key: &[u8]) -> CoreResult<Option<&[u8]>> {
        self.tree.get(bucket, key)
    }

    /// Deletes `key` from `bucket`. Deleting a missing key is a no-op.
    pub fn delete(&mut self, bucket: BucketId, key: &[u8]) -> CoreResult<()> {
        self.check_key(key)?;
        if self.tree.lookup(Some(bucket), key)?.is_some() {
            return Err(CoreError::incompatible_value(key));
        }

        if self.tree.delete(bucket, key)? {
            self.writer
                .journal
                .key_deleted(self.tree.live(bucket)?, key);
        }
        Ok(())
    }

    /// Returns the current sequence number of `bucket`.
    pub fn sequence(&self, bucket: BucketId) -> CoreResult<u64> {
        Ok(self.tree.live(bucket)?.sequence())
    }

    /// Sets the sequence number of `bucket`.
    pub fn set_sequence(&mut self, bucket: BucketId, value: u64) -> CoreResult<()> {
        if self.tree.set_sequence(bucket, value)? {
            self.writer
                .journal
                .sequence_updated(self.tree.live(bucket)?, value);
        }
        Ok(())
    }

    /// Increments the sequence number of `bucket` and returns the new value.
    pub fn next_sequence(&mut self, bucket: BucketId) -> CoreResult<u64> {
        let next = self
            .sequence(bucket)?
            .checked_add(1)
            .ok_or_else(|| CoreError::invalid_operation("sequence overflow"))?;
        self.set_sequence(bucket, next)?;
        Ok(next)
    }

    /// Returns the store's journal, e.g. to pause a recorder mid-transaction.
    ///
    /// Use this instead of [`Store::journal`] while the transaction is open.
    pub fn journal(&mut self) -> &mut J {
        &mut self.writer.journal
    }

    /// Returns a read-only view of `bucket` as this transaction sees it.
    pub fn inspect(&self, bucket: BucketId) -> CoreResult<Bucket<'_>> {
        self.tree.live(bucket)
    }

    /// Returns the full path of `bucket`, e.g. `a/b/c`.
    pub fn full_name(&self, bucket: BucketId) -> CoreResult<String> {
        Ok(crate::path::full_name(self.tree.live(bucket)?))
    }

    /// Commits the transaction.
    ///
    /// Calls [`Journal::write_tx_committed`] first. If the journal returns an
    /// error the transaction is rolled back instead and the error returned.
    pub fn commit(mut self) -> CoreResult<()> {
        self.finished = true;

        if let Err(err) = self.writer.journal.write_tx_committed() {
            warn!(tx_id = %self.id, error = %err, "journal rejected commit, rolling back");
            self.discard();
            return Err(err.into());
        }

        let tree = std::mem::take(&mut self.tree);
        *self.store.committed.write() = Arc::new(tree);
        debug!(tx_id = %self.id, "write transaction committed");
        Ok(())
    }

    /// Rolls the transaction back, discarding all of its changes.
    pub fn rollback(mut self) {
        self.discard();
    }

    fn discard(&mut self) {
        self.finished = true;
        let tree = std::mem::take(&mut self.tree);
        self.writer.slots = self.writer.slots.max(tree.slot_count());
        self.writer.journal.write_tx_rolled_back();
        debug!(tx_id = %self.id, "write transaction rolled back");
    }

    fn check_name(&self, name: &[u8]) -> CoreResult<()> {
        if name.is_empty() {
            return Err(CoreError::BucketNameRequired);
        }
        self.check_size(name)
    }

    fn check_key(&self, key: &[u8]) -> CoreResult<()> {
        if key.is_empty() {
            return Err(CoreError::KeyRequired);
        }
        self.check_size(key)
    }

    fn check_size(&self, key: &[u8]) -> CoreResult<()> {
        let max = self.store.config.max_key_size;
        if key.len() > max {
            return Err(CoreError::KeyTooLarge {
                size: key.len(),
                max,
            });
        }
        Ok(())
    }

    /// Resolves `name` under `parent`, rejecting plain values.
    fn resolve(&self, parent: Option<BucketId>, name: &[u8]) -> CoreResult<Option<BucketId>> {
        self.check_name(name)?;
        if self.tree.has_value(parent, name)? {
            return Err(CoreError::incompatible_value(name));
        }
        self.tree.lookup(parent, name)
    }

    fn existing_bucket(&self, parent: Option<BucketId>, name: &[u8]) -> CoreResult<BucketId> {
        self.resolve(parent, name)?
            .ok_or_else(|| CoreError::bucket_not_found(name))
    }

    fn create_in(&mut self, parent: Option<BucketId>, name: &[u8]) -> CoreResult<BucketId> {
        if self.resolve(parent, name)?.is_some() {
            return Err(CoreError::bucket_exists(name));
        }
        self.insert_bucket(parent, name)
    }

    fn ensure_in(&mut self, parent: Option<BucketId>, name: &[u8]) -> CoreResult<BucketId> {
        match self.resolve(parent, name)? {
            Some(id) => Ok(id),
            None => self.insert_bucket(parent, name),
        }
    }

    fn insert_bucket(&mut self, parent: Option<BucketId>, name: &[u8]) -> CoreResult<BucketId> {
        let id = self.tree.insert(parent, name)?;
        self.writer.journal.bucket_created(self.tree.live(id)?);
        Ok(id)
    }

    fn delete_in(&mut self, parent: Option<BucketId>, name: &[u8]) -> CoreResult<()> {
        let id = self.existing_bucket(parent, name)?;
        self.writer.journal.bucket_deleted(self.tree.live(id)?);
        self.tree.remove(parent, id)
    }
}

impl<J: Journal> Drop for WriteTx<'_, J> {
    fn drop(&mut self) {
        if !self.finished {
            self.discard();
        }
    }
}

/// An immutable view of a committed state.
///
/// Snapshots are cheap to take and unaffected by later commits.
#[derive(Debug, Clone)]
pub struct Snapshot {
    tree: Arc<Tree>,
}

impl Snapshot {
    /// Looks up a top-level bucket.
    #[must_use]
    pub fn bucket(&self, name: &[u8]) -> Option<BucketId> {
        self.tree.lookup(None, name).ok().flatten()
    }

    /// Looks up a bucket nested in `parent`.
    pub fn nested_bucket(&self, parent: BucketId, name: &[u8]) -> CoreResult<Option<BucketId>> {
        self.tree.lookup(Some(parent), name)
    }

    /// Returns the value of `key` in `bucket`.
    pub fn get(&self, bucket: BucketId, key: &[u8]) -> CoreResult<Option<&[u8]>> {
        self.tree.get(bucket, key)
    }

    /// Returns the sequence number of `bucket`.
    pub fn sequence(&self, bucket: BucketId) -> CoreResult<u64> {
        Ok(self.tree.live(bucket)?.sequence())
    }

    /// Returns a read-only view of `bucket`.
    pub fn inspect(&self, bucket: BucketId) -> CoreResult<Bucket<'_>> {
        self.tree.live(bucket)
    }

    /// Returns the full path of `bucket`.
    pub fn full_name(&self, bucket: BucketId) -> CoreResult<String> {
        Ok(crate::path::full_name(self.tree.live(bucket)?))
    }

    /// Lists bucket names under `parent` (`None` for the top level).
    pub fn bucket_names(&self, parent: Option<BucketId>) -> CoreResult<Vec<Vec<u8>>> {
        self.tree.bucket_names(parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{JournalError, JournalResult};
    use proptest::prelude::*;

    /// Records event names only.
    #[derive(Default)]
    struct EventLog {
        events: Vec<String>,
        veto: bool,
    }

    impl Journal for EventLog {
        fn write_tx_started(&mut self, id: TxId) {
            self.events.push(format!("start {id}"));
        }

        fn bucket_created(&mut self, bucket: Bucket<'_>) {
            self.events.push(format!("create {bucket}"));
        }

        fn bucket_deleted(&mut self, bucket: Bucket<'_>) {
            self.events.push(format!("drop {bucket}"));
        }

        fn bucket_moved(&mut self, old_parent: Option<Bucket<'_>>, moved: Bucket<'_>) {
            let from = old_parent.map(|b| b.to_string()).unwrap_or_default();
            self.events.push(format!("move {from} -> {moved}"));
        }

        fn key_deleted(&mut self, bucket: Bucket<'_>, key: &[u8]) {
            self.events
                .push(format!("del {bucket} {}", String::from_utf8_lossy(key)));
        }

        fn key_updated(&mut self, bucket: Bucket<'_>, key: &[u8], _value: &[u8]) {
            self.events
                .push(format!("put {bucket} {}", String::from_utf8_lossy(key)));
        }

        fn sequence_updated(&mut self, bucket: Bucket<'_>, value: u64) {
            self.events.push(format!("seq {bucket} {value}"));
        }

        fn write_tx_committed(&mut self) -> JournalResult {
            self.events.push("commit".into());
            if self.veto {
                return Err(JournalError::rejected("veto"));
            }
            Ok(())
        }

        fn write_tx_rolled_back(&mut self) {
            self.events.push("rollback".into());
        }
    }

    fn store() -> Store<EventLog> {
        Store::with_journal(EventLog::default())
    }

    fn events(store: &Store<EventLog>) -> Vec<String> {
        std::mem::take(&mut store.journal().events)
    }

    #[test]
    fn commit_publishes_changes() {
        let store = store();
        let mut tx = store.begin_write();
        let b = tx.create_bucket(b"widgets").unwrap();
        tx.put(b, b"a", b"1").unwrap();
        tx.commit().unwrap();

        let snap = store.snapshot();
        let b = snap.bucket(b"widgets").unwrap();
        assert_eq!(snap.get(b, b"a").unwrap(), Some(&b"1"[..]));
        assert_eq!(
            events(&store),
            vec!["start 1", "create widgets", "put widgets a", "commit"]
        );
    }

    #[test]
    fn rollback_discards_changes() {
        let store = store();
        let mut tx = store.begin_write();
        tx.create_bucket(b"widgets").unwrap();
        tx.rollback();

        assert!(store.snapshot().bucket(b"widgets").is_none());
        assert_eq!(
            events(&store),
            vec!["start 1", "create widgets", "rollback"]
        );
    }

    #[test]
    fn drop_rolls_back() {
        let store = store();
        {
            let mut tx = store.begin_write();
            tx.create_bucket(b"widgets").unwrap();
        }
        assert!(store.snapshot().bucket(b"widgets").is_none());
        assert_eq!(events(&store).last().map(String::as_str), Some("rollback"));
    }

    #[test]
    fn veto_rolls_back() {
        let store = Store::with_journal(EventLog {
            veto: true,
            ..EventLog::default()
        });
        let mut tx = store.begin_write();
        tx.create_bucket(b"widgets").unwrap();
        let err = tx.commit().unwrap_err();

        assert!(err.is_journal_veto());
        assert!(store.snapshot().bucket(b"widgets").is_none());
        assert_eq!(
            events(&store),
            vec!["start 1", "create widgets", "commit", "rollback"]
        );
    }

    #[test]
    fn update_rolls_back_on_error() {
        let store = store();
        let result: CoreResult<()> = store.update(|tx| {
            tx.create_bucket(b"widgets")?;
            Err(CoreError::invalid_operation("boom"))
        });
        assert!(result.is_err());
        assert!(store.snapshot().bucket(b"widgets").is_none());
        assert_eq!(
            events(&store),
            vec!["start 1", "create widgets", "rollback"]
        );
    }

    #[test]
    fn rolled_back_handles_stay_stale() {
        let store = store();
        let mut tx = store.begin_write();
        let gone = tx.create_bucket(b"a").unwrap();
        tx.rollback();

        let mut tx = store.begin_write();
        let b = tx.create_bucket(b"b").unwrap();
        assert_ne!(b, gone);
        assert!(matches!(
            tx.put(gone, b"k", b"v"),
            Err(CoreError::StaleBucket { .. })
        ));
        tx.commit().unwrap();

        assert!(matches!(
            store.snapshot().inspect(gone),
            Err(CoreError::StaleBucket { .. })
        ));
        assert_eq!(
            events(&store),
            vec!["start 1", "create a", "rollback", "start 2", "create b", "commit"]
        );
    }

    #[test]
    fn tx_ids_increase_across_rollbacks() {
        let store = store();
        assert_eq!(store.last_tx_id(), None);
        store.begin_write().rollback();
        store.begin_write().commit().unwrap();
        assert_eq!(store.last_tx_id(), Some(TxId::new(2)));
        assert_eq!(
            events(&store),
            vec!["start 1", "rollback", "start 2", "commit"]
        );
    }

    #[test]
    fn initial_tx_id_from_config() {
        let store = Store::with_config(Config::new().initial_tx_id(7), EventLog::default());
        assert_eq!(store.begin_write().id(), TxId::new(7));
    }

    #[test]
    fn create_if_not_exists_is_silent_when_present() {
        let store = store();
        let mut tx = store.begin_write();
        let first = tx.create_bucket_if_not_exists(b"widgets").unwrap();
        let second = tx.create_bucket_if_not_exists(b"widgets").unwrap();
        assert_eq!(first, second);
        tx.commit().unwrap();

        assert_eq!(
            events(&store),
            vec!["start 1", "create widgets", "commit"]
        );
    }

    #[test]
    fn create_existing_fails() {
        let store = store();
        let mut tx = store.begin_write();
        tx.create_bucket(b"widgets").unwrap();
        assert!(matches!(
            tx.create_bucket(b"widgets"),
            Err(CoreError::BucketExists { .. })
        ));
    }

    #[test]
    fn noop_writes_are_silent() {
        let store = store();
        let mut tx = store.begin_write();
        let b = tx.create_bucket(b"w").unwrap();
        tx.put(b, b"k", b"v").unwrap();
        tx.put(b, b"k", b"v").unwrap();
        tx.delete(b, b"missing").unwrap();
        tx.set_sequence(b, 0).unwrap();
        tx.commit().unwrap();

        assert_eq!(
            events(&store),
            vec!["start 1", "create w", "put w k", "commit"]
        );
    }

    #[test]
    fn sequence_events() {
        let store = store();
        let mut tx = store.begin_write();
        let b = tx.create_bucket(b"w").unwrap();
        assert_eq!(tx.next_sequence(b).unwrap(), 1);
        tx.set_sequence(b, 10).unwrap();
        assert_eq!(tx.next_sequence(b).unwrap(), 11);
        tx.commit().unwrap();

        assert_eq!(
            events(&store),
            vec!["start 1", "create w", "seq w 1", "seq w 10", "seq w 11", "commit"]
        );
    }

    #[test]
    fn sequence_overflow_fails() {
        let store = store();
        let mut tx = store.begin_write();
        let b = tx.create_bucket(b"w").unwrap();
        tx.set_sequence(b, u64::MAX).unwrap();
        assert!(tx.next_sequence(b).is_err());
    }

    #[test]
    fn nested_delete_fires_once() {
        let store = store();
        let mut tx = store.begin_write();
        let a = tx.create_bucket(b"a").unwrap();
        let b = tx.create_nested_bucket(a, b"b").unwrap();
        tx.create_nested_bucket(b, b"c").unwrap();
        tx.delete_bucket(b"a").unwrap();
        assert!(matches!(tx.inspect(b), Err(CoreError::StaleBucket { .. })));
        tx.commit().unwrap();

        assert_eq!(
            events(&store),
            vec!["start 1", "create a", "create a/b", "create a/b/c", "drop a", "commit"]
        );
    }

    #[test]
    fn delete_missing_bucket_fails() {
        let store = store();
        let mut tx = store.begin_write();
        assert!(matches!(
            tx.delete_bucket(b"nope"),
            Err(CoreError::BucketNotFound { .. })
        ));
    }

    #[test]
    fn move_reports_old_parent_and_new_path() {
        let store = store();
        let mut tx = store.begin_write();
        let a = tx.create_bucket(b"a").unwrap();
        let x = tx.create_bucket(b"x").unwrap();
        let b = tx.create_nested_bucket(a, b"b").unwrap();
        tx.move_bucket(b"b", Some(a), Some(x)).unwrap();
        assert_eq!(tx.full_name(b).unwrap(), "x/b");
        tx.move_bucket(b"b", Some(x), None).unwrap();
        assert_eq!(tx.full_name(b).unwrap(), "b");
        tx.commit().unwrap();

        assert_eq!(
            events(&store),
            vec![
                "start 1",
                "create a",
                "create x",
                "create a/b",
                "move a -> x/b",
                "move x -> b",
                "commit"
            ]
        );
    }

    #[test]
    fn move_into_descendant_fails() {
        let store = store();
        let mut tx = store.begin_write();
        let a = tx.create_bucket(b"a").unwrap();
        let b = tx.create_nested_bucket(a, b"b").unwrap();
        assert!(matches!(
            tx.move_bucket(b"a", None, Some(b)),
            Err(CoreError::InvalidOperation { .. })
        ));
        assert!(matches!(
            tx.move_bucket(b"b", Some(a), Some(a)),
            Err(CoreError::SameBuckets)
        ));
    }

    #[test]
    fn move_onto_existing_name_fails() {
        let store = store();
        let mut tx = store.begin_write();
        let a = tx.create_bucket(b"a").unwrap();
        tx.create_nested_bucket(a, b"a").unwrap();
        assert!(matches!(
            tx.move_bucket(b"a", Some(a), None),
            Err(CoreError::BucketExists { .. })
        ));
    }

    #[test]
    fn keys_and_buckets_share_namespace() {
        let store = store();
        let mut tx = store.begin_write();
        let a = tx.create_bucket(b"a").unwrap();
        tx.put(a, b"k", b"v").unwrap();
        tx.create_nested_bucket(a, b"sub").unwrap();

        assert!(matches!(
            tx.create_nested_bucket(a, b"k"),
            Err(CoreError::IncompatibleValue { .. })
        ));
        assert!(matches!(
            tx.put(a, b"sub", b"v"),
            Err(CoreError::IncompatibleValue { .. })
        ));
        assert!(matches!(
            tx.delete(a, b"sub"),
            Err(CoreError::IncompatibleValue { .. })
        ));
    }

    #[test]
    fn size_limits() {
        let config = Config::new().max_key_size(4).max_value_size(2);
        let store = Store::with_config(config, EventLog::default());
        let mut tx = store.begin_write();
        let a = tx.create_bucket(b"a").unwrap();

        assert!(matches!(
            tx.create_bucket(b""),
            Err(CoreError::BucketNameRequired)
        ));
        assert!(matches!(tx.put(a, b"", b"v"), Err(CoreError::KeyRequired)));
        assert!(matches!(
            tx.put(a, b"toolong", b"v"),
            Err(CoreError::KeyTooLarge { size: 7, max: 4 })
        ));
        assert!(matches!(
            tx.put(a, b"k", b"vvv"),
            Err(CoreError::ValueTooLarge { size: 3, max: 2 })
        ));
    }

    #[test]
    fn snapshot_is_isolated_from_later_commits() {
        let store = store();
        store
            .update(|tx| tx.create_bucket(b"a").map(|_| ()))
            .unwrap();
        let before = store.snapshot();
        store
            .update(|tx| tx.create_bucket(b"b").map(|_| ()))
            .unwrap();

        assert_eq!(before.bucket_names(None).unwrap(), vec![b"a".to_vec()]);
        assert_eq!(
            store.snapshot().bucket_names(None).unwrap(),
            vec![b"a".to_vec(), b"b".to_vec()]
        );
    }

    #[test]
    fn boxed_journal_store() {
        let journal: Box<dyn Journal> = Box::new(NoopJournal);
        let store = Store::with_journal(journal);
        store
            .update(|tx| tx.create_bucket(b"a").map(|_| ()))
            .unwrap();
        assert!(store.snapshot().bucket(b"a").is_some());
    }

    proptest! {
        #[test]
        fn one_event_per_changed_put(values in prop::collection::vec(0u8..4, 1..32)) {
            let store = store();
            let mut tx = store.begin_write();
            let b = tx.create_bucket(b"w").unwrap();
            let mut expected = 0;
            let mut current = None;
            for v in &values {
                tx.put(b, b"k", &[*v]).unwrap();
                if current != Some(*v) {
                    expected += 1;
                    current = Some(*v);
                }
            }
            tx.commit().unwrap();

            let puts = events(&store).iter().filter(|e| e.starts_with("put")).count();
            prop_assert_eq!(puts, expected);
        }
    }
}

//! Trace command implementation.
//!
//! Replays a script against a fresh in-memory store wired to a
//! [`StringJournal`] and prints what the journal recorded.

use super::script::{self, BucketPath, Line, ScriptError, Statement};
use bucketdb_core::{BucketId, CoreError, CoreResult, WriteTx};
use bucketdb_testkit::{recorded_store, RecordedStore, StringJournal};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

/// Result of replaying a script.
#[derive(Debug, Serialize)]
pub struct TraceReport {
    /// Script path, empty when replayed from memory.
    pub script: String,
    /// Number of write transactions the script opened.
    pub transactions: usize,
    /// Number of commits the journal rejected.
    pub vetoed: usize,
    /// Recorded trace, one entry per line.
    pub lines: Vec<String>,
}

/// Runs the trace command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read script {}: {e}", path.display()))?;
    debug!(script = %path.display(), "replaying script");

    let mut report = replay(&source)?;
    report.script = path.display().to_string();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            for line in &report.lines {
                println!("{line}");
            }
        }
    }

    Ok(())
}

/// Replays `source` and returns the recorded trace.
///
/// A transaction still open at the end of the script is rolled back.
pub fn replay(source: &str) -> Result<TraceReport, ScriptError> {
    let lines = script::parse(source)?;
    let store = recorded_store();

    let (transactions, vetoed) = {
        let mut session = Session::new(&store);
        for line in &lines {
            session.execute(line)?;
        }
        (session.transactions, session.vetoed)
    };

    let journal = store.into_journal();
    Ok(TraceReport {
        script: String::new(),
        transactions,
        vetoed,
        lines: journal.as_str().lines().map(str::to_owned).collect(),
    })
}

struct Session<'s> {
    store: &'s RecordedStore,
    tx: Option<WriteTx<'s, StringJournal>>,
    transactions: usize,
    vetoed: usize,
}

impl<'s> Session<'s> {
    fn new(store: &'s RecordedStore) -> Self {
        Self {
            store,
            tx: None,
            transactions: 0,
            vetoed: 0,
        }
    }

    fn execute(&mut self, line: &Line) -> Result<(), ScriptError> {
        let at = line.number;
        match &line.statement {
            Statement::Begin => {
                if self.tx.is_some() {
                    return Err(ScriptError::TransactionOpen { line: at });
                }
                self.tx = Some(self.store.begin_write());
                self.transactions += 1;
            }
            Statement::Commit => match self.take_tx(at)?.commit() {
                Ok(()) => {}
                Err(err) if err.is_journal_veto() => {
                    warn!(line = at, error = %err, "commit vetoed");
                    self.vetoed += 1;
                }
                Err(source) => return Err(ScriptError::Store { line: at, source }),
            },
            Statement::Rollback => self.take_tx(at)?.rollback(),
            Statement::Pause => self.with_journal(StringJournal::pause),
            Statement::Resume => self.with_journal(StringJournal::resume),
            Statement::Veto(reason) => {
                self.with_journal(|journal| journal.reject_next_commit(reason.as_str()));
            }
            mutation => {
                let tx = self
                    .tx
                    .as_mut()
                    .ok_or(ScriptError::NoTransaction { line: at })?;
                apply(tx, mutation).map_err(|source| ScriptError::Store { line: at, source })?;
            }
        }
        Ok(())
    }

    fn take_tx(&mut self, at: usize) -> Result<WriteTx<'s, StringJournal>, ScriptError> {
        self.tx
            .take()
            .ok_or(ScriptError::NoTransaction { line: at })
    }

    // The open transaction owns the writer lock, so the journal has to be
    // reached through it while one is open.
    fn with_journal(&mut self, f: impl FnOnce(&mut StringJournal)) {
        match self.tx.as_mut() {
            Some(tx) => f(tx.journal()),
            None => f(&mut *self.store.journal()),
        }
    }
}

fn apply(tx: &mut WriteTx<'_, StringJournal>, statement: &Statement) -> CoreResult<()> {
    match statement {
        Statement::Create(path) => match parent(tx, path)? {
            None => tx.create_bucket(path.name()).map(|_| ()),
            Some(p) => tx.create_nested_bucket(p, path.name()).map(|_| ()),
        },
        Statement::Ensure(path) => match parent(tx, path)? {
            None => tx.create_bucket_if_not_exists(path.name()).map(|_| ()),
            Some(p) => tx.create_nested_bucket_if_not_exists(p, path.name()).map(|_| ()),
        },
        Statement::Drop(path) => match parent(tx, path)? {
            None => tx.delete_bucket(path.name()),
            Some(p) => tx.delete_nested_bucket(p, path.name()),
        },
        Statement::Move { path, to } => {
            let from = parent(tx, path)?;
            let to = match to {
                Some(to) => Some(resolve(tx, to.segments())?),
                None => None,
            };
            tx.move_bucket(path.name(), from, to)
        }
        Statement::Put { path, key, value } => {
            let bucket = resolve(tx, path.segments())?;
            tx.put(bucket, key, value)
        }
        Statement::Del { path, key } => {
            let bucket = resolve(tx, path.segments())?;
            tx.delete(bucket, key)
        }
        Statement::Seq { path, value } => {
            let bucket = resolve(tx, path.segments())?;
            tx.set_sequence(bucket, *value)
        }
        Statement::NextSeq(path) => {
            let bucket = resolve(tx, path.segments())?;
            tx.next_sequence(bucket).map(|_| ())
        }
        Statement::Begin
        | Statement::Commit
        | Statement::Rollback
        | Statement::Pause
        | Statement::Resume
        | Statement::Veto(_) => Err(CoreError::invalid_operation(
            "not a bucket operation",
        )),
    }
}

fn parent(tx: &WriteTx<'_, StringJournal>, path: &BucketPath) -> CoreResult<Option<BucketId>> {
    if path.parent().is_empty() {
        return Ok(None);
    }
    resolve(tx, path.parent()).map(Some)
}

fn resolve(tx: &WriteTx<'_, StringJournal>, segments: &[Vec<u8>]) -> CoreResult<BucketId> {
    let (first, rest) = segments
        .split_first()
        .ok_or(CoreError::BucketNameRequired)?;
    let mut bucket = tx
        .bucket(first)
        .ok_or_else(|| CoreError::bucket_not_found(first))?;
    for name in rest {
        bucket = tx
            .nested_bucket(bucket, name)?
            .ok_or_else(|| CoreError::bucket_not_found(name))?;
    }
    Ok(bucket)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(source: &str) -> Vec<String> {
        replay(source).unwrap().lines
    }

    #[test]
    fn widgets_script() {
        let lines = trace("begin\ncreate widgets\nput widgets a 1\ncommit\n");
        assert_eq!(
            lines,
            [
                "WriteTxStarted(1)",
                "BucketCreated(widgets)",
                r#"KeyUpdated(widgets, "a", "1")"#,
                "WriteTxCommitted()",
            ]
        );
    }

    #[test]
    fn nested_paths_and_moves() {
        let lines = trace(
            "begin\ncreate a\ncreate a/b\ncreate c\nmove a/b c\nmove c/b /\nseq b 4\nnext-seq b\ncommit",
        );
        assert_eq!(
            lines,
            [
                "WriteTxStarted(1)",
                "BucketCreated(a)",
                "BucketCreated(a/b)",
                "BucketCreated(c)",
                "BucketMoved(a, c/b)",
                "BucketMoved(c, b)",
                "SequenceUpdated(b, 4)",
                "SequenceUpdated(b, 5)",
                "WriteTxCommitted()",
            ]
        );
    }

    #[test]
    fn ensure_and_noops_are_silent() {
        let lines = trace("begin\nensure a\nensure a\nput a k v\nput a k v\ndel a x\nseq a 0\ncommit");
        assert_eq!(
            lines,
            [
                "WriteTxStarted(1)",
                "BucketCreated(a)",
                r#"KeyUpdated(a, "k", "v")"#,
                "WriteTxCommitted()",
            ]
        );
    }

    #[test]
    fn veto_inside_transaction() {
        let report = replay("begin\ncreate a\nveto quota\ncommit\nbegin\ncommit").unwrap();
        assert_eq!(report.transactions, 2);
        assert_eq!(report.vetoed, 1);
        assert_eq!(
            report.lines,
            [
                "WriteTxStarted(1)",
                "BucketCreated(a)",
                "WriteTxCommitted()",
                "WriteTxRolledBack()",
                "WriteTxStarted(2)",
                "WriteTxCommitted()",
            ]
        );
    }

    #[test]
    fn pause_between_and_within_transactions() {
        let lines = trace("pause\nbegin\ncreate a\nresume\nput a k v\npause\ndrop a\npause\ncommit\nresume");
        assert_eq!(lines, ["// snip", r#"KeyUpdated(a, "k", "v")"#, "// snip"]);
    }

    #[test]
    fn open_transaction_is_rolled_back_at_end() {
        let lines = trace("begin\ncreate a");
        assert_eq!(lines, ["WriteTxStarted(1)", "BucketCreated(a)", "WriteTxRolledBack()"]);
    }

    #[test]
    fn transaction_errors() {
        let err = replay("put a k v").unwrap_err();
        assert!(matches!(err, ScriptError::NoTransaction { line: 1 }));

        let err = replay("begin\nbegin").unwrap_err();
        assert!(matches!(err, ScriptError::TransactionOpen { line: 2 }));

        let err = replay("commit").unwrap_err();
        assert!(matches!(err, ScriptError::NoTransaction { line: 1 }));
    }

    #[test]
    fn store_errors_carry_the_line() {
        let err = replay("begin\ncreate a\ncreate a").unwrap_err();
        assert!(matches!(
            err,
            ScriptError::Store {
                line: 3,
                source: CoreError::BucketExists { .. }
            }
        ));

        let err = replay("begin\nput missing k v").unwrap_err();
        assert_eq!(err.to_string(), "line 2: bucket not found: missing");
    }
}

//! Line-oriented trace recorder.
//!
//! [`StringJournal`] turns the stream of journal events into text, one event
//! per line, so a test can compare what a transaction did against an
//! expected list of lines:
//!
//! ```text
//! WriteTxStarted(1)
//! BucketCreated(widgets)
//! KeyUpdated(widgets, "a", "1")
//! WriteTxCommitted()
//! ```
//!
//! Buckets render as their full path, byte strings as quoted escaped text,
//! integers in decimal.

use bucketdb_core::{Bucket, Journal, JournalError, JournalResult, TxId};
use std::fmt::{self, Write as _};
use thiserror::Error;

/// Line written on the first transition into pause.
pub const SNIP: &str = "// snip";

/// Trace comparison failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unexpected write operations:\n{actual}")]
pub struct TraceMismatch {
    /// The expected trace.
    pub expected: String,
    /// The trace actually recorded.
    pub actual: String,
}

/// A journal that records writes as text.
///
/// Keys and values are formatted into the buffer during the hook call, so
/// nothing borrowed from the engine outlives the call.
#[derive(Debug, Default)]
pub struct StringJournal {
    buf: String,
    paused: bool,
    reject_next: Option<String>,
}

// Compile-time check that the recorder satisfies the hook contract.
const _: () = {
    const fn assert_journal<J: Journal>() {}
    assert_journal::<StringJournal>();
};

impl StringJournal {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops recording events.
    ///
    /// The first pause writes a single [`SNIP`] line to show that events were
    /// left out; pausing again while paused writes nothing.
    pub fn pause(&mut self) {
        if self.paused {
            return;
        }
        self.paused = true;
        self.buf.push_str(SNIP);
        self.buf.push('\n');
    }

    /// Resumes recording events.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Returns true while recording is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Makes the next recorded commit fail with `reason`.
    ///
    /// Commits while paused always succeed and leave the rejection armed.
    pub fn reject_next_commit(&mut self, reason: impl Into<String>) {
        self.reject_next = Some(reason.into());
    }

    /// Returns the trace recorded so far.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Discards the trace recorded so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Compares the recorded trace with `expected` and clears it.
    ///
    /// Each expected entry is one line without its newline. An empty slice
    /// expects an empty trace. The buffer is cleared whether or not the
    /// comparison succeeds.
    pub fn check(&mut self, expected: &[&str]) -> Result<(), TraceMismatch> {
        let actual = std::mem::take(&mut self.buf);
        let expected = expected_trace(expected);
        if actual == expected {
            Ok(())
        } else {
            Err(TraceMismatch { expected, actual })
        }
    }

    /// Like [`check`](Self::check), but panics with the recorded trace on
    /// mismatch.
    #[track_caller]
    pub fn verify(&mut self, expected: &[&str]) {
        if let Err(mismatch) = self.check(expected) {
            panic!("{mismatch}");
        }
    }

    fn emit(&mut self, line: fmt::Arguments<'_>) {
        if self.paused {
            return;
        }
        // Writing into a String cannot fail.
        let _ = self.buf.write_fmt(line);
        self.buf.push('\n');
    }
}

fn expected_trace(lines: &[&str]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut joined = lines.join("\n");
    joined.push('\n');
    joined
}

impl Journal for StringJournal {
    fn write_tx_started(&mut self, id: TxId) {
        self.emit(format_args!("WriteTxStarted({id})"));
    }

    fn bucket_created(&mut self, bucket: Bucket<'_>) {
        self.emit(format_args!("BucketCreated({bucket})"));
    }

    fn bucket_deleted(&mut self, bucket: Bucket<'_>) {
        self.emit(format_args!("BucketDeleted({bucket})"));
    }

    fn bucket_moved(&mut self, old_parent: Option<Bucket<'_>>, moved: Bucket<'_>) {
        match old_parent {
            Some(parent) => self.emit(format_args!("BucketMoved({parent}, {moved})")),
            None => self.emit(format_args!("BucketMoved(, {moved})")),
        }
    }

    fn key_deleted(&mut self, bucket: Bucket<'_>, key: &[u8]) {
        self.emit(format_args!("KeyDeleted({bucket}, {})", Quoted(key)));
    }

    fn key_updated(&mut self, bucket: Bucket<'_>, key: &[u8], value: &[u8]) {
        self.emit(format_args!(
            "KeyUpdated({bucket}, {}, {})",
            Quoted(key),
            Quoted(value)
        ));
    }

    fn sequence_updated(&mut self, bucket: Bucket<'_>, value: u64) {
        self.emit(format_args!("SequenceUpdated({bucket}, {value})"));
    }

    fn write_tx_committed(&mut self) -> JournalResult {
        if self.paused {
            return Ok(());
        }
        self.emit(format_args!("WriteTxCommitted()"));
        match self.reject_next.take() {
            Some(reason) => Err(JournalError::Rejected(reason)),
            None => Ok(()),
        }
    }

    fn write_tx_rolled_back(&mut self) {
        self.emit(format_args!("WriteTxRolledBack()"));
    }
}

/// Formats a byte string as double-quoted, backslash-escaped text.
///
/// - `"` and `\` are backslash-escaped.
/// - `\a`, `\b`, `\f`, `\n`, `\r`, `\t` and `\v` use their short forms.
/// - Other ASCII control bytes and bytes that are not valid UTF-8 become
///   `\xNN`.
/// - Non-ASCII characters that `{:?}` would escape (controls, format
///   characters such as U+00AD) become `\uNNNN`, or `\UNNNNNNNN` above
///   U+FFFF.
/// - Everything else, Unicode spaces included, is written as is.
#[derive(Debug, Clone, Copy)]
pub struct Quoted<'a>(pub &'a [u8]);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('"')?;
        for chunk in self.0.utf8_chunks() {
            for c in chunk.valid().chars() {
                match c {
                    '"' => f.write_str("\\\"")?,
                    '\\' => f.write_str("\\\\")?,
                    '\u{7}' => f.write_str("\\a")?,
                    '\u{8}' => f.write_str("\\b")?,
                    '\u{c}' => f.write_str("\\f")?,
                    '\n' => f.write_str("\\n")?,
                    '\r' => f.write_str("\\r")?,
                    '\t' => f.write_str("\\t")?,
                    '\u{b}' => f.write_str("\\v")?,
                    c if c.is_ascii_control() => write!(f, "\\x{:02x}", u32::from(c))?,
                    c if c.is_ascii() || is_printable(c) => f.write_char(c)?,
                    c if u32::from(c) > 0xffff => write!(f, "\\U{:08x}", u32::from(c))?,
                    c => write!(f, "\\u{:04x}", u32::from(c))?,
                }
            }
            for byte in chunk.invalid() {
                write!(f, "\\x{byte:02x}")?;
            }
        }
        f.write_char('"')
    }
}

/// Returns true if `{:?}` leaves `c` unescaped in the middle of a string.
fn is_printable(c: char) -> bool {
    // A leading space keeps combining marks from being escaped as a string
    // start.
    let pair: String = [' ', c].iter().collect();
    pair.escape_debug().nth(1) == Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quoted(bytes: &[u8]) -> String {
        Quoted(bytes).to_string()
    }

    #[test]
    fn quotes_plain_text() {
        assert_eq!(quoted(b"abc"), r#""abc""#);
        assert_eq!(quoted(b""), r#""""#);
    }

    #[test]
    fn escapes_quotes_and_backslashes() {
        assert_eq!(quoted(br#"a"b\c"#), r#""a\"b\\c""#);
    }

    #[test]
    fn escapes_control_characters() {
        assert_eq!(quoted(b"a\nb\tc\r"), r#""a\nb\tc\r""#);
        assert_eq!(quoted(b"\x00\x1b\x7f"), r#""\x00\x1b\x7f""#);
        assert_eq!(quoted(b"\x07\x08\x0b\x0c"), r#""\a\b\v\f""#);
        assert_eq!(quoted("\u{85}".as_bytes()), r#""\u0085""#);
    }

    #[test]
    fn escapes_invisible_format_characters() {
        assert_eq!(quoted("soft\u{ad}hyphen".as_bytes()), r#""soft\u00adhyphen""#);
        assert_eq!(quoted("\u{feff}".as_bytes()), r#""\ufeff""#);
        assert_eq!(quoted("\u{200b}".as_bytes()), r#""\u200b""#);
        assert_eq!(quoted("\u{10ffff}".as_bytes()), r#""\U0010ffff""#);
    }

    #[test]
    fn keeps_unicode() {
        assert_eq!(quoted("héllo ✓".as_bytes()), "\"héllo ✓\"");
    }

    #[test]
    fn escapes_invalid_utf8() {
        assert_eq!(quoted(b"a\xffb\xc3"), r#""a\xffb\xc3""#);
    }

    #[test]
    fn pause_writes_one_marker() {
        let mut journal = StringJournal::new();
        journal.pause();
        journal.pause();
        assert!(journal.is_paused());
        journal.write_tx_started(TxId::new(1));
        journal.resume();
        journal.write_tx_started(TxId::new(2));
        assert_eq!(journal.as_str(), "// snip\nWriteTxStarted(2)\n");
    }

    #[test]
    fn paused_commit_never_rejects() {
        let mut journal = StringJournal::new();
        journal.reject_next_commit("nope");
        journal.pause();
        assert!(journal.write_tx_committed().is_ok());
        journal.resume();
        assert!(matches!(
            journal.write_tx_committed(),
            Err(JournalError::Rejected(reason)) if reason == "nope"
        ));
        assert!(journal.write_tx_committed().is_ok());
    }

    #[test]
    fn check_clears_on_mismatch() {
        let mut journal = StringJournal::new();
        journal.write_tx_started(TxId::new(3));
        let err = journal.check(&["WriteTxStarted(4)"]).unwrap_err();
        assert_eq!(err.actual, "WriteTxStarted(3)\n");
        assert_eq!(err.expected, "WriteTxStarted(4)\n");
        assert_eq!(err.to_string(), "unexpected write operations:\nWriteTxStarted(3)\n");
        assert_eq!(journal.as_str(), "");
    }

    #[test]
    fn empty_expectation_matches_empty_trace() {
        let mut journal = StringJournal::new();
        journal.verify(&[]);
        journal.verify(&[]);
    }

    #[test]
    #[should_panic(expected = "unexpected write operations:\nWriteTxRolledBack()")]
    fn verify_panics_with_actual_trace() {
        let mut journal = StringJournal::new();
        journal.write_tx_rolled_back();
        journal.verify(&["WriteTxCommitted()"]);
    }

    #[test]
    fn usable_through_dyn_journal() {
        let mut journal = StringJournal::new();
        {
            let dynamic: &mut dyn Journal = &mut journal;
            dynamic.write_tx_started(TxId::new(1));
            dynamic.write_tx_rolled_back();
        }
        journal.verify(&["WriteTxStarted(1)", "WriteTxRolledBack()"]);
    }
}

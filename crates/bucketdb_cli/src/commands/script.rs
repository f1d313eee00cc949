//! Operation script parser.
//!
//! A script is one statement per line. Blank lines and lines starting with
//! `#` are ignored. Arguments are separated by whitespace; bucket paths use
//! `/` between segments.
//!
//! ```text
//! begin
//! create widgets
//! put widgets a 1
//! commit
//! ```

use thiserror::Error;

/// Script parse and replay errors.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The first word of a line is not a known command.
    #[error("line {line}: unknown command `{command}`")]
    UnknownCommand {
        /// 1-based line number.
        line: usize,
        /// The offending word.
        command: String,
    },

    /// Wrong number of arguments.
    #[error("line {line}: `{command}` expects {expected}")]
    Arity {
        /// 1-based line number.
        line: usize,
        /// The command.
        command: &'static str,
        /// Human readable argument list.
        expected: &'static str,
    },

    /// A bucket path with an empty segment.
    #[error("line {line}: invalid bucket path `{path}`")]
    InvalidPath {
        /// 1-based line number.
        line: usize,
        /// The path as written.
        path: String,
    },

    /// A sequence value that is not a `u64`.
    #[error("line {line}: invalid sequence value `{value}`")]
    InvalidNumber {
        /// 1-based line number.
        line: usize,
        /// The value as written.
        value: String,
    },

    /// A mutation or `commit`/`rollback` outside a transaction.
    #[error("line {line}: no write transaction is open")]
    NoTransaction {
        /// 1-based line number.
        line: usize,
    },

    /// `begin` while a transaction is already open.
    #[error("line {line}: a write transaction is already open")]
    TransactionOpen {
        /// 1-based line number.
        line: usize,
    },

    /// The store refused an operation.
    #[error("line {line}: {source}")]
    Store {
        /// 1-based line number.
        line: usize,
        /// Engine error.
        #[source]
        source: bucketdb_core::CoreError,
    },
}

/// A `/`-separated bucket path with at least one non-empty segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketPath(Vec<Vec<u8>>);

impl BucketPath {
    fn parse(text: &str) -> Option<Self> {
        let segments: Vec<Vec<u8>> = text.split('/').map(|s| s.as_bytes().to_vec()).collect();
        if segments.iter().any(Vec::is_empty) {
            return None;
        }
        Some(Self(segments))
    }

    /// All segments, outermost first.
    pub fn segments(&self) -> &[Vec<u8>] {
        &self.0
    }

    /// The last segment.
    pub fn name(&self) -> &[u8] {
        self.0.last().map(Vec::as_slice).unwrap_or_default()
    }

    /// Every segment but the last. Empty for a top-level bucket.
    pub fn parent(&self) -> &[Vec<u8>] {
        self.0.split_last().map(|(_, parent)| parent).unwrap_or_default()
    }
}

/// One script statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Open a write transaction.
    Begin,
    /// Commit the open transaction.
    Commit,
    /// Roll back the open transaction.
    Rollback,
    /// Create a bucket; its parent must exist.
    Create(BucketPath),
    /// Create a bucket unless it already exists.
    Ensure(BucketPath),
    /// Delete a bucket.
    Drop(BucketPath),
    /// Move a bucket under `to`, or to the top level when `to` is `None`.
    Move {
        /// Bucket to move.
        path: BucketPath,
        /// New parent.
        to: Option<BucketPath>,
    },
    /// Set a key.
    Put {
        /// Target bucket.
        path: BucketPath,
        /// Key bytes.
        key: Vec<u8>,
        /// Value bytes.
        value: Vec<u8>,
    },
    /// Delete a key.
    Del {
        /// Target bucket.
        path: BucketPath,
        /// Key bytes.
        key: Vec<u8>,
    },
    /// Set the bucket sequence.
    Seq {
        /// Target bucket.
        path: BucketPath,
        /// New value.
        value: u64,
    },
    /// Increment the bucket sequence.
    NextSeq(BucketPath),
    /// Pause the recorder.
    Pause,
    /// Resume the recorder.
    Resume,
    /// Reject the next recorded commit.
    Veto(String),
}

/// A statement with its 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number.
    pub number: usize,
    /// Parsed statement.
    pub statement: Statement,
}

/// Parses a whole script.
pub fn parse(source: &str) -> Result<Vec<Line>, ScriptError> {
    let mut lines = Vec::new();
    for (index, text) in source.lines().enumerate() {
        let text = text.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let number = index + 1;
        lines.push(Line {
            number,
            statement: parse_statement(number, text)?,
        });
    }
    Ok(lines)
}

fn parse_statement(line: usize, text: &str) -> Result<Statement, ScriptError> {
    let mut words = text.split_whitespace();
    let command = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    let arity = |command: &'static str, expected: &'static str| ScriptError::Arity {
        line,
        command,
        expected,
    };

    let statement = match (command, args.as_slice()) {
        ("begin", []) => Statement::Begin,
        ("commit", []) => Statement::Commit,
        ("rollback", []) => Statement::Rollback,
        ("pause", []) => Statement::Pause,
        ("resume", []) => Statement::Resume,
        ("begin", _) => return Err(arity("begin", "no arguments")),
        ("commit", _) => return Err(arity("commit", "no arguments")),
        ("rollback", _) => return Err(arity("rollback", "no arguments")),
        ("pause", _) => return Err(arity("pause", "no arguments")),
        ("resume", _) => return Err(arity("resume", "no arguments")),

        ("create", [p]) => Statement::Create(bucket_path(line, p)?),
        ("ensure", [p]) => Statement::Ensure(bucket_path(line, p)?),
        ("drop", [p]) => Statement::Drop(bucket_path(line, p)?),
        ("next-seq", [p]) => Statement::NextSeq(bucket_path(line, p)?),
        ("create", _) => return Err(arity("create", "<path>")),
        ("ensure", _) => return Err(arity("ensure", "<path>")),
        ("drop", _) => return Err(arity("drop", "<path>")),
        ("next-seq", _) => return Err(arity("next-seq", "<path>")),

        ("move", [p, "/"]) => Statement::Move {
            path: bucket_path(line, p)?,
            to: None,
        },
        ("move", [p, to]) => Statement::Move {
            path: bucket_path(line, p)?,
            to: Some(bucket_path(line, to)?),
        },
        ("move", _) => return Err(arity("move", "<path> <new-parent>")),

        ("put", [p, key, value]) => Statement::Put {
            path: bucket_path(line, p)?,
            key: key.as_bytes().to_vec(),
            value: value.as_bytes().to_vec(),
        },
        ("put", _) => return Err(arity("put", "<path> <key> <value>")),

        ("del", [p, key]) => Statement::Del {
            path: bucket_path(line, p)?,
            key: key.as_bytes().to_vec(),
        },
        ("del", _) => return Err(arity("del", "<path> <key>")),

        ("seq", [p, value]) => Statement::Seq {
            path: bucket_path(line, p)?,
            value: value.parse().map_err(|_| ScriptError::InvalidNumber {
                line,
                value: (*value).to_owned(),
            })?,
        },
        ("seq", _) => return Err(arity("seq", "<path> <n>")),

        ("veto", []) => return Err(arity("veto", "<reason>")),
        ("veto", reason) => Statement::Veto(reason.join(" ")),

        (other, _) => {
            return Err(ScriptError::UnknownCommand {
                line,
                command: other.to_owned(),
            })
        }
    };
    Ok(statement)
}

fn bucket_path(line: usize, text: &str) -> Result<BucketPath, ScriptError> {
    BucketPath::parse(text).ok_or_else(|| ScriptError::InvalidPath {
        line,
        path: text.to_owned(),
    })
}

//! # BucketDB Core
//!
//! Write-path journal hooks for a single-writer, hierarchical-bucket,
//! transactional key-value store.
//!
//! This crate provides:
//! - The [`Journal`] trait: synchronous callbacks fired for every mutation a
//!   write transaction actually applies, plus a commit hook that can veto
//! - Bucket path resolution ([`full_name`], [`write_full_name`])
//! - A minimal in-memory engine ([`Store`], [`WriteTx`]) that drives the hooks
//!
//! ## Example
//!
//! ```rust
//! use bucketdb_core::{NoopJournal, Store};
//!
//! let store = Store::with_journal(NoopJournal);
//! store
//!     .update(|tx| {
//!         let widgets = tx.create_bucket(b"widgets")?;
//!         tx.put(widgets, b"a", b"1")?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let value = store.view(|snap| {
//!     let widgets = snap.bucket(b"widgets").unwrap();
//!     snap.get(widgets, b"a").unwrap().map(<[u8]>::to_vec)
//! });
//! assert_eq!(value.as_deref(), Some(&b"1"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bucket;
mod config;
mod error;
mod journal;
mod path;
mod store;
mod types;

pub use bucket::{Bucket, BucketId};
pub use config::{Config, DEFAULT_MAX_KEY_SIZE, DEFAULT_MAX_VALUE_SIZE};
pub use error::{CoreError, CoreResult};
pub use journal::{Journal, JournalError, JournalResult, NoopJournal};
pub use path::{full_name, write_full_name};
pub use store::{Snapshot, Store, WriteTx};
pub use types::TxId;

/// Crate version, exposed for tooling.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

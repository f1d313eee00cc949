//! # BucketDB Testkit
//!
//! Test utilities for BucketDB.
//!
//! This crate provides:
//! - [`StringJournal`], a journal that records every write as one line of
//!   text, and the `verify`/`check` harness that compares the recording
//!   against an expected trace
//! - Store fixtures wired to a recorder
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use bucketdb_testkit::prelude::*;
//!
//! let store = recorded_store();
//! store
//!     .update(|tx| {
//!         let widgets = tx.create_bucket(b"widgets")?;
//!         tx.put(widgets, b"a", b"1")?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! store.verify_trace(&[
//!     "WriteTxStarted(1)",
//!     "BucketCreated(widgets)",
//!     r#"KeyUpdated(widgets, "a", "1")"#,
//!     "WriteTxCommitted()",
//! ]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod journal;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::journal::*;
}

pub use fixtures::*;
pub use generators::*;
pub use journal::*;

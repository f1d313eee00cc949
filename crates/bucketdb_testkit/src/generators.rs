//! Property-based test generators using proptest.
//!
//! The key and value alphabets are deliberately tiny so that generated
//! operation sequences revisit the same keys and values, which exercises the
//! paths where a write turns out to be a no-op.

use bucketdb_core::{BucketId, CoreResult, Journal, WriteTx};
use proptest::prelude::*;

/// Strategy for top-level bucket names.
pub fn bucket_name_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,7}")
        .expect("Invalid regex")
        .prop_map(String::into_bytes)
}

/// Strategy for keys drawn from a small alphabet.
pub fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::string::string_regex("[a-c]{1,2}")
        .expect("Invalid regex")
        .prop_map(String::into_bytes)
}

/// Strategy for values drawn from a small alphabet.
pub fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::string::string_regex("[0-2]{0,1}")
        .expect("Invalid regex")
        .prop_map(String::into_bytes)
}

/// Strategy for nested bucket names. Upper case, so they never collide with
/// keys from [`key_strategy`].
pub fn child_name_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::string::string_regex("[A-B]")
        .expect("Invalid regex")
        .prop_map(String::into_bytes)
}

/// One mutation applied to a single bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// `put(key, value)`.
    Put {
        /// Key to write.
        key: Vec<u8>,
        /// Value to write.
        value: Vec<u8>,
    },
    /// `delete(key)`.
    Delete {
        /// Key to delete.
        key: Vec<u8>,
    },
    /// `set_sequence(value)`.
    SetSequence(u64),
    /// `next_sequence()`.
    NextSequence,
    /// `create_nested_bucket_if_not_exists(name)`.
    EnsureChild(Vec<u8>),
    /// `delete_nested_bucket(name)` if the child exists.
    DropChild(Vec<u8>),
}

impl Op {
    /// Applies the operation to `bucket`.
    pub fn apply<J: Journal>(&self, tx: &mut WriteTx<'_, J>, bucket: BucketId) -> CoreResult<()> {
        match self {
            Op::Put { key, value } => tx.put(bucket, key, value),
            Op::Delete { key } => tx.delete(bucket, key),
            Op::SetSequence(value) => tx.set_sequence(bucket, *value),
            Op::NextSequence => tx.next_sequence(bucket).map(|_| ()),
            Op::EnsureChild(name) => tx
                .create_nested_bucket_if_not_exists(bucket, name)
                .map(|_| ()),
            Op::DropChild(name) => match tx.nested_bucket(bucket, name)? {
                Some(_) => tx.delete_nested_bucket(bucket, name),
                None => Ok(()),
            },
        }
    }
}

/// Strategy for a single [`Op`].
pub fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (key_strategy(), value_strategy()).prop_map(|(key, value)| Op::Put { key, value }),
        2 => key_strategy().prop_map(|key| Op::Delete { key }),
        1 => (0u64..3).prop_map(Op::SetSequence),
        1 => Just(Op::NextSequence),
        1 => child_name_strategy().prop_map(Op::EnsureChild),
        1 => child_name_strategy().prop_map(Op::DropChild),
    ]
}

/// Strategy for a sequence of up to `max_len` operations.
pub fn ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op_strategy(), 0..max_len)
}

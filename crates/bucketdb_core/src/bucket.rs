//! Arena-backed bucket tree.
//!
//! Buckets are stored in a flat arena owned by the tree. Each node keeps its
//! parent as an index, never as an owning pointer, so walking towards the
//! root is a sequence of arena lookups. Slots of removed buckets are never
//! reused, which keeps stale [`BucketId`]s from aliasing newer buckets.

use crate::error::{CoreError, CoreResult};
use std::collections::BTreeMap;
use std::fmt;

/// Handle to a bucket inside a transaction's tree.
///
/// Handles are cheap to copy and stay valid across commits for as long as
/// the bucket exists. A handle created by a transaction that was rolled back
/// never refers to a live bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketId(usize);

impl BucketId {
    /// Returns the raw arena index.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bucket:{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct BucketNode {
    name: Vec<u8>,
    parent: Option<BucketId>,
    children: BTreeMap<Vec<u8>, BucketId>,
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    sequence: u64,
}

impl BucketNode {
    fn new(name: &[u8], parent: Option<BucketId>) -> Self {
        Self {
            name: name.to_vec(),
            parent,
            children: BTreeMap::new(),
            entries: BTreeMap::new(),
            sequence: 0,
        }
    }
}

/// A read-only view of one bucket, handed to journals and readers.
///
/// The view borrows the tree it came from, so its ancestry is stable for as
/// long as it is held.
#[derive(Clone, Copy)]
pub struct Bucket<'a> {
    tree: &'a Tree,
    id: BucketId,
    node: &'a BucketNode,
}

impl<'a> Bucket<'a> {
    /// Returns the bucket's handle.
    #[must_use]
    pub fn id(&self) -> BucketId {
        self.id
    }

    /// Returns the bucket's own name (not its full path).
    #[must_use]
    pub fn name(&self) -> &'a [u8] {
        &self.node.name
    }

    /// Returns the owning bucket, or `None` for a top-level bucket.
    #[must_use]
    pub fn parent(&self) -> Option<Bucket<'a>> {
        self.node.parent.and_then(|p| self.tree.view(p))
    }

    /// Returns the bucket's current sequence number.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.node.sequence
    }

    /// Returns the number of keys (values only, not nested buckets).
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.node.entries.len()
    }
}

impl fmt::Debug for Bucket<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bucket")
            .field("id", &self.id)
            .field("path", &crate::path::full_name(*self))
            .finish()
    }
}

impl fmt::Display for Bucket<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::path::write_full_name(f, *self)
    }
}

/// The bucket hierarchy of one committed state or one write transaction.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tree {
    nodes: Vec<Option<BucketNode>>,
    roots: BTreeMap<Vec<u8>, BucketId>,
}

impl Tree {
    pub(crate) fn view(&self, id: BucketId) -> Option<Bucket<'_>> {
        let node = self.nodes.get(id.0)?.as_ref()?;
        Some(Bucket {
            tree: self,
            id,
            node,
        })
    }

    pub(crate) fn live(&self, id: BucketId) -> CoreResult<Bucket<'_>> {
        self.view(id).ok_or(CoreError::StaleBucket { id: id.as_usize() })
    }

    fn node_mut(&mut self, id: BucketId) -> CoreResult<&mut BucketNode> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(CoreError::StaleBucket { id: id.as_usize() })
    }

    fn children(&self, parent: Option<BucketId>) -> CoreResult<&BTreeMap<Vec<u8>, BucketId>> {
        match parent {
            None => Ok(&self.roots),
            Some(id) => Ok(&self.live(id)?.node.children),
        }
    }

    fn children_mut(
        &mut self,
        parent: Option<BucketId>,
    ) -> CoreResult<&mut BTreeMap<Vec<u8>, BucketId>> {
        match parent {
            None => Ok(&mut self.roots),
            Some(id) => Ok(&mut self.node_mut(id)?.children),
        }
    }

    /// Finds a child bucket by name. `None` parent means the top level.
    pub(crate) fn lookup(
        &self,
        parent: Option<BucketId>,
        name: &[u8],
    ) -> CoreResult<Option<BucketId>> {
        Ok(self.children(parent)?.get(name).copied())
    }

    /// Returns true if `name` is stored as a plain value in `parent`.
    pub(crate) fn has_value(&self, parent: Option<BucketId>, name: &[u8]) -> CoreResult<bool> {
        match parent {
            None => Ok(false),
            Some(id) => Ok(self.live(id)?.node.entries.contains_key(name)),
        }
    }

    /// Lists the names of the buckets under `parent`.
    pub(crate) fn bucket_names(&self, parent: Option<BucketId>) -> CoreResult<Vec<Vec<u8>>> {
        Ok(self.children(parent)?.keys().cloned().collect())
    }

    /// Number of arena slots this tree has handed out.
    pub(crate) fn slot_count(&self) -> usize {
        self.nodes.len()
    }

    /// Marks every slot below `count` as used, so `insert` never hands them
    /// out again.
    pub(crate) fn retire_slots(&mut self, count: usize) {
        if self.nodes.len() < count {
            self.nodes.resize_with(count, || None);
        }
    }

    pub(crate) fn insert(&mut self, parent: Option<BucketId>, name: &[u8]) -> CoreResult<BucketId> {
        let id = BucketId(self.nodes.len());
        self.children_mut(parent)?.insert(name.to_vec(), id);
        self.nodes.push(Some(BucketNode::new(name, parent)));
        Ok(id)
    }

    /// Unlinks `id` from `parent` and frees it together with its subtree.
    pub(crate) fn remove(&mut self, parent: Option<BucketId>, id: BucketId) -> CoreResult<()> {
        let name = self.live(id)?.node.name.clone();
        self.children_mut(parent)?.remove(&name);

        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.get_mut(next.0).and_then(Option::take) {
                pending.extend(node.children.into_values());
            }
        }
        Ok(())
    }

    /// Moves `id` from `from` to `to`, keeping its name and contents.
    pub(crate) fn relink(
        &mut self,
        id: BucketId,
        from: Option<BucketId>,
        to: Option<BucketId>,
    ) -> CoreResult<()> {
        let name = self.live(id)?.node.name.clone();
        self.children_mut(from)?.remove(&name);
        self.children_mut(to)?.insert(name, id);
        self.node_mut(id)?.parent = to;
        Ok(())
    }

    /// Returns true if `ancestor` is `id` itself or lies on its parent chain.
    pub(crate) fn is_self_or_ancestor(&self, ancestor: BucketId, id: BucketId) -> bool {
        let mut cursor = self.view(id);
        while let Some(bucket) = cursor {
            if bucket.id == ancestor {
                return true;
            }
            cursor = bucket.parent();
        }
        false
    }

    pub(crate) fn get(&self, id: BucketId, key: &[u8]) -> CoreResult<Option<&[u8]>> {
        Ok(self.live(id)?.node.entries.get(key).map(Vec::as_slice))
    }

    /// Stores `value` under `key`. Returns false if the stored value was
    /// already identical.
    pub(crate) fn put(&mut self, id: BucketId, key: &[u8], value: &[u8]) -> CoreResult<bool> {
        let node = self.node_mut(id)?;
        if node.entries.get(key).is_some_and(|v| v.as_slice() == value) {
            return Ok(false);
        }
        node.entries.insert(key.to_vec(), value.to_vec());
        Ok(true)
    }

    /// Removes `key`. Returns false if it was absent.
    pub(crate) fn delete(&mut self, id: BucketId, key: &[u8]) -> CoreResult<bool> {
        Ok(self.node_mut(id)?.entries.remove(key).is_some())
    }

    /// Sets the sequence. Returns false if it already had that value.
    pub(crate) fn set_sequence(&mut self, id: BucketId, value: u64) -> CoreResult<bool> {
        let node = self.node_mut(id)?;
        if node.sequence == value {
            return Ok(false);
        }
        node.sequence = value;
        Ok(true)
    }
}

//! Immutable bucket views and cursors
//!
//! A bucket is a node of a copy-on-write tree. Every handle to a node is an
//! `Arc`, so a [`BucketRef`] or [`Cursor`] is a point-in-time view: a commit
//! copies any node a live view still holds before changing it, and updates
//! unshared nodes in place.
//!
//! # Design Notes
//!
//! - **Owned**: handles do not borrow the transaction that produced them and
//!   stay readable after it commits or rolls back
//! - **Immutable**: once created, the view never changes
//! - **Thread-safe**: the underlying nodes are `Send + Sync`

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

/// One bucket: ordered entries plus its sequence counter.
#[derive(Debug, Clone, Default)]
pub(crate) struct Node {
    pub(crate) entries: BTreeMap<Vec<u8>, Entry>,
    pub(crate) sequence: u64,
}

#[derive(Debug, Clone)]
pub(crate) enum Entry {
    Value(Arc<[u8]>),
    Bucket(Arc<Node>),
}

/// Entry yielded by a [`Cursor`].
///
/// Nested buckets are yielded with `value == None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorEntry {
    /// Entry key
    pub key: Vec<u8>,
    /// Entry value, `None` for a nested bucket
    pub value: Option<Vec<u8>>,
}

impl CursorEntry {
    fn from_parts(key: &[u8], entry: &Entry) -> Self {
        let value = match entry {
            Entry::Value(v) => Some(v.to_vec()),
            Entry::Bucket(_) => None,
        };
        Self {
            key: key.to_vec(),
            value,
        }
    }

    /// True for a nested bucket entry.
    pub fn is_bucket(&self) -> bool {
        self.value.is_none()
    }
}

/// Read-only handle to a bucket.
#[derive(Debug, Clone)]
pub struct BucketRef {
    pub(crate) node: Arc<Node>,
}

impl BucketRef {
    pub(crate) fn new(node: Arc<Node>) -> Self {
        Self { node }
    }

    /// Value stored at `key`; `None` if absent or a nested bucket.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        match self.node.entries.get(key) {
            Some(Entry::Value(v)) => Some(&v[..]),
            _ => None,
        }
    }

    /// Nested bucket called `name`.
    pub fn bucket(&self, name: &[u8]) -> Option<BucketRef> {
        match self.node.entries.get(name) {
            Some(Entry::Bucket(child)) => Some(BucketRef::new(Arc::clone(child))),
            _ => None,
        }
    }

    /// Number of entries, nested buckets included.
    pub fn len(&self) -> usize {
        self.node.entries.len()
    }

    /// True when the bucket has no entries.
    pub fn is_empty(&self) -> bool {
        self.node.entries.is_empty()
    }

    /// Entries in key order; nested buckets have no value.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], Option<&[u8]>)> {
        self.node.entries.iter().map(|(k, e)| {
            let v = match e {
                Entry::Value(v) => Some(&v[..]),
                Entry::Bucket(_) => None,
            };
            (k.as_slice(), v)
        })
    }

    /// Forward cursor positioned before the first entry.
    pub fn cursor(&self) -> Cursor {
        Cursor {
            node: Arc::clone(&self.node),
            position: Position::Start,
        }
    }
}

#[derive(Debug, Clone)]
enum Position {
    Start,
    At(Vec<u8>),
    End,
}

/// Forward cursor over the entries of one bucket, in key order.
///
/// The cursor owns its snapshot and yields owned entries.
#[derive(Debug, Clone)]
pub struct Cursor {
    node: Arc<Node>,
    position: Position,
}

impl Iterator for Cursor {
    type Item = CursorEntry;

    fn next(&mut self) -> Option<CursorEntry> {
        let found = match &self.position {
            Position::Start => self
                .node
                .entries
                .iter()
                .next()
                .map(|(k, e)| CursorEntry::from_parts(k, e)),
            Position::At(last) => self
                .node
                .entries
                .range::<[u8], _>((Bound::Excluded(last.as_slice()), Bound::Unbounded))
                .next()
                .map(|(k, e)| CursorEntry::from_parts(k, e)),
            Position::End => return None,
        };
        self.position = match &found {
            Some(entry) => Position::At(entry.key.clone()),
            None => Position::End,
        };
        found
    }
}

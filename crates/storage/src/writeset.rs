//! Pending writes of a writable transaction
//!
//! A [`WriteSet`] records, per bucket path, the values put and the last
//! sequence handed out. The committed tree is not touched until commit,
//! when [`WriteSet::apply`] folds the changes into the published root in
//! place. A commit therefore costs what the transaction wrote, not the size
//! of the buckets it wrote into.
//!
//! The same structure is the payload of a commit log record, and
//! [`WriteSet::from_tree`] turns a whole tree into one for checkpoints.
//!
//! # Design Notes
//!
//! - **Existence**: a path present in the set is a bucket, either created by
//!   the transaction or already committed and written to
//! - **Ordering**: paths sort parents first, so applying in key order always
//!   finds the parent bucket in place

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::snapshot::{Entry, Node};

/// Owned bucket path, one segment per nesting level.
pub(crate) type Path = Vec<Vec<u8>>;

/// Changes made to one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct BucketDelta {
    pub(crate) puts: BTreeMap<Vec<u8>, Vec<u8>>,
    pub(crate) sequence: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct WriteSet {
    buckets: BTreeMap<Path, BucketDelta>,
}

impl WriteSet {
    pub(crate) fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of values put across all buckets.
    pub(crate) fn put_count(&self) -> usize {
        self.buckets.values().map(|d| d.puts.len()).sum()
    }

    pub(crate) fn delta(&self, path: &[Vec<u8>]) -> Option<&BucketDelta> {
        self.buckets.get(path)
    }

    /// Delta for `path`, recording the bucket if it is new to the set.
    pub(crate) fn delta_mut(&mut self, path: &[Vec<u8>]) -> &mut BucketDelta {
        self.buckets.entry(path.to_vec()).or_default()
    }

    /// True if the bucket at `path` or anything below it has changes.
    pub(crate) fn touches(&self, path: &[Vec<u8>]) -> bool {
        self.under(path).next().is_some()
    }

    /// Names of the direct children of `path` that have changes at or
    /// below them.
    pub(crate) fn touched_children(&self, path: &[Vec<u8>]) -> BTreeSet<Vec<u8>> {
        self.under(path)
            .filter_map(|(p, _)| p.get(path.len()).cloned())
            .collect()
    }

    // Paths sharing a prefix are contiguous and start at the prefix itself.
    fn under<'a>(
        &'a self,
        path: &'a [Vec<u8>],
    ) -> impl Iterator<Item = (&'a Path, &'a BucketDelta)> + 'a {
        self.buckets
            .range::<[Vec<u8>], _>((Bound::Included(path), Bound::Unbounded))
            .take_while(move |(p, _)| p.starts_with(path))
    }

    /// Fold the changes into `root`.
    ///
    /// Nodes shared with a live snapshot are copied before they change;
    /// every other node is updated in place.
    pub(crate) fn apply(self, root: &mut Node) {
        'buckets: for (path, delta) in self.buckets {
            let mut node = &mut *root;
            for segment in path {
                let entry = node
                    .entries
                    .entry(segment)
                    .or_insert_with(|| Entry::Bucket(Arc::default()));
                let Entry::Bucket(child) = entry else {
                    warn!(target: "rowkv::storage", "bucket path runs through a value, change skipped");
                    continue 'buckets;
                };
                node = Arc::make_mut(child);
            }
            for (key, value) in delta.puts {
                node.entries.insert(key, Entry::Value(Arc::from(value)));
            }
            if let Some(sequence) = delta.sequence {
                node.sequence = sequence;
            }
        }
    }

    /// Every bucket, value and sequence of `root` as one write set.
    pub(crate) fn from_tree(root: &Node) -> Self {
        let mut set = Self::default();
        let mut stack: Vec<(Path, &Node)> = vec![(Vec::new(), root)];
        while let Some((path, node)) = stack.pop() {
            let mut delta = BucketDelta {
                puts: BTreeMap::new(),
                sequence: (node.sequence > 0).then_some(node.sequence),
            };
            for (key, entry) in &node.entries {
                match entry {
                    Entry::Value(value) => {
                        delta.puts.insert(key.clone(), value.to_vec());
                    }
                    Entry::Bucket(child) => {
                        let mut child_path = path.clone();
                        child_path.push(key.clone());
                        stack.push((child_path, &**child));
                    }
                }
            }
            set.buckets.insert(path, delta);
        }
        set
    }
}

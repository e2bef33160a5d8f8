use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    tdb::{Tdb, TdbDifferences},
    tree::{KeyDiff, ValueTree},
};

/// One installed, immutable view of the merged configuration.
#[derive(Debug, Clone)]
pub struct Snapshot {
    tree: Arc<ValueTree>,
    tdb: Arc<Tdb>,
    loaded_at: DateTime<Utc>,
    has_local_overrides: bool,
}

impl Snapshot {
    pub(crate) fn new(tree: ValueTree, tdb: Arc<Tdb>, has_local_overrides: bool) -> Self {
        let mut tree = tree;
        tree.seal();
        Self {
            tree: Arc::new(tree),
            tdb,
            loaded_at: Utc::now(),
            has_local_overrides,
        }
    }

    /// Sealed empty snapshot used before anything is loaded.
    pub fn empty() -> Self {
        let mut tdb = Tdb::new();
        tdb.seal();
        Self::new(ValueTree::new(), Arc::new(tdb), false)
    }

    /// Merged configuration tree.
    pub fn tree(&self) -> &ValueTree {
        &self.tree
    }

    /// Shared handle to the merged tree.
    pub fn tree_arc(&self) -> Arc<ValueTree> {
        self.tree.clone()
    }

    /// Merged catalog.
    pub fn tdb(&self) -> &Arc<Tdb> {
        &self.tdb
    }

    /// When this snapshot was built.
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// True if any local cache-config file contributed.
    pub fn has_local_overrides(&self) -> bool {
        self.has_local_overrides
    }

    /// Shorthand for `tree().get(key)`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tree.get(key)
    }
}

/// Changes between two snapshots, handed to callbacks.
#[derive(Debug, Clone)]
pub struct Differences {
    /// Changed configuration keys
    pub keys: KeyDiff,
    /// Changed catalog entries
    pub tdb: TdbDifferences,
}

impl Differences {
    /// Computes the differences from `old` to `new`.
    pub fn compute(new: &Snapshot, old: Option<&Snapshot>) -> Self {
        Self {
            keys: new.tree.differences(old.map(|s| s.tree.as_ref())),
            tdb: TdbDifferences::compute(&new.tdb, old.map(|s| s.tdb.as_ref())),
        }
    }

    /// Everything in `snapshot` counts as changed.
    pub fn all(snapshot: &Snapshot) -> Self {
        Self::compute(snapshot, None)
    }

    /// True if `key` or anything under it changed.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// True if neither keys nor catalog changed.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.tdb.is_empty()
    }
}

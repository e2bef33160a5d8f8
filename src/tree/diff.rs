use std::collections::{BTreeMap, BTreeSet};

use super::key_ops::{SEPARATOR, is_under};

/// Key-level change set between two trees.
///
/// `All` is the sentinel used when there is nothing to compare against
/// (first load, or a freshly registered callback); every key counts as
/// changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDiff {
    /// Every key should be treated as changed.
    All,
    /// Only the listed keys changed.
    Changed(ChangedKeys),
}

/// Explicit set of changed keys with their ancestor prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedKeys {
    keys: BTreeSet<String>,
    prefixes: BTreeSet<String>,
}

impl ChangedKeys {
    /// Builds a change set from the given keys.
    pub fn from_keys(keys: impl IntoIterator<Item = String>) -> Self {
        let keys: BTreeSet<String> = keys.into_iter().collect();
        let prefixes = keys
            .iter()
            .flat_map(|key| {
                key.match_indices(SEPARATOR)
                    .map(move |(idx, _)| key[..idx].to_string())
            })
            .collect();

        Self { keys, prefixes }
    }

    /// Iterates the changed keys in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Number of changed keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if no key changed.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyDiff {
    /// Computes the symmetric difference of two key/value maps.
    pub(super) fn between(new: &BTreeMap<String, String>, old: &BTreeMap<String, String>) -> Self {
        let added_or_changed = new
            .iter()
            .filter(|(key, value)| old.get(*key) != Some(*value))
            .map(|(key, _)| key.clone());
        let removed = old
            .keys()
            .filter(|key| !new.contains_key(*key))
            .cloned();

        KeyDiff::Changed(ChangedKeys::from_keys(added_or_changed.chain(removed)))
    }

    /// True if this is the "everything changed" sentinel.
    pub fn is_all(&self) -> bool {
        matches!(self, KeyDiff::All)
    }

    /// True if no key changed.
    pub fn is_empty(&self) -> bool {
        match self {
            KeyDiff::All => false,
            KeyDiff::Changed(changed) => changed.is_empty(),
        }
    }

    /// True if `key`, or anything below it, changed.
    ///
    /// Passing a subtree root such as `fleet.ui` answers "did anything in
    /// this subtree change" without scanning the key set.
    pub fn contains(&self, key: &str) -> bool {
        match self {
            KeyDiff::All => true,
            KeyDiff::Changed(changed) => {
                let key = key.trim_end_matches(SEPARATOR);
                (key.is_empty() && !changed.is_empty())
                    || changed.keys.contains(key)
                    || changed.prefixes.contains(key)
            }
        }
    }

    /// Changed keys that lie under `prefix`; `None` means "all of them".
    pub fn changed_under(&self, prefix: &str) -> Option<Vec<String>> {
        match self {
            KeyDiff::All => None,
            KeyDiff::Changed(changed) => Some(
                changed
                    .keys
                    .iter()
                    .filter(|key| is_under(key, prefix))
                    .cloned()
                    .collect(),
            ),
        }
    }
}

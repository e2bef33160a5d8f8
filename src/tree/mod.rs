//! Dot-hierarchical string key/value tree.
//!
//! Every configuration fragment, the merged snapshot and the platform
//! bootstrap values are all [`ValueTree`]s. A tree can be sealed once,
//! after which every mutator fails with [`TreeError::Sealed`]; installed
//! snapshots are always sealed.

mod diff;
mod error;
pub mod key_ops;
pub mod typed;

#[cfg(test)]
mod tests;

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    ops::Bound,
    time::Duration,
};

use tracing::warn;

pub use diff::{ChangedKeys, KeyDiff};
pub use error::TreeError;
use key_ops::{is_under, join_key, relative_to};

/// Sorted map of dotted keys to string values with seal-once semantics.
#[derive(Clone, Default)]
pub struct ValueTree {
    values: BTreeMap<String, String>,
    sealed: bool,
}

impl ValueTree {
    /// Creates an empty, unsealed tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an unsealed tree from key/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            sealed: false,
        }
    }

    /// Number of keys in the tree.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the tree holds no keys.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Marks the tree immutable. Sealing twice is harmless.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// True once [`seal`](Self::seal) has been called.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Returns the raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns the raw value for `key`, or `default` when absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// True if `key` has a value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Iterates key/value pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterates keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Iterates the keys lying under `prefix` (inclusive).
    pub fn keys_under<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.values
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .map(|(k, _)| k.as_str())
            .take_while(move |k| k.starts_with(prefix))
            .filter(move |k| is_under(k, prefix))
    }

    /// Names of the immediate children of `prefix`, sorted and unique.
    pub fn child_names(&self, prefix: &str) -> Vec<String> {
        let names: BTreeSet<String> = self
            .keys_under(prefix)
            .filter_map(|key| relative_to(key, prefix))
            .filter_map(|rest| rest.split(key_ops::SEPARATOR).next())
            .map(str::to_string)
            .collect();

        names.into_iter().collect()
    }

    /// Sets `key` to `value`.
    ///
    /// # Errors
    /// Returns `TreeError::Sealed` if the tree is sealed.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), TreeError> {
        let key = key.into();
        self.check_unsealed(&key)?;
        self.values.insert(key, value.into());
        Ok(())
    }

    /// Removes `key`, returning its previous value.
    ///
    /// # Errors
    /// Returns `TreeError::Sealed` if the tree is sealed.
    pub fn remove(&mut self, key: &str) -> Result<Option<String>, TreeError> {
        self.check_unsealed(key)?;
        Ok(self.values.remove(key))
    }

    /// Removes `prefix` and every key under it.
    ///
    /// # Errors
    /// Returns `TreeError::Sealed` if the tree is sealed.
    pub fn remove_config_tree(&mut self, prefix: &str) -> Result<(), TreeError> {
        self.check_unsealed(prefix)?;
        self.values.retain(|key, _| !is_under(key, prefix));
        Ok(())
    }

    /// Copies every key of `other` into this tree, overwriting collisions.
    ///
    /// # Errors
    /// Returns `TreeError::Sealed` if this tree is sealed.
    pub fn copy_from(&mut self, other: &ValueTree) -> Result<(), TreeError> {
        self.copy_config_tree_from(other, "")
    }

    /// Copies every key of `other` into this tree under `root`.
    ///
    /// # Errors
    /// Returns `TreeError::Sealed` if this tree is sealed.
    pub fn copy_config_tree_from(&mut self, other: &ValueTree, root: &str) -> Result<(), TreeError> {
        self.check_unsealed(root)?;
        for (key, value) in &other.values {
            self.values.insert(join_key(root, key), value.clone());
        }
        Ok(())
    }

    /// Returns an unsealed deep copy.
    pub fn copy(&self) -> ValueTree {
        Self {
            values: self.values.clone(),
            sealed: false,
        }
    }

    /// Returns the subtree under `prefix` with the prefix stripped.
    pub fn config_tree(&self, prefix: &str) -> ValueTree {
        Self {
            values: self
                .keys_under(prefix)
                .filter_map(|key| {
                    let rest = relative_to(key, prefix)?;
                    Some((rest.to_string(), self.values.get(key)?.clone()))
                })
                .collect(),
            sealed: false,
        }
    }

    /// Returns an unsealed copy with every key namespaced under `prefix`.
    pub fn add_prefix(&self, prefix: &str) -> ValueTree {
        Self {
            values: self
                .values
                .iter()
                .map(|(k, v)| (join_key(prefix, k), v.clone()))
                .collect(),
            sealed: false,
        }
    }

    /// Computes the keys that differ between this tree and `other`.
    ///
    /// A missing or empty `other` yields [`KeyDiff::All`].
    pub fn differences(&self, other: Option<&ValueTree>) -> KeyDiff {
        match other {
            Some(other) if !other.is_empty() => KeyDiff::between(&self.values, &other.values),
            _ => KeyDiff::All,
        }
    }

    /// Parses `key` as a boolean.
    ///
    /// # Errors
    /// `MissingParam` if absent, `InvalidParam` if unparseable.
    pub fn get_bool(&self, key: &str) -> Result<bool, TreeError> {
        self.parse_strict(key, typed::parse_bool)
    }

    /// Parses `key` as a boolean, falling back to `default`.
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.parse_lenient(key, default, typed::parse_bool)
    }

    /// Parses `key` as an `i32`.
    ///
    /// # Errors
    /// `MissingParam` if absent, `InvalidParam` if unparseable.
    pub fn get_int(&self, key: &str) -> Result<i32, TreeError> {
        self.parse_strict(key, parse_number::<i32>)
    }

    /// Parses `key` as an `i32`, falling back to `default`.
    pub fn get_int_or(&self, key: &str, default: i32) -> i32 {
        self.parse_lenient(key, default, parse_number::<i32>)
    }

    /// Parses `key` as an `i64`.
    ///
    /// # Errors
    /// `MissingParam` if absent, `InvalidParam` if unparseable.
    pub fn get_long(&self, key: &str) -> Result<i64, TreeError> {
        self.parse_strict(key, parse_number::<i64>)
    }

    /// Parses `key` as an `i64`, falling back to `default`.
    pub fn get_long_or(&self, key: &str, default: i64) -> i64 {
        self.parse_lenient(key, default, parse_number::<i64>)
    }

    /// Parses `key` as an `f64`.
    ///
    /// # Errors
    /// `MissingParam` if absent, `InvalidParam` if unparseable.
    pub fn get_double(&self, key: &str) -> Result<f64, TreeError> {
        self.parse_strict(key, parse_number::<f64>)
    }

    /// Parses `key` as an `f64`, falling back to `default`.
    pub fn get_double_or(&self, key: &str, default: f64) -> f64 {
        self.parse_lenient(key, default, parse_number::<f64>)
    }

    /// Parses `key` as a percentage (`50` is `0.5`).
    ///
    /// # Errors
    /// `MissingParam` if absent, `InvalidParam` if unparseable.
    pub fn get_percentage(&self, key: &str) -> Result<f64, TreeError> {
        self.parse_strict(key, typed::parse_percentage)
    }

    /// Parses `key` as a percentage, falling back to `default`.
    pub fn get_percentage_or(&self, key: &str, default: f64) -> f64 {
        self.parse_lenient(key, default, typed::parse_percentage)
    }

    /// Parses `key` as a time interval (`30s`, `10m`, bare millis).
    ///
    /// # Errors
    /// `MissingParam` if absent, `InvalidParam` if unparseable.
    pub fn get_time_interval(&self, key: &str) -> Result<Duration, TreeError> {
        self.parse_strict(key, typed::parse_time_interval)
    }

    /// Parses `key` as a time interval, falling back to `default`.
    pub fn get_time_interval_or(&self, key: &str, default: Duration) -> Duration {
        self.parse_lenient(key, default, typed::parse_time_interval)
    }

    /// Parses `key` as a byte size (`4kb`, `1.5gb`, bare bytes).
    ///
    /// # Errors
    /// `MissingParam` if absent, `InvalidParam` if unparseable.
    pub fn get_byte_size(&self, key: &str) -> Result<u64, TreeError> {
        self.parse_strict(key, typed::parse_byte_size)
    }

    /// Parses `key` as a byte size, falling back to `default`.
    pub fn get_byte_size_or(&self, key: &str, default: u64) -> u64 {
        self.parse_lenient(key, default, typed::parse_byte_size)
    }

    /// Splits `key` as a `;`-separated list. A missing key is an empty list.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key).map(typed::split_list).unwrap_or_default()
    }

    fn parse_strict<T>(
        &self,
        key: &str,
        parse: impl Fn(&str) -> Result<T, String>,
    ) -> Result<T, TreeError> {
        let value = self.get(key).ok_or_else(|| TreeError::MissingParam {
            key: key.to_string(),
        })?;

        parse(value).map_err(|reason| TreeError::invalid(key, value, reason))
    }

    fn parse_lenient<T>(&self, key: &str, default: T, parse: impl Fn(&str) -> Result<T, String>) -> T {
        let Some(value) = self.get(key) else {
            return default;
        };

        match parse(value) {
            Ok(parsed) => parsed,
            Err(reason) => {
                warn!(key, value, %reason, "Invalid parameter value, using default");
                default
            }
        }
    }

    fn check_unsealed(&self, key: &str) -> Result<(), TreeError> {
        if self.sealed {
            return Err(TreeError::Sealed {
                key: key.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(value: &str) -> Result<T, String>
where
    T::Err: fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| e.to_string())
}

impl PartialEq for ValueTree {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Eq for ValueTree {}

impl fmt::Debug for ValueTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueTree")
            .field("sealed", &self.sealed)
            .field("values", &self.values)
            .finish()
    }
}

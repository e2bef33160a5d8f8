use regex::Regex;
use tracing::warn;

use super::SourceError;
use crate::tree::ValueTree;

/// What to do with a key that fails the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPolicy {
    /// Abort the whole load on the first illegal key.
    Strict,
    /// Drop illegal keys and log them.
    Lenient,
}

#[derive(Debug, Clone)]
enum Mode {
    Allow,
    Deny,
}

/// Key predicate applied to every freshly parsed tree.
#[derive(Debug, Clone)]
pub struct KeyFilter {
    mode: Mode,
    patterns: Vec<Regex>,
    policy: FilterPolicy,
}

impl KeyFilter {
    /// Only keys matching at least one pattern are legal.
    ///
    /// # Errors
    /// Returns the regex error for an invalid pattern.
    pub fn allow(patterns: &[&str], policy: FilterPolicy) -> Result<Self, regex::Error> {
        Self::build(Mode::Allow, patterns, policy)
    }

    /// Keys matching any pattern are illegal.
    ///
    /// # Errors
    /// Returns the regex error for an invalid pattern.
    pub fn deny(patterns: &[&str], policy: FilterPolicy) -> Result<Self, regex::Error> {
        Self::build(Mode::Deny, patterns, policy)
    }

    fn build(mode: Mode, patterns: &[&str], policy: FilterPolicy) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            mode,
            patterns,
            policy,
        })
    }

    /// True if `key` passes the filter.
    pub fn accepts(&self, key: &str) -> bool {
        let matched = self.patterns.iter().any(|p| p.is_match(key));
        match self.mode {
            Mode::Allow => matched,
            Mode::Deny => !matched,
        }
    }

    /// Applies the filter to `tree` according to the policy.
    ///
    /// # Errors
    /// Returns `SourceError::PolicyRejected` under the strict policy.
    pub fn apply(&self, url: &str, tree: ValueTree) -> Result<ValueTree, SourceError> {
        let rejected: Vec<String> = tree
            .keys()
            .filter(|key| !self.accepts(key))
            .map(str::to_string)
            .collect();

        if rejected.is_empty() {
            return Ok(tree);
        }

        match self.policy {
            FilterPolicy::Strict => Err(SourceError::PolicyRejected {
                url: url.to_string(),
                key: rejected[0].clone(),
            }),
            FilterPolicy::Lenient => {
                let mut tree = tree;
                for key in &rejected {
                    warn!(url, key = key.as_str(), "Ignoring illegal key");
                    tree.remove(key)
                        .map_err(|e| SourceError::malformed(url, e.to_string()))?;
                }
                Ok(tree)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn tree() -> ValueTree {
        ValueTree::from_pairs([
            ("fleet.platform.group", "beta"),
            ("fleet.ui.port", "8081"),
        ])
    }

    #[test]
    fn strict_deny_aborts() {
        let filter = KeyFilter::deny(&[r"^fleet\.platform\."], FilterPolicy::Strict).unwrap();
        let err = filter.apply("expert", tree()).unwrap_err();

        assert_eq!(
            err,
            SourceError::PolicyRejected {
                url: "expert".to_string(),
                key: "fleet.platform.group".to_string(),
            }
        );
    }

    #[test]
    fn lenient_deny_strips() {
        let filter = KeyFilter::deny(&[r"^fleet\.platform\."], FilterPolicy::Lenient).unwrap();
        let filtered = filter.apply("expert", tree()).unwrap();

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.get("fleet.ui.port"), Some("8081"));
    }

    #[test]
    fn allow_list_keeps_only_matches() {
        let filter = KeyFilter::allow(&[r"^fleet\.ui\."], FilterPolicy::Lenient).unwrap();

        assert!(filter.accepts("fleet.ui.port"));
        assert!(!filter.accepts("fleet.platform.group"));
        assert_eq!(filter.apply("ui", tree()).unwrap().len(), 1);
    }
}

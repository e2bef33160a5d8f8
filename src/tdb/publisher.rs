use std::collections::BTreeMap;

use super::TitleId;

/// A publisher and the titles it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publisher {
    pub(super) name: String,
    pub(super) properties: BTreeMap<String, String>,
    pub(super) titles: Vec<TitleId>,
}

impl Publisher {
    /// Catalog-unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Publisher-level properties.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Titles in insertion order.
    pub fn titles(&self) -> &[TitleId] {
        &self.titles
    }
}

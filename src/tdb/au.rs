use std::{collections::BTreeMap, fmt};

use super::TitleId;

/// Identity of an archival unit: its plugin and definitional params.
///
/// Computed once when the AU is attached to a title and never recomputed,
/// so later edits to names, attributes or properties cannot change it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AuKey {
    /// Plugin id
    pub plugin_id: String,
    /// Definitional parameters
    pub params: BTreeMap<String, String>,
}

impl fmt::Display for AuKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.plugin_id)?;
        for (key, value) in &self.params {
            write!(f, "&{key}~{value}")?;
        }
        Ok(())
    }
}

/// An AU under construction. Everything is mutable until it is added to a
/// catalog with [`Tdb::add_au`](super::Tdb::add_au).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftAu {
    /// Plugin id; required at attach time
    pub plugin_id: Option<String>,
    /// Display name
    pub name: String,
    /// Definitional parameters
    pub params: BTreeMap<String, String>,
    /// Attributes (`attributes.<k>`)
    pub attrs: BTreeMap<String, String>,
    /// Remaining properties
    pub props: BTreeMap<String, String>,
}

impl DraftAu {
    /// Creates a draft with a name and plugin.
    pub fn new(name: impl Into<String>, plugin_id: impl Into<String>) -> Self {
        Self {
            plugin_id: Some(plugin_id.into()),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a definitional parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Adds an attribute.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }
}

/// A frozen AU owned by a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Au {
    pub(super) key: AuKey,
    pub(super) name: String,
    pub(super) attrs: BTreeMap<String, String>,
    pub(super) props: BTreeMap<String, String>,
    pub(super) title: TitleId,
}

impl Au {
    /// Identity captured at attach time.
    pub fn key(&self) -> &AuKey {
        &self.key
    }

    /// Plugin id.
    pub fn plugin_id(&self) -> &str {
        &self.key.plugin_id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Definitional parameters.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.key.params
    }

    /// Attributes.
    pub fn attrs(&self) -> &BTreeMap<String, String> {
        &self.attrs
    }

    /// Other properties.
    pub fn props(&self) -> &BTreeMap<String, String> {
        &self.props
    }

    /// Owning title.
    pub fn title(&self) -> TitleId {
        self.title
    }

    /// True if every non-identity field matches `other`.
    pub(super) fn same_content(&self, other: &Au) -> bool {
        self.key == other.key
            && self.name == other.name
            && self.attrs == other.attrs
            && self.props == other.props
    }
}

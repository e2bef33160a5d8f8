use std::{collections::BTreeMap, fmt, str::FromStr};

use super::{AuIdx, PublisherId};

/// Relationship between two titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LinkType {
    /// This title continues as the linked one
    ContinuedBy,
    /// This title continues the linked one
    Continues,
    /// This title was replaced by the linked one
    SupersededBy,
    /// This title replaces the linked one
    Supersedes,
    /// This title was absorbed into the linked one
    AbsorbedBy,
    /// This title absorbed the linked one
    Absorbed,
}

impl FromStr for LinkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "continuedBy" => Ok(Self::ContinuedBy),
            "continues" | "continuedFrom" => Ok(Self::Continues),
            "supersededBy" => Ok(Self::SupersededBy),
            "supersedes" => Ok(Self::Supersedes),
            "absorbedBy" => Ok(Self::AbsorbedBy),
            "absorbed" => Ok(Self::Absorbed),
            other => Err(format!("unknown link type '{other}'")),
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ContinuedBy => "continuedBy",
            Self::Continues => "continues",
            Self::SupersededBy => "supersededBy",
            Self::Supersedes => "supersedes",
            Self::AbsorbedBy => "absorbedBy",
            Self::Absorbed => "absorbed",
        };
        f.write_str(name)
    }
}

/// A serial or book title. Owned by exactly one publisher for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title {
    pub(super) id: String,
    pub(super) name: String,
    pub(super) publisher: PublisherId,
    pub(super) links: BTreeMap<LinkType, Vec<String>>,
    pub(super) properties: BTreeMap<String, String>,
    pub(super) aus: Vec<AuIdx>,
}

impl Title {
    /// Catalog-unique id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning publisher.
    pub fn publisher(&self) -> PublisherId {
        self.publisher
    }

    /// Links to other titles, by kind.
    pub fn links(&self) -> &BTreeMap<LinkType, Vec<String>> {
        &self.links
    }

    /// Title-level properties such as `issn`.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// AUs in insertion order.
    pub fn aus(&self) -> &[AuIdx] {
        &self.aus
    }
}

/// Fields for a new title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleSpec {
    /// Catalog-unique id
    pub id: String,
    /// Display name
    pub name: String,
    /// Links to other titles
    pub links: BTreeMap<LinkType, Vec<String>>,
    /// Title-level properties
    pub properties: BTreeMap<String, String>,
}

impl TitleSpec {
    /// Title with an id and name and nothing else.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_types_round_trip_names() {
        for name in ["continuedBy", "continues", "supersededBy", "supersedes", "absorbedBy", "absorbed"] {
            let parsed: LinkType = name.parse().unwrap_or(LinkType::Absorbed);
            assert_eq!(parsed.to_string(), name);
        }
        assert!("sideways".parse::<LinkType>().is_err());
    }
}

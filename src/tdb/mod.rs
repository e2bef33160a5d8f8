//! Title database: the publisher, title and archival-unit catalog.
//!
//! The catalog is an arena. Publishers, titles and AUs live in flat vectors
//! and refer to each other through the index newtypes [`PublisherId`],
//! [`TitleId`] and [`AuIdx`], which stay valid for the catalog's lifetime.
//! Nothing is ever removed; a new catalog is built each reload cycle.

mod au;
mod diff;
mod error;
mod loader;
mod merge;
mod publisher;
mod title;


use std::collections::{BTreeMap, HashMap};

pub use au::{Au, AuKey, DraftAu};
pub use diff::TdbDifferences;
pub use error::TdbError;
pub use loader::TITLE_ROOT;
pub use publisher::Publisher;
pub use title::{LinkType, Title, TitleSpec};

/// Index of a publisher within its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublisherId(usize);

/// Index of a title within its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TitleId(usize);

/// Index of an AU within its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AuIdx(usize);

/// Publisher -> title -> AU catalog with seal-once semantics.
#[derive(Debug, Clone, Default)]
pub struct Tdb {
    publishers: Vec<Publisher>,
    titles: Vec<Title>,
    aus: Vec<Au>,
    publisher_index: HashMap<String, PublisherId>,
    title_index: HashMap<String, TitleId>,
    au_index: HashMap<AuKey, AuIdx>,
    plugin_index: BTreeMap<String, Vec<AuIdx>>,
    sealed: bool,
}

impl Tdb {
    /// Creates an empty, unsealed catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the catalog immutable.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// True once sealed.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// True if the catalog has no publishers.
    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }

    /// Number of publishers.
    pub fn publisher_count(&self) -> usize {
        self.publishers.len()
    }

    /// Number of titles.
    pub fn title_count(&self) -> usize {
        self.titles.len()
    }

    /// Number of AUs.
    pub fn au_count(&self) -> usize {
        self.aus.len()
    }

    /// Unsealed deep copy.
    pub fn copy(&self) -> Tdb {
        Tdb {
            sealed: false,
            ..self.clone()
        }
    }

    /// Adds a publisher.
    ///
    /// # Errors
    /// `Sealed` or `DuplicatePublisher`.
    pub fn add_publisher(
        &mut self,
        name: impl Into<String>,
        properties: BTreeMap<String, String>,
    ) -> Result<PublisherId, TdbError> {
        self.check_unsealed()?;
        let name = name.into();
        if self.publisher_index.contains_key(&name) {
            return Err(TdbError::DuplicatePublisher { name });
        }

        let id = PublisherId(self.publishers.len());
        self.publisher_index.insert(name.clone(), id);
        self.publishers.push(Publisher {
            name,
            properties,
            titles: Vec::new(),
        });
        Ok(id)
    }

    /// Returns the publisher named `name`, adding it if absent.
    ///
    /// # Errors
    /// `Sealed` when the publisher would have to be added.
    pub fn publisher_or_insert(&mut self, name: &str) -> Result<PublisherId, TdbError> {
        match self.publisher_index.get(name) {
            Some(id) => Ok(*id),
            None => self.add_publisher(name, BTreeMap::new()),
        }
    }

    /// Adds a title under `publisher`.
    ///
    /// # Errors
    /// `Sealed`, `UnknownPublisher` or `DuplicateTitle`.
    pub fn add_title(&mut self, publisher: PublisherId, spec: TitleSpec) -> Result<TitleId, TdbError> {
        self.check_unsealed()?;
        if publisher.0 >= self.publishers.len() {
            return Err(TdbError::UnknownPublisher(publisher.0));
        }
        if let Some(existing) = self.title_index.get(&spec.id) {
            let owner = self.titles[existing.0].publisher;
            return Err(TdbError::DuplicateTitle {
                id: spec.id,
                publisher: self.publishers[owner.0].name.clone(),
            });
        }

        let id = TitleId(self.titles.len());
        self.title_index.insert(spec.id.clone(), id);
        self.titles.push(Title {
            id: spec.id,
            name: spec.name,
            publisher,
            links: spec.links,
            properties: spec.properties,
            aus: Vec::new(),
        });
        self.publishers[publisher.0].titles.push(id);
        Ok(id)
    }

    /// Freezes `draft` and attaches it to `title`.
    ///
    /// # Errors
    /// `Sealed`, `UnknownTitle`, `MissingPlugin`, or `DuplicateAu` when an AU
    /// with the same identity is already under the title.
    pub fn add_au(&mut self, title: TitleId, draft: DraftAu) -> Result<AuIdx, TdbError> {
        self.check_unsealed()?;
        let owner = self.titles.get(title.0).ok_or(TdbError::UnknownTitle(title.0))?;

        let plugin_id = draft
            .plugin_id
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| TdbError::MissingPlugin {
                name: draft.name.clone(),
            })?;
        let key = AuKey {
            plugin_id,
            params: draft.params,
        };

        if let Some(existing) = owner.aus.iter().find(|idx| self.aus[idx.0].key == key) {
            return Err(TdbError::DuplicateAu {
                title: owner.id.clone(),
                existing: self.aus[existing.0].name.clone(),
                new: draft.name,
            });
        }

        Ok(self.insert_au(Au {
            key,
            name: draft.name,
            attrs: draft.attrs,
            props: draft.props,
            title,
        }))
    }

    /// Pushes a frozen AU without identity checks.
    fn insert_au(&mut self, au: Au) -> AuIdx {
        let idx = AuIdx(self.aus.len());
        self.au_index.entry(au.key.clone()).or_insert(idx);
        self.plugin_index
            .entry(au.key.plugin_id.clone())
            .or_default()
            .push(idx);
        self.titles[au.title.0].aus.push(idx);
        self.aus.push(au);
        idx
    }

    /// Publisher by id.
    pub fn publisher(&self, id: PublisherId) -> Option<&Publisher> {
        self.publishers.get(id.0)
    }

    /// Publisher by name.
    pub fn publisher_by_name(&self, name: &str) -> Option<(PublisherId, &Publisher)> {
        let id = *self.publisher_index.get(name)?;
        Some((id, &self.publishers[id.0]))
    }

    /// Title by arena id.
    pub fn title(&self, id: TitleId) -> Option<&Title> {
        self.titles.get(id.0)
    }

    /// Title by its catalog id string.
    pub fn title_by_id(&self, id: &str) -> Option<(TitleId, &Title)> {
        let idx = *self.title_index.get(id)?;
        Some((idx, &self.titles[idx.0]))
    }

    /// AU by index.
    pub fn au(&self, idx: AuIdx) -> Option<&Au> {
        self.aus.get(idx.0)
    }

    /// First AU with identity `key`.
    pub fn au_by_key(&self, key: &AuKey) -> Option<&Au> {
        self.au_index.get(key).map(|idx| &self.aus[idx.0])
    }

    /// Publishers in insertion order.
    pub fn publishers(&self) -> impl Iterator<Item = (PublisherId, &Publisher)> {
        self.publishers
            .iter()
            .enumerate()
            .map(|(i, p)| (PublisherId(i), p))
    }

    /// Titles in insertion order.
    pub fn titles(&self) -> impl Iterator<Item = (TitleId, &Title)> {
        self.titles.iter().enumerate().map(|(i, t)| (TitleId(i), t))
    }

    /// AUs in insertion order.
    pub fn aus(&self) -> impl Iterator<Item = &Au> {
        self.aus.iter()
    }

    /// AUs of `title`.
    pub fn title_aus(&self, title: &Title) -> impl Iterator<Item = &Au> {
        title.aus.iter().map(|idx| &self.aus[idx.0])
    }

    /// Plugin ids with at least one AU, sorted.
    pub fn plugin_ids(&self) -> impl Iterator<Item = &str> {
        self.plugin_index.keys().map(String::as_str)
    }

    /// AUs belonging to `plugin_id`.
    pub fn aus_for_plugin<'a>(&'a self, plugin_id: &str) -> impl Iterator<Item = &'a Au> + 'a {
        self.plugin_index
            .get(plugin_id)
            .into_iter()
            .flatten()
            .map(|idx| &self.aus[idx.0])
    }

    fn check_unsealed(&self) -> Result<(), TdbError> {
        if self.sealed {
            return Err(TdbError::Sealed);
        }
        Ok(())
    }
}

impl PartialEq for Tdb {
    fn eq(&self, other: &Self) -> bool {
        self.publishers == other.publishers && self.titles == other.titles && self.aus == other.aus
    }
}

impl Eq for Tdb {}

use thiserror::Error;

/// Catalog construction failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TdbError {
    /// The catalog is sealed.
    #[error("catalog is sealed")]
    Sealed,

    /// An AU with the same identity already exists under the title.
    #[error("duplicate AU in title '{title}': '{existing}' and '{new}'")]
    DuplicateAu {
        /// Title id
        title: String,
        /// Name of the AU already present
        existing: String,
        /// Name of the AU being added
        new: String,
    },

    /// The AU draft has no plugin id.
    #[error("AU '{name}' has no plugin")]
    MissingPlugin {
        /// AU name
        name: String,
    },

    /// A publisher with this name already exists.
    #[error("duplicate publisher '{name}'")]
    DuplicatePublisher {
        /// Publisher name
        name: String,
    },

    /// A title with this id already exists.
    #[error("duplicate title '{id}' (owned by '{publisher}')")]
    DuplicateTitle {
        /// Title id
        id: String,
        /// Publisher that owns the existing title
        publisher: String,
    },

    /// The publisher id does not belong to this catalog.
    #[error("unknown publisher #{0}")]
    UnknownPublisher(usize),

    /// The title id does not belong to this catalog.
    #[error("unknown title #{0}")]
    UnknownTitle(usize),
}

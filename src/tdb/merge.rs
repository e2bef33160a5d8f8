use tracing::warn;

use super::{Au, Tdb, TdbError, TitleSpec};

impl Tdb {
    /// Merges `other` into this catalog and returns the number of AUs added.
    ///
    /// Unknown publishers and titles are adopted whole. For a title already
    /// present, each AU is checked by identity and existing entries win.
    /// A title id already owned by a different publisher is skipped.
    ///
    /// # Errors
    /// Only `Sealed`.
    pub fn copy_from(&mut self, other: &Tdb) -> Result<usize, TdbError> {
        self.check_unsealed()?;
        let mut added = 0;

        for (_, their_publisher) in other.publishers() {
            let publisher = match self.publisher_index.get(their_publisher.name()) {
                Some(id) => *id,
                None => self.add_publisher(
                    their_publisher.name(),
                    their_publisher.properties().clone(),
                )?,
            };

            for their_title_id in their_publisher.titles() {
                let Some(their_title) = other.title(*their_title_id) else {
                    continue;
                };

                let existing = self
                    .title_by_id(their_title.id())
                    .map(|(id, title)| (id, title.publisher()));

                let title = match existing {
                    None => {
                        let spec = TitleSpec {
                            id: their_title.id().to_string(),
                            name: their_title.name().to_string(),
                            links: their_title.links().clone(),
                            properties: their_title.properties().clone(),
                        };
                        let title = self.add_title(publisher, spec)?;
                        for au in other.title_aus(their_title) {
                            self.insert_au(Au { title, ..au.clone() });
                            added += 1;
                        }
                        continue;
                    }
                    Some((id, owner)) if owner == publisher => id,
                    Some((_, owner)) => {
                        warn!(
                            title = their_title.id(),
                            publisher = their_publisher.name(),
                            owner = self.publishers[owner.0].name(),
                            "Title belongs to another publisher, skipping"
                        );
                        continue;
                    }
                };

                for au in other.title_aus(their_title) {
                    match self.au_by_key(au.key()) {
                        Some(mine) if mine.name() != au.name() || mine.title() != title => {
                            warn!(
                                au = %au.key(),
                                existing = mine.name(),
                                incoming = au.name(),
                                "Conflicting AU definition, keeping existing"
                            );
                        }
                        Some(_) => {}
                        None => {
                            self.insert_au(Au { title, ..au.clone() });
                            added += 1;
                        }
                    }
                }
            }
        }

        Ok(added)
    }
}

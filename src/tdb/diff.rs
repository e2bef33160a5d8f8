use std::collections::BTreeSet;

use super::{AuKey, Tdb, Title};

/// What changed between two catalogs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TdbDifferences {
    /// Plugins of AUs that disappeared, with their publisher or title
    pub removed_publisher_plugins: BTreeSet<String>,
    /// Publishers present only in the new catalog
    pub new_publishers: BTreeSet<String>,
    /// Titles present only in the new catalog
    pub new_titles: BTreeSet<String>,
    /// AUs that are new or whose content changed
    pub new_aus: BTreeSet<AuKey>,
    /// Every plugin touched by an addition or removal
    pub plugin_ids: BTreeSet<String>,
    /// `new.au_count() - old.au_count()`
    pub au_count_delta: i64,
}

impl TdbDifferences {
    /// Compares `new` against `old`. A missing or empty `old` makes
    /// everything in `new` count as new.
    pub fn compute(new: &Tdb, old: Option<&Tdb>) -> Self {
        let mut diff = Self::default();

        let Some(old) = old.filter(|old| !old.is_empty()) else {
            for (_, publisher) in new.publishers() {
                diff.new_publishers.insert(publisher.name().to_string());
            }
            for (_, title) in new.titles() {
                diff.add_title(new, title);
            }
            diff.au_count_delta = count(new.au_count());
            return diff;
        };

        for (_, publisher) in new.publishers() {
            let existed = old.publisher_by_name(publisher.name()).is_some();
            if !existed {
                diff.new_publishers.insert(publisher.name().to_string());
            }

            for title_id in publisher.titles() {
                let Some(title) = new.title(*title_id) else {
                    continue;
                };

                match old.title_by_id(title.id()) {
                    Some((_, before)) if existed && same_title(title, before) => {
                        for au in new.title_aus(title) {
                            let unchanged = old
                                .title_aus(before)
                                .any(|prior| prior.same_content(au));
                            if !unchanged {
                                diff.plugin_ids.insert(au.plugin_id().to_string());
                                diff.new_aus.insert(au.key().clone());
                            }
                        }
                    }
                    Some(_) => {
                        for au in new.title_aus(title) {
                            diff.plugin_ids.insert(au.plugin_id().to_string());
                            diff.new_aus.insert(au.key().clone());
                        }
                    }
                    None => diff.add_title(new, title),
                }
            }
        }

        for au in old.aus() {
            if new.au_by_key(au.key()).is_none() {
                diff.removed_publisher_plugins.insert(au.plugin_id().to_string());
                diff.plugin_ids.insert(au.plugin_id().to_string());
            }
        }

        diff.au_count_delta = count(new.au_count()) - count(old.au_count());
        diff
    }

    /// True when nothing changed.
    pub fn is_empty(&self) -> bool {
        self.removed_publisher_plugins.is_empty()
            && self.new_publishers.is_empty()
            && self.new_titles.is_empty()
            && self.new_aus.is_empty()
            && self.plugin_ids.is_empty()
            && self.au_count_delta == 0
    }

    fn add_title(&mut self, tdb: &Tdb, title: &Title) {
        self.new_titles.insert(title.id().to_string());
        for au in tdb.title_aus(title) {
            self.plugin_ids.insert(au.plugin_id().to_string());
            self.new_aus.insert(au.key().clone());
        }
    }
}

fn same_title(a: &Title, b: &Title) -> bool {
    a.name() == b.name() && a.links() == b.links()
}

fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

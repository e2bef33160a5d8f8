use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::{DraftAu, LinkType, Tdb, TdbError, TitleSpec};
use crate::tree::ValueTree;

/// Config subtree holding catalog entries, one child per AU.
pub const TITLE_ROOT: &str = "fleet.title";

const DEFAULT_PUBLISHER: &str = "Unknown publisher";

const TITLE_ID_KEYS: [&str; 4] = ["journalId", "issnl", "eissn", "issn"];

impl Tdb {
    /// Builds a catalog from the entries of a `fleet.title` subtree (with
    /// the prefix already stripped).
    ///
    /// Bad entries are logged and skipped.
    pub fn from_config(entries: &ValueTree, source: &str) -> Tdb {
        let mut tdb = Tdb::new();

        for entry in entries.child_names("") {
            let fields = entries.config_tree(&entry);
            if let Err(error) = tdb.add_entry(&fields) {
                warn!(source, entry = %entry, %error, "Skipping catalog entry");
            }
        }

        debug!(
            source,
            publishers = tdb.publisher_count(),
            titles = tdb.title_count(),
            aus = tdb.au_count(),
            "Loaded catalog"
        );
        tdb
    }

    fn add_entry(&mut self, fields: &ValueTree) -> Result<(), TdbError> {
        let publisher_name = fields
            .get("publisher")
            .or_else(|| fields.get("attributes.publisher"))
            .unwrap_or(DEFAULT_PUBLISHER);

        let au_name = fields.get("title").unwrap_or_default().to_string();
        let title_name = fields
            .get("journalTitle")
            .map(str::to_string)
            .unwrap_or_else(|| au_name.clone());

        let title_id = TITLE_ID_KEYS
            .iter()
            .find_map(|key| fields.get(key).filter(|v| !v.trim().is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| format!("genid:{publisher_name}:{title_name}"));

        let draft = DraftAu {
            plugin_id: fields.get("plugin").map(str::to_string),
            name: au_name,
            params: numbered_pairs(fields, "param", "key", "value"),
            attrs: fields.config_tree("attributes").iter().map(owned).collect(),
            props: fields
                .iter()
                .filter(|(key, _)| is_au_property(key))
                .map(owned)
                .collect(),
        };
        if draft.plugin_id.is_none() {
            return Err(TdbError::MissingPlugin { name: draft.name });
        }

        let publisher = self.publisher_or_insert(publisher_name)?;

        let existing = self
            .title_by_id(&title_id)
            .map(|(id, title)| (id, title.publisher()));

        let title = match existing {
            Some((id, owner)) if owner == publisher => id,
            Some((_, owner)) => {
                return Err(TdbError::DuplicateTitle {
                    id: title_id,
                    publisher: self.publishers[owner.0].name.clone(),
                });
            }
            None => self.add_title(publisher, title_spec(fields, title_id, title_name))?,
        };

        self.add_au(title, draft)?;
        Ok(())
    }
}

fn title_spec(fields: &ValueTree, id: String, name: String) -> TitleSpec {
    let mut links: BTreeMap<LinkType, Vec<String>> = BTreeMap::new();
    let link_root = fields.config_tree("journal.link");

    for n in link_root.child_names("") {
        let (Some(kind), Some(target)) = (
            link_root.get(&format!("{n}.type")),
            link_root.get(&format!("{n}.journalId")),
        ) else {
            continue;
        };

        match kind.parse::<LinkType>() {
            Ok(kind) => links.entry(kind).or_default().push(target.to_string()),
            Err(reason) => warn!(title = %id, %reason, "Ignoring title link"),
        }
    }

    let properties = ["issn", "eissn", "issnl"]
        .iter()
        .filter_map(|key| Some((key.to_string(), fields.get(key)?.to_string())))
        .collect();

    TitleSpec {
        id,
        name,
        links,
        properties,
    }
}

/// Collects `<root>.<n>.<key>` / `<root>.<n>.<value>` pairs.
fn numbered_pairs(fields: &ValueTree, root: &str, key: &str, value: &str) -> BTreeMap<String, String> {
    let sub = fields.config_tree(root);
    sub.child_names("")
        .into_iter()
        .filter_map(|n| {
            let k = sub.get(&format!("{n}.{key}"))?;
            let v = sub.get(&format!("{n}.{value}")).unwrap_or_default();
            Some((k.to_string(), v.to_string()))
        })
        .collect()
}

fn is_au_property(key: &str) -> bool {
    let first = key.split('.').next().unwrap_or(key);
    !matches!(
        first,
        "publisher"
            | "journalTitle"
            | "journalId"
            | "issn"
            | "eissn"
            | "issnl"
            | "title"
            | "plugin"
            | "param"
            | "attributes"
            | "journal"
    )
}

fn owned((key, value): (&str, &str)) -> (String, String) {
    (key.to_string(), value.to_string())
}

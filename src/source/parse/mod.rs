//! Byte-to-tree parsing for every supported content kind.

mod conditions;
mod flat;
mod toml;
mod xml;

pub use conditions::{Conditionals, Version};
pub use flat::{parse_flat, render_flat};
pub use self::toml::parse_toml;
pub use xml::parse_xml;

use super::SourceError;
use crate::tree::ValueTree;

/// Suffix marking a source whose absence is never fatal.
pub const OPTIONAL_SUFFIX: &str = ".opt";

/// Format of a source's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// `key=value` lines
    Flat,
    /// Hierarchical XML with conditionals
    Xml,
    /// TOML tables
    Toml,
}

impl ContentKind {
    /// Picks the kind from the URL's extension, ignoring a trailing `.opt`.
    pub fn from_url(url: &str) -> Self {
        let url = url.strip_suffix(OPTIONAL_SUFFIX).unwrap_or(url);
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let lower = path.to_ascii_lowercase();

        if lower.ends_with(".xml") {
            ContentKind::Xml
        } else if lower.ends_with(".toml") {
            ContentKind::Toml
        } else {
            ContentKind::Flat
        }
    }
}

/// Decodes `bytes` as UTF-8 and parses them as `kind`.
///
/// # Errors
/// Returns `SourceError::Malformed` with the parser's message.
pub fn parse(
    bytes: &[u8],
    kind: ContentKind,
    url: &str,
    cond: &Conditionals,
) -> Result<ValueTree, SourceError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| SourceError::malformed(url, format!("invalid UTF-8: {e}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let parsed = match kind {
        ContentKind::Flat => parse_flat(text),
        ContentKind::Xml => parse_xml(text, cond),
        ContentKind::Toml => parse_toml(text),
    };

    parsed.map_err(|message| SourceError::malformed(url, message))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn kind_follows_extension_after_opt() {
        assert_eq!(ContentKind::from_url("http://h/base.xml"), ContentKind::Xml);
        assert_eq!(ContentKind::from_url("/etc/fleet/local.XML.opt"), ContentKind::Xml);
        assert_eq!(ContentKind::from_url("node.toml"), ContentKind::Toml);
        assert_eq!(ContentKind::from_url("http://h/props.txt?x=1"), ContentKind::Flat);
        assert_eq!(ContentKind::from_url("jar:file:///a.zip!/tdb.xml"), ContentKind::Xml);
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let err = parse(&[0xff, 0xfe, b'a'], ContentKind::Flat, "u", &Conditionals::default())
            .unwrap_err();

        assert!(matches!(err, SourceError::Malformed { .. }));
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn parser_message_is_kept_verbatim() {
        let err = parse(b"<nope/>", ContentKind::Xml, "u", &Conditionals::default()).unwrap_err();

        assert_eq!(err.to_string(), "unexpected root element <nope>");
    }
}

//! Line-oriented `key=value` format.
//!
//! Supports `#`/`!` comments, `key: value` separators, trailing-backslash
//! continuation lines and the escapes `\\ \= \: \n \t \r \uXXXX`.

use std::fmt::Write as _;

use crate::tree::{TreeError, ValueTree};

/// Parses flat `key=value` text into an unsealed tree.
///
/// # Errors
/// Returns a message naming the offending line for bad escapes.
pub fn parse_flat(text: &str) -> Result<ValueTree, String> {
    let mut tree = ValueTree::new();

    for (line_no, line) in logical_lines(text) {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        let (raw_key, raw_value) = split_pair(trimmed);
        let key = unescape(raw_key.trim_end()).map_err(|e| format!("line {line_no}: {e}"))?;
        let value = unescape(raw_value.trim_start()).map_err(|e| format!("line {line_no}: {e}"))?;

        tree.put(key, value)
            .map_err(|e: TreeError| format!("line {line_no}: {e}"))?;
    }

    Ok(tree)
}

/// Renders a tree as flat text, preceded by `header` as a comment.
pub fn render_flat(tree: &ValueTree, header: Option<&str>) -> String {
    let mut out = String::new();

    if let Some(header) = header {
        for line in header.lines() {
            let _ = writeln!(out, "# {line}");
        }
    }

    for (key, value) in tree.iter() {
        let _ = writeln!(out, "{}={}", escape(key, true), escape(value, false));
    }

    out
}

fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let piece = match &pending {
            Some(_) => raw.trim_start(),
            None => raw,
        };

        let (start, mut acc) = pending.take().unwrap_or((line_no, String::new()));
        if ends_with_continuation(piece) {
            acc.push_str(&piece[..piece.len() - 1]);
            pending = Some((start, acc));
        } else {
            acc.push_str(piece);
            lines.push((start, acc));
        }
    }

    if let Some(last) = pending {
        lines.push(last);
    }

    lines
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_pair(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (idx, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..idx], &line[idx + 1..]),
            _ => {}
        }
    }
    (line, "")
}

fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("malformed \\uxxxx escape '\\u{hex}'"))?;
                out.push(code);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

fn escape(raw: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    for (idx, c) in raw.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '=' | ':' if is_key => {
                out.push('\\');
                out.push(c);
            }
            ' ' if is_key || idx == 0 => out.push_str("\\u0020"),
            '#' | '!' if is_key && idx == 0 => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn parses_pairs_comments_and_separators() {
        let tree = parse_flat(
            "# comment\n! also comment\n\nfleet.a=1\nfleet.b : two words \n  fleet.c=\nfleet.d\n",
        )
        .unwrap();

        assert_eq!(tree.get("fleet.a"), Some("1"));
        assert_eq!(tree.get("fleet.b"), Some("two words "));
        assert_eq!(tree.get("fleet.c"), Some(""));
        assert_eq!(tree.get("fleet.d"), Some(""));
    }

    #[test]
    fn joins_continuation_lines() {
        let tree = parse_flat("fleet.list=a;\\\n    b;\\\n    c\nfleet.next=x\n").unwrap();

        assert_eq!(tree.get("fleet.list"), Some("a;b;c"));
        assert_eq!(tree.get("fleet.next"), Some("x"));
    }

    #[test]
    fn handles_escapes() {
        let tree = parse_flat("odd\\=key=v\\u00e9\\tx\nurl=http\\://h/\n").unwrap();

        assert_eq!(tree.get("odd=key"), Some("v\u{e9}\tx"));
        assert_eq!(tree.get("url"), Some("http://h/"));
        assert!(parse_flat("k=\\u12").is_err());
    }

    #[test]
    fn render_round_trips() {
        let tree = ValueTree::from_pairs([
            ("fleet.a", "1"),
            ("weird key:=", " leading space\nand newline\\"),
            ("url", "http://host:8080/x"),
        ]);

        let text = render_flat(&tree, Some("written by test"));
        assert!(text.starts_with("# written by test\n"));
        assert_eq!(parse_flat(&text).unwrap(), tree);
    }
}

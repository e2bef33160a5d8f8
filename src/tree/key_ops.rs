/// Separator between the components of a hierarchical key.
pub const SEPARATOR: char = '.';

/// Joins a prefix and a relative key, tolerating an empty prefix.
///
/// # Examples
/// * `join_key("", "a.b")` is `"a.b"`
/// * `join_key("fleet", "a.b")` is `"fleet.a.b"`
pub fn join_key(prefix: &str, key: &str) -> String {
    let prefix = prefix.trim_end_matches(SEPARATOR);
    if prefix.is_empty() {
        key.to_string()
    } else if key.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}{SEPARATOR}{key}")
    }
}

/// Returns true if `key` equals `prefix` or lies strictly below it.
///
/// Matching is done on whole components, so `fleet.titles` is not under
/// `fleet.title`.
pub fn is_under(key: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches(SEPARATOR);
    if prefix.is_empty() {
        return true;
    }

    match key.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with(SEPARATOR),
        None => false,
    }
}

/// Strips `prefix.` from `key`, returning the relative remainder.
pub fn relative_to<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix = prefix.trim_end_matches(SEPARATOR);
    if prefix.is_empty() {
        return Some(key);
    }

    key.strip_prefix(prefix)?.strip_prefix(SEPARATOR)
}

/// Checks if a key matches a subscription pattern
///
/// A pattern component of `*` matches any single key component, and a
/// pattern that is a strict prefix of the key matches everything below it.
///
/// # Examples
/// * `"fleet.ui.port"` matches `"fleet.ui.port"`
/// * `"fleet.ui.port"` matches `"fleet.*"`
/// * `"fleet.ui.port"` matches `"*"`
pub fn key_matches(key: &str, pattern: &str) -> bool {
    const WILDCARD: &str = "*";

    if pattern == WILDCARD || pattern.is_empty() {
        return true;
    }

    let key_parts: Vec<&str> = key.split(SEPARATOR).collect();
    let pattern_parts: Vec<&str> = pattern.split(SEPARATOR).collect();

    if pattern_parts.len() > key_parts.len() {
        return false;
    }

    key_parts
        .iter()
        .zip(pattern_parts.iter())
        .all(|(key_part, pattern_part)| *pattern_part == WILDCARD || key_part == pattern_part)
}

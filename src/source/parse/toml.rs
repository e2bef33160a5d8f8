use ::toml::{Table, Value};

use crate::tree::{ValueTree, key_ops::join_key, typed::join_list};

/// Parses a TOML document, flattening tables into dotted keys.
///
/// Arrays of scalars become `;`-separated lists. Arrays of tables are
/// indexed by position (`servers.0.host`).
///
/// # Errors
/// Returns the TOML parser message.
pub fn parse_toml(text: &str) -> Result<ValueTree, String> {
    let table: Table = text.parse().map_err(|e: ::toml::de::Error| e.to_string())?;

    let mut tree = ValueTree::new();
    flatten(&table, "", &mut tree)?;
    Ok(tree)
}

fn flatten(table: &Table, prefix: &str, tree: &mut ValueTree) -> Result<(), String> {
    for (name, value) in table {
        let key = join_key(prefix, name);
        match value {
            Value::Table(inner) => flatten(inner, &key, tree)?,
            Value::Array(items) if items.iter().all(Value::is_table) => {
                for (idx, item) in items.iter().enumerate() {
                    if let Value::Table(inner) = item {
                        flatten(inner, &join_key(&key, &idx.to_string()), tree)?;
                    }
                }
            }
            Value::Array(items) => {
                let items = items.iter().map(scalar).collect::<Result<Vec<_>, _>>()?;
                tree.put(key, join_list(&items)).map_err(|e| e.to_string())?;
            }
            other => {
                tree.put(key, scalar(other)?).map_err(|e| e.to_string())?;
            }
        }
    }
    Ok(())
}

fn scalar(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Boolean(b) => Ok(b.to_string()),
        Value::Datetime(d) => Ok(d.to_string()),
        Value::Array(_) | Value::Table(_) => Err("nested arrays are not supported".to_string()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn flattens_tables_and_arrays() {
        let text = r#"
            [fleet.ui]
            port = 8081
            enabled = true
            hosts = ["a", "b"]

            [[fleet.servers]]
            host = "s1"

            [[fleet.servers]]
            host = "s2"
        "#;

        let tree = parse_toml(text).unwrap();

        assert_eq!(tree.get("fleet.ui.port"), Some("8081"));
        assert_eq!(tree.get("fleet.ui.enabled"), Some("true"));
        assert_eq!(tree.get("fleet.ui.hosts"), Some("a;b"));
        assert_eq!(tree.get("fleet.servers.1.host"), Some("s2"));
    }

    #[test]
    fn rejects_invalid_documents() {
        assert!(parse_toml("[fleet\nport = ").is_err());
        assert!(parse_toml("x = [[1], [2]]").is_err());
    }
}

//! Unit tests for the value tree.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use super::{KeyDiff, TreeError, ValueTree};

fn sample() -> ValueTree {
    ValueTree::from_pairs([
        ("fleet.ui.port", "8081"),
        ("fleet.ui.enabled", "yes"),
        ("fleet.proxy.port", "9090"),
        ("fleet.title.a.plugin", "p1"),
        ("fleet.titles", "not-a-subtree"),
    ])
}

#[test]
fn sealed_tree_rejects_mutation() {
    let mut tree = sample();
    tree.seal();

    assert!(matches!(tree.put("x", "1"), Err(TreeError::Sealed { .. })));
    assert!(matches!(tree.remove("fleet.ui.port"), Err(TreeError::Sealed { .. })));
    assert!(matches!(
        tree.remove_config_tree("fleet.ui"),
        Err(TreeError::Sealed { .. })
    ));
    assert_eq!(tree.get("fleet.ui.port"), Some("8081"));
}

#[test]
fn copy_is_unsealed_and_independent() {
    let mut tree = sample();
    tree.seal();

    let mut copy = tree.copy();
    assert!(!copy.is_sealed());
    copy.put("fleet.ui.port", "1").unwrap();

    assert_eq!(tree.get("fleet.ui.port"), Some("8081"));
    assert_eq!(copy.get("fleet.ui.port"), Some("1"));
}

#[test]
fn differences_against_nothing_is_all() {
    let tree = sample();

    assert!(tree.differences(None).is_all());
    assert!(tree.differences(Some(&ValueTree::new())).is_all());
    assert!(tree.differences(Some(&tree.copy())).is_empty());
}

#[test]
fn differences_are_symmetric_and_prefix_aware() {
    let old = sample();
    let mut new = sample();
    new.put("fleet.ui.port", "8082").unwrap();
    new.remove("fleet.proxy.port").unwrap();
    new.put("fleet.new.key", "v").unwrap();

    let diff = new.differences(Some(&old));
    let KeyDiff::Changed(changed) = &diff else {
        panic!("expected explicit change set");
    };

    assert_eq!(
        changed.iter().collect::<Vec<_>>(),
        vec!["fleet.new.key", "fleet.proxy.port", "fleet.ui.port"]
    );
    assert!(diff.contains("fleet.ui.port"));
    assert!(diff.contains("fleet.ui"));
    assert!(diff.contains("fleet"));
    assert!(!diff.contains("fleet.ui.enabled"));
    assert!(!diff.contains("fleet.title"));
}

#[test]
fn config_tree_strips_prefix_on_component_boundary() {
    let tree = sample();
    let ui = tree.config_tree("fleet.ui");

    assert_eq!(ui.len(), 2);
    assert_eq!(ui.get("port"), Some("8081"));

    let titles = tree.config_tree("fleet.title");
    assert_eq!(titles.get("a.plugin"), Some("p1"));
    assert_eq!(titles.len(), 1);
}

#[test]
fn child_names_lists_immediate_children() {
    let tree = sample();

    assert_eq!(tree.child_names("fleet"), vec!["proxy", "title", "titles", "ui"]);
    assert_eq!(tree.child_names("fleet.ui"), vec!["enabled", "port"]);
}

#[test]
fn remove_config_tree_keeps_siblings() {
    let mut tree = sample();
    tree.remove_config_tree("fleet.title").unwrap();

    assert!(!tree.contains_key("fleet.title.a.plugin"));
    assert!(tree.contains_key("fleet.titles"));
}

#[test]
fn prefix_round_trip() {
    let tree = ValueTree::from_pairs([("a", "1"), ("b.c", "2")]);
    let prefixed = tree.add_prefix("fleet.group");

    assert_eq!(prefixed.get("fleet.group.b.c"), Some("2"));
    assert_eq!(prefixed.config_tree("fleet.group"), tree);

    let mut target = ValueTree::new();
    target.copy_config_tree_from(&tree, "x").unwrap();
    assert_eq!(target.get("x.a"), Some("1"));
}

#[test]
fn strict_getters_report_key_and_value() {
    let tree = ValueTree::from_pairs([("n", "12"), ("bad", "twelve"), ("t", "30s")]);

    assert_eq!(tree.get_int("n").unwrap(), 12);
    assert_eq!(tree.get_long("n").unwrap(), 12);
    assert_eq!(tree.get_time_interval("t").unwrap(), Duration::from_secs(30));

    match tree.get_int("bad") {
        Err(TreeError::InvalidParam { key, value, .. }) => {
            assert_eq!(key, "bad");
            assert_eq!(value, "twelve");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(matches!(tree.get_bool("missing"), Err(TreeError::MissingParam { .. })));
}

#[test]
fn lenient_getters_fall_back_to_default() {
    let tree = ValueTree::from_pairs([("bad", "nope"), ("pct", "150"), ("size", "2kb")]);

    assert_eq!(tree.get_int_or("bad", 7), 7);
    assert_eq!(tree.get_int_or("missing", 3), 3);
    assert!(tree.get_bool_or("bad", true));
    assert_eq!(tree.get_percentage_or("pct", 0.0), 1.5);
    assert_eq!(tree.get_byte_size_or("size", 0), 2048);
    assert_eq!(tree.get_double_or("bad", 0.25), 0.25);
}

#[test]
fn equality_ignores_seal_state() {
    let tree = sample();
    let mut sealed = tree.copy();
    sealed.seal();

    assert_eq!(tree, sealed);
}

//! Unit tests for the CLI module
//!
//! Commands run against a coordinator backed by files in a temporary
//! directory.

#![allow(clippy::unwrap_used)]

use std::fs;

use tempfile::TempDir;

use crate::{
    cli::{CliError, CliService, CommandRegistry, formatting::format_value},
    coordinator::Coordinator,
    settings::{NodeSettings, SourceEntry},
};

const BASE: &str = "fleet.ui.port=8081\n\
                    fleet.ui.hosts=a;b;c\n\
                    fleet.crawler.threads=4\n\
                    fleet.title.au1.publisher=Acme Press\n\
                    fleet.title.au1.journalTitle=Journal of Things\n\
                    fleet.title.au1.title=Journal of Things 2020\n\
                    fleet.title.au1.plugin=org.example.ThingsPlugin\n\
                    fleet.title.au1.param.1.key=year\n\
                    fleet.title.au1.param.1.value=2020\n";

fn coordinator_with(base: &str) -> (TempDir, Coordinator) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("base.txt");
    fs::write(&path, base).unwrap();

    let coordinator = Coordinator::new(NodeSettings {
        sources: vec![SourceEntry::required(path.to_string_lossy())],
        ..NodeSettings::default()
    });
    (dir, coordinator)
}

fn missing_source() -> (TempDir, Coordinator) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.txt");
    let coordinator = Coordinator::new(NodeSettings {
        sources: vec![SourceEntry::required(path.to_string_lossy())],
        ..NodeSettings::default()
    });
    (dir, coordinator)
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

#[test]
fn format_value_marks_lists_and_unset() {
    assert_eq!(format_value(Some("8081")), "\"8081\"");
    assert_eq!(format_value(Some("")), "\"\"");
    assert_eq!(format_value(Some("a;b;c")), "\"a;b;c\" [3]");
    assert_eq!(format_value(None), "<unset>");
}

#[test]
fn registry_lists_categories_sorted() {
    let (_dir, coordinator) = coordinator_with(BASE);
    let mut registry = CommandRegistry::new(coordinator);
    registry.register_all_commands();

    let listed = registry.list_commands();
    assert_eq!(
        listed,
        vec![
            ("config".to_string(), args(&["dump", "get", "watch"])),
            ("status".to_string(), args(&["show"])),
            ("tdb".to_string(), args(&["publisher", "summary"])),
        ]
    );
}

#[test]
fn unknown_category_and_command_are_not_found() {
    let (_dir, coordinator) = coordinator_with(BASE);
    let service = CliService::new(coordinator);

    assert!(matches!(
        service.execute_command("nope", "get", &[]),
        Err(CliError::CommandNotFound(_))
    ));
    assert!(matches!(
        service.execute_command("config", "nope", &[]),
        Err(CliError::CommandNotFound(_))
    ));
}

#[test]
fn argument_counts_are_validated() {
    let (_dir, coordinator) = coordinator_with(BASE);
    let service = CliService::new(coordinator);

    assert!(matches!(
        service.execute_command("config", "get", &[]),
        Err(CliError::InvalidArguments(_))
    ));
    assert!(matches!(
        service.execute_command("config", "get", &args(&["a", "b"])),
        Err(CliError::InvalidArguments(_))
    ));
}

#[test]
fn help_lists_every_command() {
    let (_dir, coordinator) = coordinator_with(BASE);
    let service = CliService::new(coordinator);

    let help = service.execute_command("", "", &[]).unwrap();
    for name in ["get", "dump", "watch", "show", "summary", "publisher"] {
        assert!(help.contains(name), "help is missing {name}");
    }
    assert_eq!(service.execute_command("help", "", &[]).unwrap(), help);
}

#[test]
fn get_loads_on_demand_and_prints_value() {
    let (_dir, coordinator) = coordinator_with(BASE);
    let service = CliService::new(coordinator.clone());

    assert!(!coordinator.is_loaded());
    let out = service
        .execute_command("config", "get", &args(&["fleet.ui.port"]))
        .unwrap();
    assert_eq!(out, "fleet.ui.port: \"8081\"");
    assert!(coordinator.is_loaded());

    let err = service
        .execute_command("config", "get", &args(&["fleet.ui.missing"]))
        .unwrap_err();
    assert!(matches!(err, CliError::ConfigError(_)));
}

#[test]
fn get_reports_load_failure() {
    let (_dir, coordinator) = missing_source();
    let service = CliService::new(coordinator);

    let err = service
        .execute_command("config", "get", &args(&["fleet.ui.port"]))
        .unwrap_err();
    assert!(matches!(err, CliError::ConfigError(_)));
}

#[test]
fn dump_filters_by_prefix() {
    let (_dir, coordinator) = coordinator_with(BASE);
    let service = CliService::new(coordinator);

    let out = service
        .execute_command("config", "dump", &args(&["fleet.ui"]))
        .unwrap();
    assert!(out.contains("fleet.ui.port"));
    assert!(out.contains("fleet.ui.hosts"));
    assert!(!out.contains("fleet.crawler.threads"));

    let all = service.execute_command("config", "dump", &[]).unwrap();
    assert!(all.contains("fleet.crawler.threads"));
}

#[test]
fn tdb_commands_describe_catalog() {
    let (_dir, coordinator) = coordinator_with(BASE);
    let service = CliService::new(coordinator);

    let summary = service.execute_command("tdb", "summary", &[]).unwrap();
    assert!(summary.contains("Publishers: 1"));
    assert!(summary.contains("AUs: 1"));
    assert!(summary.contains("org.example.ThingsPlugin: 1"));

    let publisher = service
        .execute_command("tdb", "publisher", &args(&["Acme Press"]))
        .unwrap();
    assert!(publisher.contains("Journal of Things"));

    assert!(matches!(
        service.execute_command("tdb", "publisher", &args(&["Nobody"])),
        Err(CliError::ConfigError(_))
    ));
}

#[test]
fn status_shows_failure_and_json() {
    let (_dir, coordinator) = missing_source();
    let service = CliService::new(coordinator);

    let text = service.execute_command("status", "show", &[]).unwrap();
    assert!(text.contains("not found"));

    let json = service
        .execute_command("status", "show", &args(&["json"]))
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["loaded"], serde_json::Value::Bool(false));

    assert!(matches!(
        service.execute_command("status", "show", &args(&["yaml"])),
        Err(CliError::InvalidArguments(_))
    ));
}

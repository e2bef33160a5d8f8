//! Reload-cycle tests against real files in temporary directories.

#![allow(clippy::unwrap_used)]

use std::{
    fs,
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, SystemTime},
};

use tempfile::TempDir;

use super::*;
use crate::{core::FleetError, settings::SourceEntry, source::SourceError};

fn write(path: &Path, text: &str) {
    fs::write(path, text).unwrap();
}

/// Rewrites a file and pushes its mtime forward so the change token moves.
fn rewrite(path: &Path, text: &str, bump_secs: u64) {
    fs::write(path, text).unwrap();
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(bump_secs))
        .unwrap();
}

fn url(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join(name)
    }

    fn file(&self, name: &str, text: &str) -> String {
        let path = self.path(name);
        write(&path, text);
        url(&path)
    }
}

#[test]
fn later_sources_win_and_platform_keys_derive() {
    let fx = Fixture::new();
    let platform = fx.file(
        "platform.txt",
        "fleet.platform.localIPAddress=10.0.0.5\nfleet.platform.port=9729\nfleet.platform.group=beta\n",
    );
    let base = fx.file("base.txt", "fleet.ui.port=8081\nfleet.a=base\n");
    let overrides = fx.file("override.txt", "fleet.a=override\n");

    let coordinator = Coordinator::new(NodeSettings {
        sources: vec![
            SourceEntry::platform(platform),
            SourceEntry::required(base),
            SourceEntry::required(overrides),
        ],
        ..NodeSettings::default()
    });

    assert!(coordinator.update_config().unwrap());

    let snapshot = coordinator.current();
    assert_eq!(snapshot.get("fleet.a"), Some("override"));
    assert_eq!(snapshot.get("fleet.ui.port"), Some("8081"));
    assert_eq!(snapshot.get("fleet.localIdentity"), Some("TCP:[10.0.0.5]:9729"));
    assert_eq!(snapshot.get("fleet.daemon.groups"), Some("beta"));
    assert!(snapshot.tree().is_sealed());
    assert!(!snapshot.has_local_overrides());
}

#[test]
fn unchanged_sources_do_not_reinstall() {
    let fx = Fixture::new();
    let base_path = fx.path("base.txt");
    write(&base_path, "fleet.a=1\n");

    let coordinator = Coordinator::new(NodeSettings {
        sources: vec![SourceEntry::required(url(&base_path))],
        ..NodeSettings::default()
    });

    assert!(coordinator.update_config().unwrap());
    let first = coordinator.current();
    assert!(!coordinator.update_config().unwrap());
    assert!(Arc::ptr_eq(&first, &coordinator.current()));

    rewrite(&base_path, "fleet.a=2\n", 5);
    assert!(coordinator.update_config().unwrap());
    assert_eq!(coordinator.current().get("fleet.a"), Some("2"));
}

#[test]
fn required_failure_keeps_previous_snapshot() {
    let fx = Fixture::new();
    let base_path = fx.path("base.txt");
    write(&base_path, "fleet.a=1\n");

    let coordinator = Coordinator::new(NodeSettings {
        sources: vec![SourceEntry::required(url(&base_path))],
        ..NodeSettings::default()
    });
    assert!(coordinator.update_config().unwrap());
    let installed = coordinator.current();

    fs::remove_file(&base_path).unwrap();

    let err = coordinator.update_config().unwrap_err();
    assert!(matches!(err, FleetError::Source(ref e) if e.is_not_found()));
    assert!(Arc::ptr_eq(&installed, &coordinator.current()));

    let status = coordinator.status();
    assert!(status.loaded);
    assert!(status.last_error.unwrap().contains("not found"));
}

#[test]
fn nothing_installed_when_required_source_missing() {
    let fx = Fixture::new();
    let coordinator = Coordinator::new(NodeSettings {
        sources: vec![SourceEntry::required(url(&fx.path("absent.txt")))],
        ..NodeSettings::default()
    });

    assert!(coordinator.update_config().is_err());
    assert!(!coordinator.is_loaded());
    assert!(coordinator.current().tree().is_empty());
    assert!(coordinator.registry().urls().is_empty());
}

#[test]
fn optional_and_opt_suffixed_sources_may_be_missing() {
    let fx = Fixture::new();
    let base = fx.file("base.txt", "fleet.a=1\n");

    let coordinator = Coordinator::new(NodeSettings {
        sources: vec![
            SourceEntry::required(base),
            SourceEntry::optional(url(&fx.path("absent.txt"))),
            SourceEntry::required(url(&fx.path("absent.txt.opt"))),
        ],
        ..NodeSettings::default()
    });

    assert!(coordinator.update_config().unwrap());
    assert_eq!(coordinator.current().get("fleet.a"), Some("1"));
}

#[test]
fn opt_suffix_does_not_excuse_malformed_content() {
    let fx = Fixture::new();
    let bad = fx.file("bad.xml.opt", "<fleet-config><property name=\"a\"");

    let coordinator = Coordinator::new(NodeSettings {
        sources: vec![SourceEntry::required(bad)],
        ..NodeSettings::default()
    });

    let err = coordinator.update_config().unwrap_err();
    assert!(matches!(err, FleetError::Source(SourceError::Malformed { .. })));
}

#[test]
fn xml_conditionals_follow_platform_groups() {
    let fx = Fixture::new();
    let platform = fx.file("platform.txt", "fleet.platform.group=beta\n");
    let xml = fx.file(
        "fleet.xml",
        r#"<fleet-config>
             <property name="fleet.mode" value="default"/>
             <if group="beta"><property name="fleet.mode" value="beta"/></if>
           </fleet-config>"#,
    );

    let coordinator = Coordinator::new(NodeSettings {
        sources: vec![SourceEntry::platform(platform), SourceEntry::required(xml)],
        ..NodeSettings::default()
    });

    coordinator.update_config().unwrap();
    assert_eq!(coordinator.current().get("fleet.mode"), Some("beta"));
}

#[test]
fn edited_platform_file_is_picked_up_next_cycle() {
    let fx = Fixture::new();
    let platform_path = fx.path("platform.txt");
    write(&platform_path, "fleet.platform.smtphost=old.example\n");
    let base = fx.file("base.txt", "fleet.a=1\n");

    let coordinator = Coordinator::new(NodeSettings {
        sources: vec![
            SourceEntry::platform(url(&platform_path)),
            SourceEntry::required(base),
        ],
        ..NodeSettings::default()
    });

    assert!(coordinator.update_config().unwrap());
    assert_eq!(coordinator.current().get("fleet.mail.smtphost"), Some("old.example"));
    assert!(!coordinator.update_config().unwrap());

    rewrite(&platform_path, "fleet.platform.smtphost=new.example\n", 5);
    assert!(coordinator.update_config().unwrap());
    assert_eq!(coordinator.current().get("fleet.mail.smtphost"), Some("new.example"));
    assert_eq!(
        coordinator.current().get("fleet.platform.smtphost"),
        Some("new.example")
    );
}

#[test]
fn platform_group_change_reevaluates_unchanged_xml() {
    let fx = Fixture::new();
    let platform_path = fx.path("platform.txt");
    write(&platform_path, "fleet.platform.group=alpha\n");
    let xml = fx.file(
        "fleet.xml",
        r#"<fleet-config>
             <property name="fleet.mode" value="default"/>
             <if group="beta"><property name="fleet.mode" value="beta"/></if>
           </fleet-config>"#,
    );

    let coordinator = Coordinator::new(NodeSettings {
        sources: vec![
            SourceEntry::platform(url(&platform_path)),
            SourceEntry::required(xml),
        ],
        ..NodeSettings::default()
    });

    coordinator.update_config().unwrap();
    assert_eq!(coordinator.current().get("fleet.mode"), Some("default"));

    rewrite(&platform_path, "fleet.platform.group=beta\n", 5);
    assert!(coordinator.update_config().unwrap());
    assert_eq!(coordinator.current().get("fleet.mode"), Some("beta"));
    assert_eq!(coordinator.current().get("fleet.daemon.groups"), Some("beta"));
}

#[test]
fn callbacks_see_differences_and_late_registration_gets_everything() {
    let fx = Fixture::new();
    let base_path = fx.path("base.txt");
    write(&base_path, "fleet.a=1\nfleet.b=1\n");

    let coordinator = Coordinator::new(NodeSettings {
        sources: vec![SourceEntry::required(url(&base_path))],
        ..NodeSettings::default()
    });

    let seen: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    coordinator.register_callback(move |_, _, diff| {
        recorder.lock().unwrap().push(diff.contains("fleet.b"));
    });

    coordinator.update_config().unwrap();
    rewrite(&base_path, "fleet.a=2\nfleet.b=1\n", 5);
    coordinator.update_config().unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![true, false]);

    let late = Arc::new(AtomicUsize::new(0));
    let counter = late.clone();
    let id = coordinator.register_callback(move |new, old, diff| {
        assert!(old.tree().is_empty());
        assert!(diff.keys.is_all());
        assert_eq!(new.get("fleet.a"), Some("2"));
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(late.load(Ordering::SeqCst), 1);
    assert!(coordinator.unregister_callback(id));
}

#[tokio::test]
async fn subscription_receives_changed_keys() {
    let fx = Fixture::new();
    let base_path = fx.path("base.txt");
    write(&base_path, "fleet.ui.port=8081\nfleet.mail.smtphost=a\n");

    let coordinator = Coordinator::new(NodeSettings {
        sources: vec![SourceEntry::required(url(&base_path))],
        ..NodeSettings::default()
    });
    coordinator.update_config().unwrap();

    let mut ui = coordinator.subscribe("fleet.ui");
    rewrite(&base_path, "fleet.ui.port=9090\nfleet.mail.smtphost=a\n", 5);
    coordinator.update_config().unwrap();

    let change = ui.recv().await.unwrap();
    assert_eq!(change.keys, Some(vec!["fleet.ui.port".to_string()]));
    assert_eq!(change.snapshot.get("fleet.ui.port"), Some("9090"));
}

#[tokio::test]
async fn wait_for_config_releases_after_install() {
    let fx = Fixture::new();
    let base = fx.file("base.txt", "fleet.a=1\n");
    let coordinator = Coordinator::new(NodeSettings {
        sources: vec![SourceEntry::required(base)],
        ..NodeSettings::default()
    });

    assert!(!coordinator.wait_for_config(Duration::from_millis(10)).await);

    let worker = coordinator.clone();
    tokio::task::spawn_blocking(move || worker.update_config())
        .await
        .unwrap()
        .unwrap();
    assert!(coordinator.wait_for_config(Duration::from_secs(1)).await);
}

#[tokio::test]
async fn first_install_is_published_before_the_gate_opens() {
    let fx = Fixture::new();
    let base = fx.file("base.txt", "fleet.a=1\n");
    let coordinator = Coordinator::new(NodeSettings {
        sources: vec![SourceEntry::required(base)],
        ..NodeSettings::default()
    });

    let mut early = coordinator.subscribe("fleet");
    let worker = coordinator.clone();
    tokio::task::spawn_blocking(move || worker.update_config())
        .await
        .unwrap()
        .unwrap();

    assert!(coordinator.wait_for_config(Duration::from_secs(1)).await);
    let first = early.try_recv().unwrap();
    assert_eq!(first.snapshot.get("fleet.a"), Some("1"));

    let mut late = coordinator.subscribe("fleet");
    assert!(late.try_recv().is_none());
}

#[test]
fn reload_interval_comes_from_installed_config() {
    let fx = Fixture::new();
    let base = fx.file("base.txt", "fleet.config.reloadInterval=30s\n");
    let coordinator = Coordinator::new(NodeSettings {
        sources: vec![SourceEntry::required(base)],
        ..NodeSettings::default()
    });

    assert_eq!(coordinator.reload_interval(), params::DEFAULT_RELOAD_INTERVAL);
    coordinator.update_config().unwrap();
    assert_eq!(coordinator.reload_interval(), Duration::from_secs(30));
}

#[test]
fn catalog_is_extracted_and_kept_when_no_source_carries_one() {
    let fx = Fixture::new();
    let base_path = fx.path("base.txt");
    write(
        &base_path,
        "fleet.a=1\n\
         fleet.title.au1.publisher=Acme\n\
         fleet.title.au1.journalTitle=Journal\n\
         fleet.title.au1.title=Journal 2020\n\
         fleet.title.au1.plugin=org.example.Plugin\n\
         fleet.title.au1.param.1.key=year\n\
         fleet.title.au1.param.1.value=2020\n",
    );

    let coordinator = Coordinator::new(NodeSettings {
        sources: vec![SourceEntry::required(url(&base_path))],
        ..NodeSettings::default()
    });
    coordinator.update_config().unwrap();

    let tdb = coordinator.tdb();
    assert_eq!(tdb.au_count(), 1);
    assert!(tdb.publisher_by_name("Acme").is_some());
    assert!(coordinator.current().get("fleet.title.au1.plugin").is_none());

    rewrite(&base_path, "fleet.a=2\n", 5);
    coordinator.update_config().unwrap();
    assert_eq!(coordinator.current().get("fleet.a"), Some("2"));
    assert!(Arc::ptr_eq(&tdb, &coordinator.tdb()));
}

#[test]
fn cache_config_round_trip_and_local_overrides() {
    let fx = Fixture::new();
    let cache = fx.path("cache");
    let base = fx.file("base.txt", "fleet.ui.port=8081\n");

    let coordinator = Coordinator::new(NodeSettings {
        sources: vec![SourceEntry::required(base)],
        local_config_dir: Some(cache.clone()),
        ..NodeSettings::default()
    });
    coordinator.update_config().unwrap();
    assert!(!coordinator.current().has_local_overrides());

    let tree = ValueTree::from_pairs([
        ("fleet.ui.port", "9090"),
        ("fleet.platform.fqdn", "evil.example"),
    ]);
    coordinator
        .write_cache_config_file(EXPERT_CONFIG_FILE, &tree, Some("Expert settings"), true)
        .unwrap();

    let text = fs::read_to_string(cache.join(EXPERT_CONFIG_FILE)).unwrap();
    assert!(text.contains("fleet.config.fileVersion.expert_config=1"));

    let read = coordinator.read_cache_config_file(EXPERT_CONFIG_FILE).unwrap();
    assert_eq!(read.get("fleet.ui.port"), Some("9090"));
    assert!(read.get("fleet.config.fileVersion.expert_config").is_none());
    assert!(coordinator.read_cache_config_file("au.txt").unwrap().is_empty());

    coordinator.update_config().unwrap();
    let snapshot = coordinator.current();
    assert!(snapshot.has_local_overrides());
    assert_eq!(snapshot.get("fleet.ui.port"), Some("9090"));
    assert!(snapshot.get("fleet.platform.fqdn").is_none());
}

#[test]
fn cache_config_dir_comes_from_disk_space_paths() {
    let fx = Fixture::new();
    let disk = fx.path("disk0");
    let platform = fx.file(
        "platform.txt",
        &format!("fleet.platform.diskSpacePaths={}\n", disk.display()),
    );

    let coordinator = Coordinator::new(NodeSettings {
        sources: vec![SourceEntry::platform(platform)],
        ..NodeSettings::default()
    });
    assert!(coordinator.cache_config_dir().is_none());
    assert!(matches!(
        coordinator.read_cache_config_file("au.txt"),
        Err(FleetError::NotLoaded)
    ));

    coordinator.update_config().unwrap();
    assert_eq!(coordinator.cache_config_dir(), Some(disk.join("config").as_path()));
}

#[tokio::test]
async fn scheduler_stops_on_cancel() {
    let fx = Fixture::new();
    let base = fx.file("base.txt", "fleet.a=1\n");
    let coordinator = Coordinator::new(NodeSettings {
        sources: vec![SourceEntry::required(base)],
        ..NodeSettings::default()
    });

    let runner = coordinator.clone();
    let handle = tokio::spawn(async move { runner.start().await });

    assert!(coordinator.wait_for_config(Duration::from_secs(5)).await);
    coordinator.stop();
    handle.await.unwrap().unwrap();
}

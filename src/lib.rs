//! fleetconf - layered configuration loading for fleet nodes.
//!
//! A node draws its configuration from an ordered list of sources: platform
//! files describing the host, administrator-maintained files and URLs, and
//! small local cache-config files the node writes itself. fleetconf loads
//! them, merges them into one immutable snapshot (later sources win), pulls
//! the title database out of the merged keys and keeps all of it current
//! with a jittered reload loop.
//!
//! - Flat `key=value`, XML property trees with conditionals, and TOML
//! - Local files, HTTP(S) with conditional requests, `jar:` archive entries
//! - Change callbacks and prefix subscriptions with per-key differences
//! - Atomic cache-config writes
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fleetconf::{Coordinator, settings::NodeSettings};
//!
//! let coordinator = Coordinator::new(NodeSettings::load_default()?);
//! coordinator.update_config()?;
//!
//! let snapshot = coordinator.current();
//! println!("UI port: {:?}", snapshot.get("fleet.ui.port"));
//! # Ok::<(), fleetconf::FleetError>(())
//! ```

/// Core error types and result aliases.
pub mod core;

/// Hierarchical dotted-key value trees.
pub mod tree;

/// Configuration sources: locating, fetching and parsing.
pub mod source;

/// Source registry keyed by URL.
pub mod registry;

/// Title database extracted from the merged configuration.
pub mod tdb;

/// Reload cycles, snapshots and change notification.
pub mod coordinator;

/// The node's own bootstrap settings.
pub mod settings;

/// Logging setup for the node and the CLI.
pub mod tracing_config;

/// Command-line interface for inspecting configuration.
pub mod cli;

/// Re-exported core types for convenience.
pub use core::{FleetError, Result};
pub use coordinator::Coordinator;

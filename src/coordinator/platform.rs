//! Platform bootstrap facts and the derivation pass run after every merge.

use tracing::debug;

use super::params::{DEFAULT_GROUP, PARAM_DAEMON_GROUPS, derived, platform};
use crate::{
    source::parse::Conditionals,
    tree::{TreeError, ValueTree, typed::join_list},
};

/// Platform groups, lower-cased, defaulting to `nogroup`.
pub fn groups(platform_tree: &ValueTree) -> Vec<String> {
    let groups: Vec<String> = platform_tree
        .get_list(platform::GROUP)
        .into_iter()
        .map(|g| g.to_ascii_lowercase())
        .collect();

    if groups.is_empty() {
        vec![DEFAULT_GROUP.to_string()]
    } else {
        groups
    }
}

/// Conditionals for XML directives, derived from the platform tree.
pub fn conditionals(platform_tree: &ValueTree, daemon_version: Option<&str>) -> Conditionals {
    Conditionals::with_groups(&groups(platform_tree))
        .hostname(platform_tree.get(platform::FQDN))
        .platform(platform_tree.get(platform::NAME), platform_tree.get(platform::VERSION))
        .daemon_version(daemon_version)
}

/// Runs the derivation pass over a freshly merged tree.
///
/// Fills in keys computed from the platform section. Explicit values in the
/// merged tree always win over derived defaults.
///
/// # Errors
/// Only `TreeError::Sealed`.
pub fn derive(tree: &mut ValueTree, groups: &[String]) -> Result<(), TreeError> {
    tree.put(PARAM_DAEMON_GROUPS, join_list(groups))?;

    apply_version_override(tree)?;

    if let (Some(dir), Some(file)) = (tree.get(platform::LOG_DIRECTORY), tree.get(platform::LOG_FILE)) {
        let path = format!("{}/{}", dir.trim_end_matches('/'), file);
        tree.put(derived::LOG_FILE, path)?;
    }

    let ip = tree.get(platform::LOCAL_IP).map(str::to_string);
    if let Some(ip) = &ip {
        tree.put(derived::LOCAL_IP, ip.as_str())?;
    }

    let identity = match (tree.get(platform::IDENTITY), &ip, tree.get(platform::PORT)) {
        (Some(identity), _, _) => Some(identity.to_string()),
        (None, Some(ip), Some(port)) => Some(format!("TCP:[{ip}]:{port}")),
        _ => None,
    };
    if let Some(identity) = identity {
        tree.put(derived::LOCAL_IDENTITY, identity)?;
    }

    copy_if_present(tree, platform::SMTP_HOST, derived::SMTP_HOST)?;
    copy_if_present(tree, platform::SMTP_PORT, derived::SMTP_PORT)?;

    merge_access_subnets(tree)?;

    if let Some(first) = tree.get_list(platform::DISK_SPACE_PATHS).into_iter().next() {
        let base = first.trim_end_matches('/').to_string();
        default_to(tree, derived::CACHE_LOCATION, &base)?;
        default_to(tree, derived::HISTORY_LOCATION, &base)?;
        default_to(tree, derived::TMP_DIR, &format!("{base}/tmp"))?;
    }

    if let Some(port) = tree.get(platform::UI_PORT).map(str::to_string) {
        default_to(tree, derived::UI_PORT, &port)?;
    }

    Ok(())
}

/// Sanitizes a platform version for use as a key component.
pub fn sanitize_version(version: &str) -> String {
    version
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn apply_version_override(tree: &mut ValueTree) -> Result<(), TreeError> {
    let Some(version) = tree.get(platform::VERSION) else {
        return Ok(());
    };

    let root = format!("{}.{}", platform::VERSION_OVERRIDE, sanitize_version(version));
    let overrides = tree.config_tree(&root);
    if !overrides.is_empty() {
        debug!(root = %root, keys = overrides.len(), "Applying platform version overrides");
        tree.copy_from(&overrides)?;
    }
    Ok(())
}

/// Replaces the platform's previous contribution to the access lists with
/// its current subnets.
fn merge_access_subnets(tree: &mut ValueTree) -> Result<(), TreeError> {
    let subnets = tree.get_list(platform::ACCESS_SUBNET);
    let previous = tree.get_list(derived::PLATFORM_ACCESS);

    if subnets.is_empty() && previous.is_empty() {
        return Ok(());
    }

    for key in [derived::UI_ACCESS_INCLUDE, derived::PROXY_ACCESS_INCLUDE] {
        let mut include: Vec<String> = tree
            .get_list(key)
            .into_iter()
            .filter(|s| !previous.contains(s) || subnets.contains(s))
            .collect();

        for subnet in &subnets {
            if !include.contains(subnet) {
                include.push(subnet.clone());
            }
        }
        tree.put(key, join_list(&include))?;
    }

    tree.put(derived::PLATFORM_ACCESS, join_list(&subnets))?;
    Ok(())
}

fn copy_if_present(tree: &mut ValueTree, from: &str, to: &str) -> Result<(), TreeError> {
    if let Some(value) = tree.get(from).map(str::to_string) {
        tree.put(to, value)?;
    }
    Ok(())
}

fn default_to(tree: &mut ValueTree, key: &str, value: &str) -> Result<(), TreeError> {
    if !tree.contains_key(key) {
        tree.put(key, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn groups_default_to_nogroup() {
        assert_eq!(groups(&ValueTree::new()), vec!["nogroup"]);
        let tree = ValueTree::from_pairs([(platform::GROUP, "Beta; prod")]);
        assert_eq!(groups(&tree), vec!["beta", "prod"]);
    }

    #[test]
    fn derives_identity_and_locations() {
        let mut tree = ValueTree::from_pairs([
            (platform::LOCAL_IP, "10.0.0.5"),
            (platform::PORT, "9729"),
            (platform::LOG_DIRECTORY, "/var/log/fleet/"),
            (platform::LOG_FILE, "daemon"),
            (platform::SMTP_HOST, "mail.example"),
            (platform::DISK_SPACE_PATHS, "/cache0;/cache1"),
            (platform::UI_PORT, "8081"),
            (derived::HISTORY_LOCATION, "/explicit"),
        ]);

        derive(&mut tree, &["beta".to_string()]).unwrap();

        assert_eq!(tree.get(derived::LOCAL_IDENTITY), Some("TCP:[10.0.0.5]:9729"));
        assert_eq!(tree.get(derived::LOG_FILE), Some("/var/log/fleet/daemon"));
        assert_eq!(tree.get(derived::SMTP_HOST), Some("mail.example"));
        assert_eq!(tree.get(derived::CACHE_LOCATION), Some("/cache0"));
        assert_eq!(tree.get(derived::HISTORY_LOCATION), Some("/explicit"));
        assert_eq!(tree.get(derived::TMP_DIR), Some("/cache0/tmp"));
        assert_eq!(tree.get(derived::UI_PORT), Some("8081"));
        assert_eq!(tree.get(PARAM_DAEMON_GROUPS), Some("beta"));
    }

    #[test]
    fn explicit_identity_wins() {
        let mut tree = ValueTree::from_pairs([
            (platform::IDENTITY, "TCP:[1.2.3.4]:1"),
            (platform::LOCAL_IP, "10.0.0.5"),
            (platform::PORT, "9729"),
        ]);
        derive(&mut tree, &[]).unwrap();
        assert_eq!(tree.get(derived::LOCAL_IDENTITY), Some("TCP:[1.2.3.4]:1"));
    }

    #[test]
    fn platform_subnet_replaces_previous_contribution() {
        let mut tree = ValueTree::from_pairs([
            (platform::ACCESS_SUBNET, "10.1.0.0/16"),
            (derived::PLATFORM_ACCESS, "10.0.0.0/16"),
            (derived::UI_ACCESS_INCLUDE, "192.168.0.0/24;10.0.0.0/16"),
        ]);

        derive(&mut tree, &[]).unwrap();

        assert_eq!(tree.get(derived::UI_ACCESS_INCLUDE), Some("192.168.0.0/24;10.1.0.0/16"));
        assert_eq!(tree.get(derived::PROXY_ACCESS_INCLUDE), Some("10.1.0.0/16"));
        assert_eq!(tree.get(derived::PLATFORM_ACCESS), Some("10.1.0.0/16"));
    }

    #[test]
    fn version_override_lifts_keys() {
        let mut tree = ValueTree::from_pairs([
            (platform::VERSION, "Linux rpm 2"),
            ("fleet.platform.versionOverride.Linux_rpm_2.fleet.ui.port", "9090"),
            ("fleet.ui.port", "8081"),
        ]);

        derive(&mut tree, &[]).unwrap();
        assert_eq!(tree.get("fleet.ui.port"), Some("9090"));
    }
}

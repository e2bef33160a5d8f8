//! Well-known configuration keys and their defaults.

use std::time::Duration;

/// Interval between reload cycles.
pub const PARAM_RELOAD_INTERVAL: &str = "fleet.config.reloadInterval";
/// Default for [`PARAM_RELOAD_INTERVAL`].
pub const DEFAULT_RELOAD_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// HTTP connect timeout.
pub const PARAM_CONNECT_TIMEOUT: &str = "fleet.config.timeout.connect";
/// HTTP data timeout.
pub const PARAM_DATA_TIMEOUT: &str = "fleet.config.timeout.data";

/// Longest a single reload cycle may run before the scheduler gives up.
pub const PARAM_WATCHDOG: &str = "fleet.config.watchdog";
/// Default for [`PARAM_WATCHDOG`].
pub const DEFAULT_WATCHDOG: Duration = Duration::from_secs(2 * 60 * 60);

/// Cache-config directory, relative to the first disk space path.
pub const PARAM_CACHE_CONFIG_DIR: &str = "fleet.config.cacheConfigDir";
/// Default for [`PARAM_CACHE_CONFIG_DIR`].
pub const DEFAULT_CACHE_CONFIG_DIR: &str = "config";

/// Prefix of the version stamp written into every cache-config file.
pub const PARAM_FILE_VERSION_PREFIX: &str = "fleet.config.fileVersion";

/// Groups this node belongs to, injected after the merge.
pub const PARAM_DAEMON_GROUPS: &str = "fleet.daemon.groups";
/// Group used when the platform names none.
pub const DEFAULT_GROUP: &str = "nogroup";

/// Platform bootstrap keys.
pub mod platform {
    /// Node groups, `;`-separated
    pub const GROUP: &str = "fleet.platform.group";
    /// Fully qualified host name
    pub const FQDN: &str = "fleet.platform.fqdn";
    /// Platform (OS distribution) name
    pub const NAME: &str = "fleet.platform.name";
    /// Platform version string
    pub const VERSION: &str = "fleet.platform.version";
    /// Per-version overrides, keyed by sanitized platform version
    pub const VERSION_OVERRIDE: &str = "fleet.platform.versionOverride";
    /// Log directory
    pub const LOG_DIRECTORY: &str = "fleet.platform.logdirectory";
    /// Log file name
    pub const LOG_FILE: &str = "fleet.platform.logfile";
    /// Node IP address
    pub const LOCAL_IP: &str = "fleet.platform.localIPAddress";
    /// Explicit peer identity
    pub const IDENTITY: &str = "fleet.platform.identity";
    /// Peer protocol port
    pub const PORT: &str = "fleet.platform.port";
    /// SMTP relay host
    pub const SMTP_HOST: &str = "fleet.platform.smtphost";
    /// SMTP relay port
    pub const SMTP_PORT: &str = "fleet.platform.smtpport";
    /// Administrative access subnets
    pub const ACCESS_SUBNET: &str = "fleet.platform.accessSubnet";
    /// Disk space paths, `;`-separated; the first one holds cache config
    pub const DISK_SPACE_PATHS: &str = "fleet.platform.diskSpacePaths";
    /// Legacy UI port
    pub const UI_PORT: &str = "fleet.platform.ui.port";
}

/// Keys written by the derivation pass.
pub mod derived {
    /// Full log file path
    pub const LOG_FILE: &str = "fleet.log.file";
    /// Node IP address
    pub const LOCAL_IP: &str = "fleet.localIPAddress";
    /// Peer identity
    pub const LOCAL_IDENTITY: &str = "fleet.localIdentity";
    /// SMTP relay host
    pub const SMTP_HOST: &str = "fleet.mail.smtphost";
    /// SMTP relay port
    pub const SMTP_PORT: &str = "fleet.mail.smtpport";
    /// UI access allow list
    pub const UI_ACCESS_INCLUDE: &str = "fleet.ui.access.ip.include";
    /// Proxy access allow list
    pub const PROXY_ACCESS_INCLUDE: &str = "fleet.proxy.access.ip.include";
    /// Subnets most recently contributed by the platform
    pub const PLATFORM_ACCESS: &str = "fleet.ui.access.ip.platformAccess";
    /// Content cache location
    pub const CACHE_LOCATION: &str = "fleet.cache.location";
    /// History location
    pub const HISTORY_LOCATION: &str = "fleet.history.location";
    /// Temporary directory
    pub const TMP_DIR: &str = "fleet.tmpDir";
    /// UI port
    pub const UI_PORT: &str = "fleet.ui.port";
}

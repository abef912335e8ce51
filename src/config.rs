//! Sync configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, SyncError};
use crate::hostname::DEFAULT_SUFFIX;
use crate::hosts::default_hosts_path;

/// Environment variable overriding the hosts file path.
pub const ENV_HOSTS_FILE: &str = "WSL2HOST_HOSTS_FILE";
/// Environment variable overriding the managed suffix.
pub const ENV_TLD: &str = "WSL2HOST_TLD";
/// Environment variable enabling periodic passes, in seconds.
pub const ENV_INTERVAL: &str = "WSL2HOST_INTERVAL";

/// Configuration for a sync run.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use wsl2host::SyncConfig;
///
/// let config = SyncConfig::new("/tmp/hosts")
///     .with_suffix(".local")
///     .with_interval(Duration::from_secs(30));
///
/// assert_eq!(config.suffix, ".local");
/// assert_eq!(config.interval, Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Hosts file to keep in sync.
    pub hosts_path: PathBuf,

    /// Managed-namespace suffix appended to every derived hostname.
    pub suffix: String,

    /// Delay between passes. `None` runs a single pass.
    pub interval: Option<Duration>,
}

impl SyncConfig {
    /// Creates a config for `hosts_path` with the `.wsl` suffix and a single pass.
    #[must_use]
    pub fn new(hosts_path: impl Into<PathBuf>) -> Self {
        Self {
            hosts_path: hosts_path.into(),
            suffix: DEFAULT_SUFFIX.to_string(),
            interval: None,
        }
    }

    /// Overrides the managed suffix. Hostnames are case-insensitive, so the
    /// suffix is stored lower-cased.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into().to_ascii_lowercase();
        self
    }

    /// Runs passes repeatedly, `interval` apart.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Builds a config from the `WSL2HOST_*` environment variables, falling
    /// back to the platform hosts file and the `.wsl` suffix.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] if a variable is malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::new(
            lookup(ENV_HOSTS_FILE).map_or_else(default_hosts_path, PathBuf::from),
        );
        if let Some(suffix) = lookup(ENV_TLD) {
            config = config.with_suffix(suffix);
        }
        if let Some(raw) = lookup(ENV_INTERVAL) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                SyncError::InvalidConfig(format!("{ENV_INTERVAL} is not a number: {raw:?}"))
            })?;
            config = config.with_interval(Duration::from_secs(secs));
        }
        config.validate()?;
        Ok(config)
    }

    /// Checks the suffix and interval.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] if the suffix does not start with
    /// `.`, contains characters other than ASCII alphanumerics, `-` and `.`,
    /// or if the interval is zero.
    pub fn validate(&self) -> Result<()> {
        let Some(rest) = self.suffix.strip_prefix('.') else {
            return Err(SyncError::InvalidConfig(format!(
                "suffix must start with '.': {:?}",
                self.suffix
            )));
        };
        if rest.is_empty()
            || !rest
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(SyncError::InvalidConfig(format!(
                "suffix is not a valid domain: {:?}",
                self.suffix
            )));
        }
        if self.interval.is_some_and(|i| i.is_zero()) {
            return Err(SyncError::InvalidConfig("interval must be positive".into()));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(default_hosts_path())
    }
}

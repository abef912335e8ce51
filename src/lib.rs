//! # wsl2host
//!
//! Keep the hosts file in sync with the WSL distributions on a Windows host.
//!
//! Each distribution gets a stable hostname derived from its name
//! (`Ubuntu-18.04` becomes `ubuntu1804.wsl`) that points at its current
//! address, which WSL changes on every restart.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use wsl2host::{SyncConfig, WslCli};
//!
//! let config = SyncConfig::from_env()?;
//! let report = wsl2host::run(&config, &WslCli::new())?;
//! println!("wrote hosts file: {}", report.written);
//! ```
//!
//! ## Managed entries
//!
//! Only hostnames ending in the configured suffix (`.wsl` by default) are
//! read or modified. Every other line of the hosts file is preserved as is.
//! A pass that finds nothing to change does not touch the file.
//!
//! ## Permissions
//!
//! The Windows hosts file is writable only from an elevated process. The
//! caller is responsible for running with the required privileges.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod guest;
pub mod hostname;
pub mod hosts;
pub mod sync;
pub mod wsl;

pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use guest::{GuestInfo, GuestSource};
pub use hostname::{DEFAULT_SUFFIX, guest_hostname, is_managed};
pub use hosts::{HostEntry, HostStore, HostsFile, default_hosts_path};
pub use sync::{Change, SyncReport, apply, plan, reconcile, run};
pub use wsl::{CommandRunner, ProcessRunner, WslCli};

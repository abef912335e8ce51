//! Error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors returned by sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Filesystem I/O failed (typically `PermissionDenied` on the hosts file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An external command could not be spawned or exited unsuccessfully.
    #[error("command `{command}` failed: {message}")]
    Command {
        /// The command line that was run.
        command: String,
        /// Spawn error or captured stderr.
        message: String,
    },

    /// Command output could not be decoded.
    #[error("failed to decode output: {0}")]
    Decode(String),

    /// `hostname -I` inside the guest printed no usable address.
    #[error("no address reported for distro {guest:?}")]
    NoAddress {
        /// Guest name.
        guest: String,
    },

    /// The guest roster could not be fetched.
    #[error("failed to get infos: {0}")]
    ListGuests(#[source] Box<SyncError>),

    /// The hosts file could not be opened or parsed.
    #[error("failed to open hosts file {}: {source}", path.display())]
    OpenStore {
        /// Hosts file path.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: Box<SyncError>,
    },

    /// The address of a running guest could not be resolved.
    #[error("failed to get IP for distro {guest:?}: {source}")]
    ResolveAddress {
        /// Guest name.
        guest: String,
        /// Underlying failure.
        #[source]
        source: Box<SyncError>,
    },

    /// The hosts file could not be written.
    #[error("failed to write hosts file {}: {source}", path.display())]
    WriteStore {
        /// Hosts file path.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: Box<SyncError>,
    },

    /// Invalid configuration values.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl SyncError {
    /// Returns `true` if the root cause is an I/O `PermissionDenied`.
    ///
    /// Writing the Windows hosts file requires an elevated process, so this
    /// is the most common failure of a pass.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Io(e) => e.kind() == std::io::ErrorKind::PermissionDenied,
            Self::ListGuests(source)
            | Self::OpenStore { source, .. }
            | Self::ResolveAddress { source, .. }
            | Self::WriteStore { source, .. } => source.is_permission_denied(),
            _ => false,
        }
    }

    /// Returns the guest name attached to this error, if any.
    #[must_use]
    pub fn guest(&self) -> Option<&str> {
        match self {
            Self::ResolveAddress { guest, .. } | Self::NoAddress { guest } => Some(guest.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_seen_through_wrappers() {
        let err = SyncError::WriteStore {
            path: PathBuf::from("hosts"),
            source: Box::new(SyncError::Io(std::io::Error::from(
                std::io::ErrorKind::PermissionDenied,
            ))),
        };
        assert!(err.is_permission_denied());

        let err = SyncError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(!err.is_permission_denied());
    }

    #[test]
    fn resolve_error_names_the_guest() {
        let err = SyncError::ResolveAddress {
            guest: "Ubuntu-18.04".into(),
            source: Box::new(SyncError::NoAddress {
                guest: "Ubuntu-18.04".into(),
            }),
        };
        assert_eq!(err.guest(), Some("Ubuntu-18.04"));
        assert!(err.to_string().starts_with("failed to get IP for distro \"Ubuntu-18.04\""));
    }
}

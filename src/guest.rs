//! Guest roster abstraction.

use std::net::IpAddr;

use crate::error::Result;

/// A guest known to the roster source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestInfo {
    /// Display name, e.g. `"Ubuntu-18.04"`.
    pub name: String,
    /// Whether the guest is currently running.
    pub running: bool,
}

impl GuestInfo {
    /// Creates a guest entry.
    #[must_use]
    pub fn new(name: impl Into<String>, running: bool) -> Self {
        Self {
            name: name.into(),
            running,
        }
    }
}

/// Source of the guest roster and guest addresses.
pub trait GuestSource {
    /// Lists every known guest, running or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the roster cannot be fetched.
    fn list_guests(&self) -> Result<Vec<GuestInfo>>;

    /// Resolves the canonical address of guest `name`.
    ///
    /// Implementations may start the guest if it is not already running;
    /// callers should only resolve guests reported as running.
    ///
    /// # Errors
    ///
    /// Returns an error if the guest cannot be reached or reports no address.
    fn resolve_address(&self, name: &str) -> Result<IpAddr>;
}

impl<T: GuestSource + ?Sized> GuestSource for &T {
    fn list_guests(&self) -> Result<Vec<GuestInfo>> {
        (**self).list_guests()
    }

    fn resolve_address(&self, name: &str) -> Result<IpAddr> {
        (**self).resolve_address(name)
    }
}

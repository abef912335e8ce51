//! Guest name to hostname derivation.
//!
//! The derived hostname is the join key between the guest roster and the
//! hosts file, so it must stay stable for a given guest name.

/// Default managed-namespace suffix.
pub const DEFAULT_SUFFIX: &str = ".wsl";

/// Derives the managed hostname for a guest.
///
/// Lower-cases `name`, drops every character that is not an ASCII letter or
/// digit and appends the lower-cased `suffix`. A name without any
/// alphanumerics yields the bare suffix.
///
/// ```
/// use wsl2host::guest_hostname;
///
/// assert_eq!(guest_hostname("Ubuntu-18.04", ".wsl"), "ubuntu1804.wsl");
/// assert_eq!(guest_hostname("!!!", ".wsl"), ".wsl");
/// ```
#[must_use]
pub fn guest_hostname(name: &str, suffix: &str) -> String {
    let mut hostname: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    hostname.push_str(&suffix.to_ascii_lowercase());
    hostname
}

/// Returns `true` if `hostname` belongs to the managed namespace.
#[must_use]
pub fn is_managed(hostname: &str, suffix: &str) -> bool {
    hostname.len() >= suffix.len()
        && hostname
            .get(hostname.len() - suffix.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
}

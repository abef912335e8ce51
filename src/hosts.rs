//! Hosts file management.
//!
//! Only entries whose hostname carries the managed suffix are visible through
//! [`HostStore`]. Every other line is kept verbatim and in place.

use std::collections::BTreeMap;
use std::io::Write as _;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};
use crate::hostname::is_managed;

/// Marker comment appended to every managed line.
const MANAGED_BY_MARKER: &str = "# managed by wsl2host";

/// A managed hostname and the address it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    /// Hostname, including the managed suffix.
    pub hostname: String,
    /// Address the hostname resolves to.
    pub address: IpAddr,
}

impl HostEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(hostname: impl Into<String>, address: IpAddr) -> Self {
        Self {
            hostname: hostname.into(),
            address,
        }
    }
}

/// Keyed store of managed host entries.
///
/// Mutations are held in memory until [`write`](Self::write) persists them.
pub trait HostStore {
    /// Returns a snapshot of the managed entries, keyed by hostname.
    fn entries(&self) -> BTreeMap<String, HostEntry>;

    /// Adds an entry, replacing any entry with the same hostname.
    ///
    /// Hostnames outside the managed namespace are ignored.
    fn add_entry(&mut self, entry: HostEntry);

    /// Changes the address of an existing entry.
    ///
    /// Returns `false` if `hostname` is not present.
    fn update_address(&mut self, hostname: &str, address: IpAddr) -> bool;

    /// Removes an entry.
    ///
    /// Returns `Ok(false)` if `hostname` was not present.
    ///
    /// # Errors
    ///
    /// Implementations may fail if the removal cannot be recorded.
    fn remove_entry(&mut self, hostname: &str) -> Result<bool>;

    /// Persists all entries, managed and unmanaged, in one atomic step.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::WriteStore`] if persisting fails. The previous
    /// persisted state is then left intact.
    fn write(&mut self) -> Result<()>;
}

/// A line of the hosts file, terminator included.
#[derive(Debug, Clone)]
enum Line {
    /// Unmanaged content, kept byte for byte.
    Raw(Vec<u8>),
    /// Position of a managed entry, by hostname, with the line's own ending.
    Managed {
        hostname: String,
        eol: &'static str,
    },
}

/// File-backed [`HostStore`] over a hosts file.
///
/// The file is handled as bytes: unmanaged lines need not be UTF-8 and are
/// written back exactly as read, line endings included.
///
/// # Example
///
/// ```rust,ignore
/// use wsl2host::{HostEntry, HostStore, HostsFile};
///
/// let mut hosts = HostsFile::open(wsl2host::default_hosts_path(), ".wsl")?;
/// hosts.add_entry(HostEntry::new("ubuntu.wsl", "172.20.1.2".parse()?));
/// hosts.write()?;
/// ```
#[derive(Debug)]
pub struct HostsFile {
    path: PathBuf,
    suffix: String,
    lines: Vec<Line>,
    entries: BTreeMap<String, HostEntry>,
    newline: &'static str,
}

impl HostsFile {
    /// Reads the hosts file at `path`, treating hostnames ending in `suffix`
    /// as managed. The suffix is matched case-insensitively and stored
    /// lower-cased. A missing file is treated as empty.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::OpenStore`] if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>, suffix: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Hosts file does not exist, starting empty");
                Vec::new()
            }
            Err(e) => {
                return Err(SyncError::OpenStore {
                    path,
                    source: Box::new(e.into()),
                });
            }
        };
        Ok(Self::parse(path, suffix.into(), &content))
    }

    fn parse(path: PathBuf, suffix: String, content: &[u8]) -> Self {
        let suffix = suffix.to_ascii_lowercase();
        let newline = if content.windows(2).any(|w| w == b"\r\n")
            || (content.is_empty() && cfg!(windows))
        {
            "\r\n"
        } else {
            "\n"
        };

        let mut lines = Vec::new();
        let mut entries = BTreeMap::new();
        for raw in content.split_inclusive(|&b| b == b'\n') {
            let (body, eol) = split_eol(raw);
            let managed = std::str::from_utf8(body)
                .ok()
                .and_then(|text| parse_managed(text, &suffix));
            match managed {
                Some(entry) if entries.contains_key(&entry.hostname) => {
                    tracing::debug!(
                        hostname = %entry.hostname,
                        "Dropping duplicate managed entry"
                    );
                }
                Some(entry) => {
                    lines.push(Line::Managed {
                        hostname: entry.hostname.clone(),
                        eol,
                    });
                    entries.insert(entry.hostname.clone(), entry);
                }
                None => lines.push(Line::Raw(raw.to_vec())),
            }
        }

        Self {
            path,
            suffix,
            lines,
            entries,
            newline,
        }
    }

    /// Returns the hosts file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the managed suffix.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Renders the full file content.
    #[must_use]
    pub fn render(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for line in &self.lines {
            // Only the original last line can lack a terminator.
            if !out.is_empty() && !out.ends_with(b"\n") {
                out.extend_from_slice(self.newline.as_bytes());
            }
            match line {
                Line::Raw(raw) => out.extend_from_slice(raw),
                Line::Managed { hostname, eol } => {
                    let Some(entry) = self.entries.get(hostname) else {
                        continue;
                    };
                    out.extend_from_slice(format_entry(entry).as_bytes());
                    out.extend_from_slice(eol.as_bytes());
                }
            }
        }
        out
    }

    fn persist(&self) -> std::io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&self.render())?;
        tmp.as_file().sync_all()?;
        if let Ok(meta) = std::fs::metadata(&self.path) {
            tmp.as_file().set_permissions(meta.permissions())?;
        }
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl HostStore for HostsFile {
    fn entries(&self) -> BTreeMap<String, HostEntry> {
        self.entries.clone()
    }

    fn add_entry(&mut self, entry: HostEntry) {
        if !is_managed(&entry.hostname, &self.suffix) {
            tracing::warn!(hostname = %entry.hostname, "Refusing to add unmanaged hostname");
            return;
        }
        let hostname = entry.hostname.clone();
        if self.entries.insert(hostname.clone(), entry).is_none() {
            self.lines.push(Line::Managed {
                hostname,
                eol: self.newline,
            });
        }
    }

    fn update_address(&mut self, hostname: &str, address: IpAddr) -> bool {
        match self.entries.get_mut(hostname) {
            Some(entry) => {
                entry.address = address;
                true
            }
            None => false,
        }
    }

    fn remove_entry(&mut self, hostname: &str) -> Result<bool> {
        if self.entries.remove(hostname).is_none() {
            return Ok(false);
        }
        self.lines
            .retain(|line| !matches!(line, Line::Managed { hostname: h, .. } if h == hostname));
        Ok(true)
    }

    fn write(&mut self) -> Result<()> {
        self.persist().map_err(|e| SyncError::WriteStore {
            path: self.path.clone(),
            source: Box::new(e.into()),
        })?;
        tracing::info!(
            path = %self.path.display(),
            entries = self.entries.len(),
            "Wrote hosts file"
        );
        Ok(())
    }
}

/// Splits a raw line into its body and its terminator.
fn split_eol(raw: &[u8]) -> (&[u8], &'static str) {
    if let Some(body) = raw.strip_suffix(b"\r\n") {
        (body, "\r\n")
    } else if let Some(body) = raw.strip_suffix(b"\n") {
        (body, "\n")
    } else {
        (raw, "")
    }
}

/// Parses `line` as a managed entry. Comments, blank lines, malformed lines
/// and unmanaged hostnames yield `None`.
fn parse_managed(line: &str, suffix: &str) -> Option<HostEntry> {
    let data = line.split('#').next().unwrap_or_default();
    let mut fields = data.split_whitespace();
    let address = fields.next()?.parse().ok()?;
    let hostname = fields.next()?;
    is_managed(hostname, suffix).then(|| HostEntry::new(hostname.to_ascii_lowercase(), address))
}

fn format_entry(entry: &HostEntry) -> String {
    format!("{} {} {MANAGED_BY_MARKER}", entry.address, entry.hostname)
}

/// Returns the platform hosts file path.
#[must_use]
pub fn default_hosts_path() -> PathBuf {
    default_hosts_path_impl()
}

#[cfg(windows)]
fn default_hosts_path_impl() -> PathBuf {
    std::env::var_os("SystemRoot")
        .map_or_else(|| PathBuf::from(r"C:\Windows"), PathBuf::from)
        .join(r"System32\drivers\etc\hosts")
}

#[cfg(not(windows))]
fn default_hosts_path_impl() -> PathBuf {
    PathBuf::from("/etc/hosts")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# Copyright (c) 1993-2009 Microsoft Corp.\r\n\
                          127.0.0.1 localhost\r\n\
                          172.20.1.9 ubuntu1804.wsl # managed by wsl2host\r\n\
                          \r\n\
                          10.0.0.7 nas.lan nas\r\n\
                          10.0.0.5 debian.wsl\r\n";

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn text(hosts: &HostsFile) -> String {
        String::from_utf8(hosts.render()).unwrap()
    }

    fn sample() -> HostsFile {
        HostsFile::parse(PathBuf::from("hosts"), ".wsl".into(), SAMPLE.as_bytes())
    }

    #[test]
    fn parse_exposes_only_managed_entries() {
        let hosts = sample();
        let entries = hosts.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["ubuntu1804.wsl"].address, ip("172.20.1.9"));
        assert_eq!(entries["debian.wsl"].address, ip("10.0.0.5"));
    }

    #[test]
    fn untouched_file_renders_unmanaged_lines_verbatim() {
        let rendered = text(&sample());
        assert!(rendered.starts_with("# Copyright (c) 1993-2009 Microsoft Corp.\r\n127.0.0.1 localhost\r\n"));
        assert!(rendered.contains("\r\n\r\n10.0.0.7 nas.lan nas\r\n"));
        assert!(rendered.contains("10.0.0.5 debian.wsl # managed by wsl2host\r\n"));
    }

    #[test]
    fn add_appends_and_update_rewrites_in_place() {
        let mut hosts = sample();
        hosts.add_entry(HostEntry::new("alpine.wsl", ip("172.20.1.3")));
        assert!(hosts.update_address("ubuntu1804.wsl", ip("172.20.1.2")));
        assert!(!hosts.update_address("missing.wsl", ip("172.20.1.2")));

        let rendered = text(&hosts);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[2], "172.20.1.2 ubuntu1804.wsl # managed by wsl2host");
        assert_eq!(lines.last(), Some(&"172.20.1.3 alpine.wsl # managed by wsl2host"));
    }

    #[test]
    fn add_existing_hostname_replaces_without_duplicating() {
        let mut hosts = sample();
        hosts.add_entry(HostEntry::new("debian.wsl", ip("10.0.0.6")));
        let rendered = text(&hosts);
        assert_eq!(rendered.matches("debian.wsl").count(), 1);
        assert!(rendered.contains("10.0.0.6 debian.wsl"));
    }

    #[test]
    fn add_outside_namespace_is_ignored() {
        let mut hosts = sample();
        hosts.add_entry(HostEntry::new("localhost", ip("10.9.9.9")));
        assert!(!hosts.entries().contains_key("localhost"));
        assert!(!text(&hosts).contains("10.9.9.9"));
    }

    #[test]
    fn remove_reports_presence() {
        let mut hosts = sample();
        assert!(hosts.remove_entry("debian.wsl").unwrap());
        assert!(!hosts.remove_entry("debian.wsl").unwrap());
        assert!(!hosts.remove_entry("never.wsl").unwrap());
        assert!(!text(&hosts).contains("debian.wsl"));
    }

    #[test]
    fn unmanaged_hostnames_cannot_be_removed() {
        let mut hosts = sample();
        assert!(!hosts.remove_entry("localhost").unwrap());
        assert!(text(&hosts).contains("127.0.0.1 localhost"));
    }

    #[test]
    fn duplicate_managed_lines_collapse() {
        let hosts = HostsFile::parse(
            PathBuf::from("hosts"),
            ".wsl".into(),
            b"1.1.1.1 a.wsl\n2.2.2.2 A.WSL\n",
        );
        assert_eq!(hosts.entries()["a.wsl"].address, ip("1.1.1.1"));
        assert_eq!(text(&hosts), "1.1.1.1 a.wsl # managed by wsl2host\n");
    }

    #[test]
    fn malformed_lines_are_kept() {
        let hosts = HostsFile::parse(
            PathBuf::from("hosts"),
            ".wsl".into(),
            b"not-an-ip broken.wsl\n1.2.3.4\n",
        );
        assert!(hosts.entries().is_empty());
        assert_eq!(text(&hosts), "not-an-ip broken.wsl\n1.2.3.4\n");
    }

    #[test]
    fn non_utf8_lines_survive_a_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts");
        std::fs::write(&path, b"# Caf\xe9 printer\r\n127.0.0.1 localhost\r\n").unwrap();

        let mut hosts = HostsFile::open(&path, ".wsl").unwrap();
        hosts.add_entry(HostEntry::new("ubuntu.wsl", ip("172.20.1.2")));
        hosts.write().unwrap();

        assert_eq!(
            std::fs::read(&path).unwrap(),
            b"# Caf\xe9 printer\r\n127.0.0.1 localhost\r\n172.20.1.2 ubuntu.wsl # managed by wsl2host\r\n"
        );
    }

    #[test]
    fn line_endings_are_kept_per_line() {
        let mut hosts = HostsFile::parse(
            PathBuf::from("hosts"),
            ".wsl".into(),
            b"127.0.0.1 localhost\n10.0.0.5 debian.wsl\r\n10.0.0.7 nas.lan",
        );
        assert_eq!(
            text(&hosts),
            "127.0.0.1 localhost\n10.0.0.5 debian.wsl # managed by wsl2host\r\n10.0.0.7 nas.lan"
        );

        hosts.add_entry(HostEntry::new("alpine.wsl", ip("172.20.1.3")));
        assert_eq!(
            text(&hosts),
            "127.0.0.1 localhost\n10.0.0.5 debian.wsl # managed by wsl2host\r\n10.0.0.7 nas.lan\r\n\
             172.20.1.3 alpine.wsl # managed by wsl2host\r\n"
        );
    }

    #[test]
    fn suffix_is_lowercased() {
        let hosts = HostsFile::parse(PathBuf::from("hosts"), ".WSL".into(), b"10.0.0.5 Debian.Wsl\n");
        assert_eq!(hosts.suffix(), ".wsl");
        assert_eq!(hosts.entries()["debian.wsl"].address, ip("10.0.0.5"));
    }

    #[test]
    fn write_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts");
        std::fs::write(&path, "127.0.0.1 localhost\n").unwrap();

        let mut hosts = HostsFile::open(&path, ".wsl").unwrap();
        hosts.add_entry(HostEntry::new("ubuntu.wsl", ip("172.20.1.2")));
        hosts.write().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "127.0.0.1 localhost\n172.20.1.2 ubuntu.wsl # managed by wsl2host\n"
        );
        let reopened = HostsFile::open(&path, ".wsl").unwrap();
        assert_eq!(reopened.entries(), hosts.entries());
    }

    #[test]
    fn open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let hosts = HostsFile::open(dir.path().join("hosts"), ".wsl").unwrap();
        assert!(hosts.entries().is_empty());
        assert!(hosts.render().is_empty());
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut hosts = HostsFile::open(dir.path().join("nope").join("hosts"), ".wsl").unwrap();
        hosts.add_entry(HostEntry::new("ubuntu.wsl", ip("172.20.1.2")));
        assert!(matches!(hosts.write(), Err(SyncError::WriteStore { .. })));
    }
}

//! Reconciliation of the guest roster against the hosts file.
//!
//! A pass first classifies every guest against a snapshot of the managed
//! entries ([`plan`]), then applies the resulting changes ([`apply`]) and
//! writes the store at most once. Planning does all the fallible address
//! resolution, so a failure leaves the store untouched.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::guest::{GuestInfo, GuestSource};
use crate::hostname::guest_hostname;
use crate::hosts::{HostEntry, HostStore, HostsFile};

/// A single mutation of the managed namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// A running guest has no entry yet.
    Add(HostEntry),
    /// A running guest's address moved.
    Update {
        /// Managed hostname.
        hostname: String,
        /// Address currently stored.
        from: IpAddr,
        /// Freshly resolved address.
        to: IpAddr,
    },
    /// A stopped guest still has an entry.
    Remove {
        /// Managed hostname.
        hostname: String,
    },
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Entries added for newly running guests.
    pub added: usize,
    /// Entries whose address was refreshed.
    pub updated: usize,
    /// Entries removed for stopped guests.
    pub removed: usize,
    /// Whether the store was written.
    pub written: bool,
}

impl SyncReport {
    /// Returns `true` if any entry changed during the pass.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.added + self.updated + self.removed > 0
    }
}

/// Classifies every guest in `guests` against `snapshot`.
///
/// Stopped guests with an entry are removed. Running guests are resolved
/// through `source` and either added or, if their address moved, updated.
/// When two guests derive the same hostname, the first one in roster order
/// owns it and the others are skipped.
///
/// # Errors
///
/// Returns [`SyncError::ResolveAddress`] for the first running guest whose
/// address cannot be resolved. No changes are returned in that case.
pub fn plan<S: GuestSource + ?Sized>(
    guests: &[GuestInfo],
    snapshot: &BTreeMap<String, HostEntry>,
    source: &S,
    suffix: &str,
) -> Result<Vec<Change>> {
    let mut changes = Vec::new();
    let mut owners: HashMap<String, &str> = HashMap::new();

    for guest in guests {
        let hostname = guest_hostname(&guest.name, suffix);
        if let Some(owner) = owners.get(&hostname) {
            tracing::warn!(
                guest = %guest.name,
                owner = %owner,
                hostname = %hostname,
                "Hostname already taken by another distro, skipping"
            );
            continue;
        }
        owners.insert(hostname.clone(), guest.name.as_str());

        let existing = snapshot.get(&hostname);
        if !guest.running {
            if existing.is_some() {
                changes.push(Change::Remove { hostname });
            }
            continue;
        }

        let address =
            source
                .resolve_address(&guest.name)
                .map_err(|e| SyncError::ResolveAddress {
                    guest: guest.name.clone(),
                    source: Box::new(e),
                })?;

        match existing {
            Some(entry) if entry.address == address => {
                tracing::debug!(hostname = %hostname, address = %address, "Entry up to date");
            }
            Some(entry) => changes.push(Change::Update {
                hostname,
                from: entry.address,
                to: address,
            }),
            None => changes.push(Change::Add(HostEntry::new(hostname, address))),
        }
    }

    Ok(changes)
}

/// Applies `changes` to `store` in memory. Nothing is written.
///
/// Removals of entries that are already gone, or that the store fails to
/// remove, are skipped.
pub fn apply<H: HostStore + ?Sized>(changes: Vec<Change>, store: &mut H) -> SyncReport {
    let mut report = SyncReport::default();

    for change in changes {
        match change {
            Change::Add(entry) => {
                tracing::info!(hostname = %entry.hostname, address = %entry.address, "Adding host entry");
                store.add_entry(entry);
                report.added += 1;
            }
            Change::Update { hostname, from, to } => {
                tracing::info!(hostname = %hostname, from = %from, to = %to, "Updating host entry");
                if !store.update_address(&hostname, to) {
                    store.add_entry(HostEntry::new(hostname, to));
                }
                report.updated += 1;
            }
            Change::Remove { hostname } => match store.remove_entry(&hostname) {
                Ok(true) => {
                    tracing::info!(hostname = %hostname, "Removing host entry");
                    report.removed += 1;
                }
                Ok(false) => tracing::debug!(hostname = %hostname, "Entry already absent"),
                Err(e) => tracing::debug!(hostname = %hostname, error = %e, "Failed to remove entry"),
            },
        }
    }

    report
}

/// Converges `store` to `guests` and writes it once if anything changed.
///
/// # Errors
///
/// Returns [`SyncError::ResolveAddress`] if a running guest cannot be
/// resolved (the store is left untouched), or the store's write error.
pub fn reconcile<S, H>(
    guests: &[GuestInfo],
    source: &S,
    store: &mut H,
    suffix: &str,
) -> Result<SyncReport>
where
    S: GuestSource + ?Sized,
    H: HostStore + ?Sized,
{
    let snapshot = store.entries();
    let changes = plan(guests, &snapshot, source, suffix)?;
    let mut report = apply(changes, store);

    if report.is_dirty() {
        store.write()?;
        report.written = true;
    } else {
        tracing::debug!("Hosts file up to date, skipping write");
    }

    Ok(report)
}

/// Runs one full pass: fetches the roster from `source`, opens the hosts
/// file named by `config` and reconciles it.
///
/// # Errors
///
/// Returns [`SyncError::ListGuests`] if the roster cannot be fetched,
/// [`SyncError::OpenStore`] if the hosts file cannot be read, and any error
/// from [`reconcile`].
pub fn run<S: GuestSource + ?Sized>(config: &SyncConfig, source: &S) -> Result<SyncReport> {
    let guests = source
        .list_guests()
        .map_err(|e| SyncError::ListGuests(Box::new(e)))?;
    let mut store = HostsFile::open(&config.hosts_path, config.suffix.as_str())?;
    let report = reconcile(&guests, source, &mut store, &config.suffix)?;

    tracing::info!(
        guests = guests.len(),
        added = report.added,
        updated = report.updated,
        removed = report.removed,
        written = report.written,
        "Sync pass complete"
    );
    Ok(report)
}

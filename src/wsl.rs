//! Guest roster backed by the `wsl.exe` command line.
//!
//! `wsl.exe` prints its own listings as UTF-16LE, while commands run inside a
//! guest print UTF-8. [`decode_output`] accepts both.

use std::net::IpAddr;
use std::process::Command;

use crate::error::{Result, SyncError};
use crate::guest::{GuestInfo, GuestSource};

/// Name of the WSL launcher executable.
const WSL_EXE: &str = "wsl.exe";

/// Host-side Hyper-V adapter connected to the WSL network.
const WSL_ADAPTER: &str = "vEthernet (WSL)";

/// Executes an external program and returns its stdout.
pub trait CommandRunner {
    /// Runs `program` with `args`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Command`] if the program cannot be spawned or
    /// exits unsuccessfully.
    fn run(&self, program: &str, args: &[&str]) -> Result<Vec<u8>>;
}

/// Production runner that spawns the program directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<Vec<u8>> {
        let command = command_line(program, args);
        tracing::trace!(command = %command, "Running command");

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| SyncError::Command {
                command: command.clone(),
                message: e.to_string(),
            })?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            let stderr = decode_output(&output.stderr).unwrap_or_default();
            Err(SyncError::Command {
                command,
                message: format!("{}: {}", output.status, stderr.trim()),
            })
        }
    }
}

fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// [`GuestSource`] that queries WSL through `wsl.exe`.
///
/// # Example
///
/// ```rust,ignore
/// use wsl2host::{GuestSource, WslCli};
///
/// let wsl = WslCli::new();
/// for guest in wsl.list_guests()? {
///     println!("{} running={}", guest.name, guest.running);
/// }
/// ```
#[derive(Debug, Default)]
pub struct WslCli<R = ProcessRunner> {
    runner: R,
}

impl WslCli {
    /// Creates a source that spawns `wsl.exe`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            runner: ProcessRunner,
        }
    }
}

impl<R: CommandRunner> WslCli<R> {
    /// Creates a source on top of a custom runner (useful for testing).
    #[must_use]
    pub const fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    /// Returns the underlying runner.
    #[must_use]
    pub const fn runner(&self) -> &R {
        &self.runner
    }

    /// Returns the names of running guests (`wsl.exe -l -q --running`).
    ///
    /// # Errors
    ///
    /// Returns an error if `wsl.exe` fails or its output cannot be decoded.
    pub fn running_guests(&self) -> Result<Vec<String>> {
        let out = self.runner.run(WSL_EXE, &["-l", "-q", "--running"])?;
        Ok(decode_output(&out)?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Returns the host's address on the WSL virtual switch, as reported by
    /// `netsh interface ip show address "vEthernet (WSL)"`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Command`] if `netsh` fails or prints no address.
    pub fn host_address(&self) -> Result<IpAddr> {
        let args = ["interface", "ip", "show", "address", WSL_ADAPTER];
        let out = self.runner.run("netsh", &args)?;
        adapter_address(&decode_output(&out)?).ok_or_else(|| SyncError::Command {
            command: command_line("netsh", &args),
            message: "no IP address in output".into(),
        })
    }
}

impl<R: CommandRunner> GuestSource for WslCli<R> {
    fn list_guests(&self) -> Result<Vec<GuestInfo>> {
        let out = self.runner.run(WSL_EXE, &["-l", "-v"])?;
        Ok(parse_listing(&decode_output(&out)?))
    }

    fn resolve_address(&self, name: &str) -> Result<IpAddr> {
        // Starts the guest if it is stopped.
        let out = self.runner.run(WSL_EXE, &["-d", name, "--", "hostname", "-I"])?;
        let text = String::from_utf8_lossy(&out);
        first_address(&text).ok_or_else(|| SyncError::NoAddress {
            guest: name.to_string(),
        })
    }
}

/// Decodes command output, detecting UTF-16LE with or without a BOM.
///
/// # Errors
///
/// Returns [`SyncError::Decode`] if UTF-16 output contains unpaired surrogates.
pub fn decode_output(raw: &[u8]) -> Result<String> {
    let utf16 = if let Some(rest) = raw.strip_prefix(&[0xFF, 0xFE]) {
        Some(rest)
    } else if raw.len() % 2 == 0 && raw.chunks_exact(2).any(|pair| pair[1] == 0) {
        Some(raw)
    } else {
        None
    };

    match utf16 {
        Some(bytes) => {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16(&units).map_err(|e| SyncError::Decode(e.to_string()))
        }
        None => Ok(String::from_utf8_lossy(raw).into_owned()),
    }
}

/// Parses the table printed by `wsl.exe -l -v`.
///
/// ```text
///   NAME            STATE           VERSION
/// * Ubuntu-18.04    Running         2
///   Debian          Stopped         2
/// ```
fn parse_listing(text: &str) -> Vec<GuestInfo> {
    let mut guests = Vec::new();
    for line in text.lines() {
        let line = line.trim().trim_start_matches('*').trim();
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [name @ .., state, version] = fields.as_slice() else {
            continue;
        };
        if name.is_empty() || version.parse::<u8>().is_err() {
            // Header row or a message such as "no installed distributions".
            tracing::trace!(line = %line, "Skipping listing line");
            continue;
        }
        guests.push(GuestInfo::new(name.join(" "), *state == "Running"));
    }
    guests
}

/// Picks the canonical address from `hostname -I` output: the first IPv4
/// address, or the first address of any family if there is no IPv4 one.
fn first_address(text: &str) -> Option<IpAddr> {
    let addrs: Vec<IpAddr> = text
        .split_whitespace()
        .filter_map(|w| w.parse().ok())
        .collect();
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
}

/// Extracts the `IP Address:` value from `netsh interface ip show address`.
///
/// ```text
/// Configuration for interface "vEthernet (WSL)"
///     DHCP enabled:                         No
///     IP Address:                           172.20.0.1
///     Subnet Prefix:                        172.20.0.0/20 (mask 255.255.240.0)
/// ```
fn adapter_address(text: &str) -> Option<IpAddr> {
    text.lines()
        .filter(|line| line.trim_start().starts_with("IP"))
        .find_map(|line| line.split_once(':')?.1.trim().parse().ok())
}

//! `wsl2host` command: sync the hosts file with running WSL distributions.
//!
//! Configured through `WSL2HOST_HOSTS_FILE`, `WSL2HOST_TLD` and
//! `WSL2HOST_INTERVAL`. Log verbosity follows `RUST_LOG`.

use std::process::ExitCode;

use wsl2host::{SyncConfig, WslCli};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match SyncConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    let wsl = WslCli::new();

    let Some(interval) = config.interval else {
        return match wsl2host::run(&config, &wsl) {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "Sync pass failed");
                if e.is_permission_denied() {
                    tracing::error!("The hosts file can only be written from an elevated prompt");
                }
                ExitCode::FAILURE
            }
        };
    };

    tracing::info!(
        interval_secs = interval.as_secs(),
        path = %config.hosts_path.display(),
        "Watching WSL distributions"
    );
    loop {
        if let Err(e) = wsl2host::run(&config, &wsl) {
            tracing::error!(error = %e, "Sync pass failed");
        }
        std::thread::sleep(interval);
    }
}

// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! opendex-launcher - entry point
//!
//! Reads `NETWORK` and `BRANCH` from the environment, runs the matching
//! launcher build and exits with its exit code.

use anyhow::Context;
use opendex_launcher::home::launcher_home;
use opendex_launcher::{ChildExit, Launcher};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_NETWORK: &str = "mainnet";
const DEFAULT_BRANCH: &str = "master";

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn setup() -> anyhow::Result<(PathBuf, Launcher)> {
    let home_dir = launcher_home().context("resolve home directory")?;
    let launcher = Launcher::new(&home_dir).context("initialize launcher")?;
    Ok((home_dir, launcher))
}

fn main() {
    // Launcher output goes to stderr so it never mixes with the child's stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("opendex_launcher=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (home_dir, launcher) = match setup() {
        Ok(ready) => ready,
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    };

    let network = env_or("NETWORK", DEFAULT_NETWORK);
    let branch = env_or("BRANCH", DEFAULT_BRANCH);
    let network_dir = launcher.config().network_dir(&network, &home_dir);
    let args: Vec<OsString> = std::env::args_os().skip(1).collect();

    match launcher.start(&branch, &network, &network_dir, args.as_slice()) {
        Ok(ChildExit::Success) => {}
        Ok(ChildExit::Failed(code)) => std::process::exit(code),
        Err(e) => {
            eprintln!("ERROR: {e}");
            std::process::exit(1);
        }
    }
}

// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Platform naming as used by the opendex-docker build pipeline

use regex::Regex;
use std::sync::LazyLock;

#[cfg(target_os = "linux")]
const OS: &str = "linux";
#[cfg(target_os = "macos")]
const OS: &str = "darwin";
#[cfg(target_os = "windows")]
const OS: &str = "windows";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const OS: &str = std::env::consts::OS;

#[cfg(target_arch = "x86_64")]
const ARCH: &str = "amd64";
#[cfg(target_arch = "aarch64")]
const ARCH: &str = "arm64";
#[cfg(target_arch = "x86")]
const ARCH: &str = "386";
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64", target_arch = "x86")))]
const ARCH: &str = std::env::consts::ARCH;

/// Tags like `21.02.02` are published as release assets instead of CI artifacts
static RELEASE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{2}\.[0-9]{2}\.[0-9]{2}.*$").expect("valid release ref pattern")
});

/// Name of the archive stored inside every version directory
pub const ARCHIVE_NAME: &str = "launcher.zip";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: &'static str,
    pub arch: &'static str,
}

impl Platform {
    pub fn current() -> Self {
        Self { os: OS, arch: ARCH }
    }

    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    /// File name of the launcher binary inside a version directory
    pub fn binary_name(&self) -> &'static str {
        if self.is_windows() {
            "launcher.exe"
        } else {
            "launcher"
        }
    }

    /// CI artifacts are only built for amd64, keyed by OS
    pub fn artifact_name(&self) -> String {
        format!("{}-amd64", self.os)
    }

    pub fn release_asset_name(&self) -> String {
        format!("launcher-{}-{}.zip", self.os, self.arch)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

pub fn is_release_ref(branch: &str) -> bool {
    RELEASE_REF.is_match(branch)
}

// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! opendex launcher - fetches and runs the opendex-docker launcher binary
//!
//! The launcher resolves the head commit of a branch, keeps one extracted
//! build per commit under `<home>/launcher/versions`, and runs that build
//! with the caller's arguments, streams and exit code.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod github;
pub mod home;
pub mod launcher;
pub mod platform;

pub use cache::{CacheEntry, VersionCache};
pub use config::{GitHubSettings, LauncherConfig};
pub use error::{LauncherError, Result};
pub use fetcher::BinaryFetcher;
pub use github::GitHub;
pub use launcher::{ChildExit, Launcher};
pub use platform::{Platform, is_release_ref};

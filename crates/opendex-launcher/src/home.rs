// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Per-OS location of the opendex-docker home directory

use crate::error::{LauncherError, Result};
use crate::platform::Platform;
use std::path::{Path, PathBuf};

/// Home directory for the current user and platform
pub fn launcher_home() -> Result<PathBuf> {
    let user_home = dirs::home_dir().ok_or_else(|| {
        LauncherError::Config("unable to determine the user home directory".to_string())
    })?;
    home_for(&Platform::current(), &user_home)
}

pub fn home_for(platform: &Platform, user_home: &Path) -> Result<PathBuf> {
    match platform.os {
        "linux" => Ok(user_home.join(".opendex-docker")),
        "darwin" => Ok(user_home
            .join("Library")
            .join("Application Support")
            .join("OpendexDocker")),
        "windows" => Ok(user_home
            .join("AppData")
            .join("Local")
            .join("OpendexDocker")),
        other => Err(LauncherError::UnsupportedPlatform(other.to_string())),
    }
}

// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Configuration module for the launcher
//!
//! The config file lives next to the network directories and is shared with
//! the launched binary, so unknown keys are ignored.

use crate::error::{LauncherError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the config file inside the home directory
pub const CONFIG_FILE_NAME: &str = "opendexd-docker.conf";

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_download_base_url() -> String {
    "https://github.com".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LauncherConfig {
    /// Data directory override for simnet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simnet_dir: Option<PathBuf>,

    /// Data directory override for testnet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testnet_dir: Option<PathBuf>,

    /// Data directory override for mainnet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mainnet_dir: Option<PathBuf>,

    #[serde(rename = "GitHub", default)]
    pub github: GitHubSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitHubSettings {
    /// Token used for artifact downloads (CI artifacts require one)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// REST API base URL (overridable for testing)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Base URL for release asset downloads (overridable for testing)
    #[serde(default = "default_download_base_url")]
    pub download_base_url: String,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            access_token: None,
            api_base_url: default_api_base_url(),
            download_base_url: default_download_base_url(),
        }
    }
}

impl GitHubSettings {
    /// The configured token, treating an empty string as absent
    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }
}

impl LauncherConfig {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| LauncherError::Config(format!("unmarshal: {e}")))
    }

    /// Data directory for `network`, honoring the per-network overrides
    pub fn network_dir(&self, network: &str, home_dir: &Path) -> PathBuf {
        let configured = match network {
            "simnet" => self.simnet_dir.as_ref(),
            "testnet" => self.testnet_dir.as_ref(),
            "mainnet" => self.mainnet_dir.as_ref(),
            _ => None,
        };
        configured
            .filter(|dir| !dir.as_os_str().is_empty())
            .cloned()
            .unwrap_or_else(|| home_dir.join(network))
    }
}

/// Load the config file, falling back to defaults when it does not exist
pub fn load_config(path: &Path) -> Result<LauncherConfig> {
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(LauncherConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(LauncherError::filesystem(path))?;
    LauncherConfig::parse(&content)
}

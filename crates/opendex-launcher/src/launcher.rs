// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Resolve, fetch and run the launcher binary for a branch
//!
//! One `start` call walks the whole sequence: resolve the branch head,
//! check the version cache, fetch and extract on a miss, then run the binary
//! with the caller's standard streams. The first failing step aborts.

use crate::cache::{CacheEntry, VersionCache};
use crate::config::{CONFIG_FILE_NAME, LauncherConfig, load_config};
use crate::error::{LauncherError, OpContext, Result};
use crate::fetcher::BinaryFetcher;
use crate::github::GitHub;
use crate::platform::Platform;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// Outcome of a child process that was started successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    Success,
    /// Non-zero exit; the launcher should exit with the same code
    Failed(i32),
}

impl ChildExit {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failed(code) => code,
        }
    }
}

impl From<ExitStatus> for ChildExit {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            return Self::Success;
        }
        Self::Failed(status.code().unwrap_or_else(|| signal_exit_code(status)))
    }
}

/// Shell convention for a child killed by a signal
#[cfg(unix)]
fn signal_exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map_or(1, |signal| 128 + signal)
}

#[cfg(not(unix))]
fn signal_exit_code(_status: ExitStatus) -> i32 {
    1
}

/// Variables added to the inherited environment of the child
pub fn child_env(network: &str, network_dir: &Path) -> BTreeMap<&'static str, OsString> {
    BTreeMap::from([
        ("NETWORK", OsString::from(network)),
        ("NETWORK_DIR", network_dir.as_os_str().to_owned()),
    ])
}

#[derive(Debug)]
pub struct Launcher {
    launcher_dir: PathBuf,
    config: LauncherConfig,
    platform: Platform,
    github: GitHub,
    fetcher: BinaryFetcher,
    cache: VersionCache,
}

impl Launcher {
    /// Launcher rooted at `home_dir`, configured from its config file
    pub fn new(home_dir: &Path) -> Result<Self> {
        let config = load_config(&home_dir.join(CONFIG_FILE_NAME)).op("parse config")?;
        Self::with_config(home_dir, config)
    }

    pub fn with_config(home_dir: &Path, config: LauncherConfig) -> Result<Self> {
        let launcher_dir = home_dir.join("launcher");
        let platform = Platform::current();
        let launcher = Self {
            github: GitHub::new(config.github.clone())?,
            fetcher: BinaryFetcher::new()?,
            cache: VersionCache::new(launcher_dir.join("versions")),
            launcher_dir,
            config,
            platform,
        };
        launcher.init()?;
        Ok(launcher)
    }

    /// Use another platform's binary and artifact names
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.github = self.github.with_platform(platform);
        self.cache = self.cache.with_platform(platform);
        self.platform = platform;
        self
    }

    fn init(&self) -> Result<()> {
        if !self.launcher_dir.exists() {
            std::fs::create_dir_all(&self.launcher_dir)
                .map_err(LauncherError::filesystem(&self.launcher_dir))
                .op("mkdir")?;
        }
        Ok(())
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    pub fn cache(&self) -> &VersionCache {
        &self.cache
    }

    /// Run the newest launcher build of `branch`
    ///
    /// `args` are passed to the child unchanged (without the program name).
    /// The branch head is always resolved online because the commit is the
    /// cache key.
    pub fn start<S: AsRef<OsStr>>(
        &self,
        branch: &str,
        network: &str,
        network_dir: &Path,
        args: &[S],
    ) -> Result<ChildExit> {
        let commit = self
            .github
            .resolve_head_commit(branch)
            .op("git head commit")?;

        tracing::debug!(
            "Start launcher with branch={branch}({commit}), network={network}, networkDir={}",
            network_dir.display()
        );

        self.cache.ensure_root()?;
        let entry = self.cache.resolve(&commit);
        if entry.already_present {
            if !entry.is_complete() {
                tracing::warn!(
                    "{} has no completion marker; if the launcher fails to start, delete {} to download it again",
                    entry.binary.display(),
                    entry.dir.display()
                );
            }
            tracing::info!("Using cached launcher for commit {commit}");
        } else {
            tracing::info!("No cached launcher for commit {commit}, downloading");
            self.download_latest_binary(branch, &entry)
                .op("download latest binary")?;
        }

        let env = child_env(network, network_dir);

        if !self.platform.is_windows() {
            ensure_executable(&entry.binary)?;
        }

        run(&entry, args, &env)
    }

    fn download_latest_binary(&self, branch: &str, entry: &CacheEntry) -> Result<()> {
        let url = self.github.resolve_download_url(branch, &entry.commit)?;
        self.cache
            .populate(entry, &url, &self.fetcher, self.github.access_token())
    }
}

/// Add the owner execute bit when the archive did not carry it
#[cfg(unix)]
fn ensure_executable(binary: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(binary).map_err(|source| LauncherError::Exec {
        path: binary.to_path_buf(),
        source,
    })?;
    let mut permissions = metadata.permissions();
    if permissions.mode() & 0o100 == 0 {
        tracing::debug!("Making {} executable", binary.display());
        permissions.set_mode(0o755);
        std::fs::set_permissions(binary, permissions)
            .map_err(LauncherError::filesystem(binary))
            .op("chmod")?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_executable(_binary: &Path) -> Result<()> {
    Ok(())
}

fn run<S: AsRef<OsStr>>(
    entry: &CacheEntry,
    args: &[S],
    env: &BTreeMap<&'static str, OsString>,
) -> Result<ChildExit> {
    tracing::debug!(
        "[run] {} {}",
        entry.binary.display(),
        args.iter()
            .map(|arg| arg.as_ref().to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let status = Command::new(&entry.binary)
        .args(args)
        .envs(env)
        .current_dir(&entry.dir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|source| LauncherError::Exec {
            path: entry.binary.clone(),
            source,
        })
        .op("run")?;

    Ok(ChildExit::from(status))
}

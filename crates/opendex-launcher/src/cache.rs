// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Versioned binary cache keyed by commit
//!
//! Layout: `<versions root>/<commit>/{launcher|launcher.exe}`. A version
//! directory is populated once and never rewritten while its binary exists.

use crate::error::{LauncherError, OpContext, Result};
use crate::fetcher::{BinaryFetcher, extract_archive};
use crate::platform::{ARCHIVE_NAME, Platform};
use std::fs;
use std::path::{Path, PathBuf};

/// Written after an archive was fully extracted into a version directory
pub const COMPLETE_MARKER: &str = ".complete";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub commit: String,
    pub dir: PathBuf,
    pub binary: PathBuf,
    /// The binary exists, so no fetch is needed
    pub already_present: bool,
}

impl CacheEntry {
    pub fn archive_path(&self) -> PathBuf {
        self.dir.join(ARCHIVE_NAME)
    }

    pub fn marker_path(&self) -> PathBuf {
        self.dir.join(COMPLETE_MARKER)
    }

    /// Whether the last extraction into this directory ran to the end
    pub fn is_complete(&self) -> bool {
        self.marker_path().exists()
    }
}

#[derive(Debug, Clone)]
pub struct VersionCache {
    root: PathBuf,
    platform: Platform,
}

impl VersionCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            platform: Platform::current(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the versions root and its parents
    pub fn ensure_root(&self) -> Result<()> {
        create_dir_all(&self.root).op("mkdir")
    }

    pub fn resolve(&self, commit: &str) -> CacheEntry {
        let dir = self.root.join(commit);
        let binary = dir.join(self.platform.binary_name());
        let already_present = binary.is_file();
        CacheEntry {
            commit: commit.to_string(),
            dir,
            binary,
            already_present,
        }
    }

    /// Download the archive at `url` into the entry's directory and unpack it there
    pub fn populate(
        &self,
        entry: &CacheEntry,
        url: &str,
        fetcher: &BinaryFetcher,
        token: Option<&str>,
    ) -> Result<()> {
        if !entry.dir.exists() {
            create_dir_all(&entry.dir).op("create commit folder")?;
        }

        let marker = entry.marker_path();
        match fs::remove_file(&marker) {
            Ok(()) => tracing::debug!("Removed stale marker {}", marker.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(LauncherError::filesystem(&marker)(e)).op("remove completion marker");
            }
        }

        let archive = entry.archive_path();
        fetcher.download_to(url, &archive, token).op("download")?;
        let files = extract_archive(&archive, &entry.dir).op("unzip")?;

        fs::write(entry.marker_path(), b"")
            .map_err(LauncherError::filesystem(entry.marker_path()))
            .op("write completion marker")?;

        tracing::info!(
            "Extracted {} files for commit {} into {}",
            files.len(),
            entry.commit,
            entry.dir.display()
        );
        Ok(())
    }
}

fn create_dir_all(path: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }

    builder
        .create(path)
        .map_err(LauncherError::filesystem(path))
}

// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Error types for the launcher crate

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LauncherError {
    /// No matching branch, run or artifact on the remote side
    #[error("not found")]
    NotFound,

    #[error(
        "no launcher build for commit {commit} (The branch \"{branch}\" does not have a binary launcher)"
    )]
    NoLauncherBuild { branch: String, commit: String },

    /// Non-2xx response, carrying the remote error text
    #[error("{message}")]
    Transfer { status: u16, message: String },

    #[error("decode: {0}")]
    Decode(String),

    #[error("{}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Exec {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("config error: {0}")]
    Config(String),

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Failure of a named step, e.g. `download: unzip: ...`
    #[error("{op}: {source}")]
    Op {
        op: &'static str,
        #[source]
        source: Box<LauncherError>,
    },
}

impl LauncherError {
    /// True when the root cause is a missing branch, run or artifact.
    ///
    /// GitHub answers 422 for a commit lookup of an unknown branch.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound | Self::NoLauncherBuild { .. } => true,
            Self::Transfer { status, .. } => matches!(status, 404 | 422),
            Self::Op { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Innermost error below any `Op` wrapping.
    pub fn root(&self) -> &LauncherError {
        match self {
            Self::Op { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn filesystem(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Filesystem { path, source }
    }
}

impl From<serde_json::Error> for LauncherError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LauncherError>;

/// Wraps an error with the name of the operation that failed.
pub trait OpContext<T> {
    fn op(self, op: &'static str) -> Result<T>;
}

impl<T, E> OpContext<T> for std::result::Result<T, E>
where
    E: Into<LauncherError>,
{
    fn op(self, op: &'static str) -> Result<T> {
        self.map_err(|e| LauncherError::Op {
            op,
            source: Box::new(e.into()),
        })
    }
}

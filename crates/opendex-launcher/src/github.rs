// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! GitHub API lookups: head commits, CI runs and their artifacts

use crate::config::GitHubSettings;
use crate::error::{LauncherError, OpContext, Result};
use crate::platform::{Platform, is_release_ref};
use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, Response};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Repository that publishes the launcher builds
pub const REPO: &str = "opendexnetwork/opendex-docker";

/// Workflow whose runs carry the launcher artifacts
pub const BUILD_WORKFLOW: &str = "build.yml";

const API_ACCEPT: &str = "application/vnd.github.v3+json";

pub(crate) const USER_AGENT: &str = concat!("opendex-launcher/", env!("CARGO_PKG_VERSION"));

/// Blocking client shared by API lookups and archive downloads
///
/// Requests never time out; a slow download runs until the server closes it.
pub(crate) fn http_client() -> Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(None)
        .build()?)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub head_branch: String,
    pub head_sha: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct WorkflowRunList {
    #[serde(default)]
    total_count: u64,
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub size_in_bytes: u64,
    pub archive_download_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactList {
    #[serde(default)]
    total_count: u64,
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
struct CommitInfo {
    sha: String,
}

/// Error payload of a non-2xx API response; `message` is not guaranteed to be a string
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct GitHub {
    client: Client,
    settings: GitHubSettings,
    platform: Platform,
}

impl GitHub {
    pub fn new(settings: GitHubSettings) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            settings,
            platform: Platform::current(),
        })
    }

    /// Resolve names of artifacts and assets for another platform
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn access_token(&self) -> Option<&str> {
        self.settings.token()
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{REPO}/{path}",
            self.settings.api_base_url.trim_end_matches('/')
        )
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let response = self
            .client
            .get(url)
            .query(query)
            .header(ACCEPT, API_ACCEPT)
            .send()?;
        let body = check_response(response)?.text()?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Latest commit on `branch`
    pub fn resolve_head_commit(&self, branch: &str) -> Result<String> {
        let url = self.api_url(&format!("commits/{branch}"));
        let commit: CommitInfo = self.get_json(&url, &[])?;
        Ok(commit.sha)
    }

    /// Download URL of the launcher archive built from `commit` on `branch`
    ///
    /// Release tags map to a fixed asset URL without touching the API. Any
    /// other branch needs a successful run of the build workflow for exactly
    /// `commit`.
    pub fn resolve_download_url(&self, branch: &str, commit: &str) -> Result<String> {
        if is_release_ref(branch) {
            return Ok(self.release_asset_url(branch));
        }

        let run = match self.last_run_of_branch(branch, commit) {
            Ok(run) => run,
            Err(e) if e.is_not_found() => {
                return Err(LauncherError::NoLauncherBuild {
                    branch: branch.to_string(),
                    commit: commit.to_string(),
                });
            }
            Err(e) => return Err(e).op("get last run of branch"),
        };

        let url = self
            .artifact_download_url(run.id)
            .op("get download url")?;
        tracing::debug!("Download launcher.zip from {url}");
        Ok(url)
    }

    pub fn release_asset_url(&self, tag: &str) -> String {
        format!(
            "{}/{REPO}/releases/download/{tag}/{}",
            self.settings.download_base_url.trim_end_matches('/'),
            self.platform.release_asset_name()
        )
    }

    /// Most recent build run on `branch`, which must have been built from `commit`
    pub fn last_run_of_branch(&self, branch: &str, commit: &str) -> Result<WorkflowRun> {
        let url = self.api_url(&format!("actions/workflows/{BUILD_WORKFLOW}/runs"));
        let list: WorkflowRunList = self.get_json(&url, &[("branch", branch)])?;
        tracing::debug!(
            "Found {} build runs for branch {branch}",
            list.workflow_runs.len()
        );

        let run = list
            .workflow_runs
            .into_iter()
            .max_by_key(|run| run.created_at)
            .ok_or(LauncherError::NotFound)?;

        if run.head_sha != commit {
            tracing::debug!(
                "Latest run {} was built from {}, not {commit}",
                run.id,
                run.head_sha
            );
            return Err(LauncherError::NotFound);
        }
        Ok(run)
    }

    /// Archive URL of this platform's artifact in run `run_id`
    pub fn artifact_download_url(&self, run_id: u64) -> Result<String> {
        let url = self.api_url(&format!("actions/runs/{run_id}/artifacts"));
        let list: ArtifactList = self.get_json(&url, &[])?;

        let name = self.platform.artifact_name();
        list.artifacts
            .into_iter()
            .find(|artifact| artifact.name == name)
            .map(|artifact| artifact.archive_download_url)
            .ok_or(LauncherError::NotFound)
    }
}

/// Turn a non-2xx response into a `Transfer` error carrying the API message
fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text()?;
    let error: ApiErrorBody = serde_json::from_str(&body)?;
    let message = match error.message {
        Some(serde_json::Value::String(message)) => message,
        _ => status.to_string(),
    };
    Err(LauncherError::Transfer {
        status: status.as_u16(),
        message,
    })
}

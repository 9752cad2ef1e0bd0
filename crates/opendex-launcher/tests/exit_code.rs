// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Runs the `opendex-launcher` binary and checks its process exit code

#![cfg(target_os = "linux")]

use mockito::{Server, ServerGuard};
use serde_json::json;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const REPO_PATH: &str = "/repos/opendexnetwork/opendex-docker";

/// `$HOME/.opendex-docker` with a config pointing the API at `server`
fn launcher_home(user_home: &Path, server: &ServerGuard) -> PathBuf {
    let home = user_home.join(".opendex-docker");
    std::fs::create_dir_all(&home).unwrap();
    std::fs::write(
        home.join("opendexd-docker.conf"),
        format!("[GitHub]\napi-base-url = \"{}\"\n", server.url()),
    )
    .unwrap();
    home
}

fn cache_binary(home: &Path, commit: &str, script: &str) {
    let dir = home.join("launcher").join("versions").join(commit);
    std::fs::create_dir_all(&dir).unwrap();
    let binary = dir.join("launcher");
    std::fs::write(&binary, script).unwrap();
    std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn run_launcher(user_home: &Path, branch: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_opendex-launcher"))
        .arg("status")
        .env("HOME", user_home)
        .env("BRANCH", branch)
        .env("NETWORK", "testnet")
        .output()
        .unwrap()
}

#[test]
fn test_process_exits_with_child_code() {
    let mut server = Server::new();
    let user_home = TempDir::new().unwrap();
    let home = launcher_home(user_home.path(), &server);
    cache_binary(&home, "abc123", "#!/bin/sh\necho \"$NETWORK $1\"\nexit 7\n");
    let commit = server
        .mock("GET", format!("{REPO_PATH}/commits/master").as_str())
        .with_status(200)
        .with_body(json!({ "sha": "abc123" }).to_string())
        .create();

    let output = run_launcher(user_home.path(), "master");

    assert_eq!(output.status.code(), Some(7));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "testnet status\n");
    commit.assert();
}

#[test]
fn test_process_exits_zero_on_child_success() {
    let mut server = Server::new();
    let user_home = TempDir::new().unwrap();
    let home = launcher_home(user_home.path(), &server);
    cache_binary(&home, "abc123", "#!/bin/sh\nexit 0\n");
    let _commit = server
        .mock("GET", format!("{REPO_PATH}/commits/master").as_str())
        .with_status(200)
        .with_body(json!({ "sha": "abc123" }).to_string())
        .create();

    let output = run_launcher(user_home.path(), "master");

    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_launch_error_exits_one() {
    let mut server = Server::new();
    let user_home = TempDir::new().unwrap();
    launcher_home(user_home.path(), &server);
    let _commit = server
        .mock("GET", format!("{REPO_PATH}/commits/gone").as_str())
        .with_status(422)
        .with_body(json!({ "message": "No commit found for SHA: gone" }).to_string())
        .create();

    let output = run_launcher(user_home.path(), "gone");

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(
        String::from_utf8_lossy(&output.stderr)
            .contains("ERROR: git head commit: No commit found for SHA: gone")
    );
}

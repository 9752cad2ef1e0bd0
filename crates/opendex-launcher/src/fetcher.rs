// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Launcher archive download and extraction

use crate::error::{LauncherError, OpContext, Result};
use crate::github::http_client;
use reqwest::blocking::Client;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Mode for archive entries that carry no unix permissions
const DEFAULT_FILE_MODE: u32 = 0o644;

#[derive(Debug)]
pub struct BinaryFetcher {
    client: Client,
}

impl BinaryFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: http_client()?,
        })
    }

    /// Download `url` into `dest`, replacing any existing file
    ///
    /// Returns the number of bytes written.
    pub fn download_to(&self, url: &str, dest: &Path, token: Option<&str>) -> Result<u64> {
        let mut request = self.client.get(url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let mut response = request.send().op("do request")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().op("read body")?;
            let message = if body.trim().is_empty() {
                status.to_string()
            } else {
                body
            };
            return Err(LauncherError::Transfer {
                status: status.as_u16(),
                message,
            });
        }

        let mut file = File::create(dest)
            .map_err(LauncherError::filesystem(dest))
            .op("create")?;
        let written = response.copy_to(&mut file).op("copy")?;
        tracing::debug!("Downloaded {written} bytes to {}", dest.display());
        Ok(written)
    }
}

/// Extract every entry of the zip at `archive_path` below `dest_dir`
///
/// Entries are written in archive order, one output file open at a time.
/// Entry names are used as-is: the archive comes from the resolved build and
/// is not checked for paths escaping `dest_dir`.
pub fn extract_archive(archive_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>> {
    let file = File::open(archive_path)
        .map_err(LauncherError::filesystem(archive_path))
        .op("open")?;
    let mut archive = ZipArchive::new(file).op("open reader")?;
    let mut extracted = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).op("read entry")?;
        let name = entry.name().to_owned();
        tracing::debug!("Extracting {name}");

        let target = dest_dir.join(&name);
        if entry.is_dir() {
            fs::create_dir_all(&target)
                .map_err(LauncherError::filesystem(&target))
                .op("mkdir all")?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(LauncherError::filesystem(parent))
                .op("mkdir all")?;
        }

        let mode = entry
            .unix_mode()
            .map_or(DEFAULT_FILE_MODE, |mode| mode & 0o7777);
        let mut out = create_truncated(&target, mode)
            .map_err(LauncherError::filesystem(&target))
            .op("open file")?;
        std::io::copy(&mut entry, &mut out)
            .map_err(LauncherError::filesystem(&target))
            .op("copy")?;

        extracted.push(target);
    }

    Ok(extracted)
}

fn create_truncated(path: &Path, mode: u32) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    options.open(path)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use mockito::Server;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    pub(crate) enum Entry<'a> {
        Dir(&'a str),
        File(&'a str, &'a [u8], u32),
    }

    /// Zip the given entries into an in-memory archive
    pub(crate) fn build_archive(entries: &[Entry<'_>]) -> Vec<u8> {
        let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for entry in entries {
            match entry {
                Entry::Dir(name) => {
                    writer
                        .add_directory(*name, SimpleFileOptions::default())
                        .unwrap();
                }
                Entry::File(name, content, mode) => {
                    let options = SimpleFileOptions::default().unix_permissions(*mode);
                    writer.start_file(*name, options).unwrap();
                    writer.write_all(content).unwrap();
                }
            }
        }
        writer.finish().unwrap().into_inner()
    }

    fn write_archive(dir: &Path, entries: &[Entry<'_>]) -> PathBuf {
        let path = dir.join("launcher.zip");
        fs::write(&path, build_archive(entries)).unwrap();
        path
    }

    #[test]
    fn test_extract_files_and_directories() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let archive = write_archive(
            src.path(),
            &[
                Entry::Dir("bin/"),
                Entry::File("bin/tool", b"#!/bin/sh\n", 0o755),
                Entry::File("launcher", b"binary", 0o755),
                Entry::File("docs/nested/readme.txt", b"hello", 0o644),
            ],
        );

        let extracted = extract_archive(&archive, dest.path()).unwrap();

        assert_eq!(extracted.len(), 3);
        assert_eq!(
            fs::read(dest.path().join("launcher")).unwrap(),
            b"binary".to_vec()
        );
        assert_eq!(
            fs::read_to_string(dest.path().join("docs/nested/readme.txt")).unwrap(),
            "hello"
        );
        assert!(dest.path().join("bin").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_preserves_mode() {
        use std::os::unix::fs::PermissionsExt;

        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let archive = write_archive(
            src.path(),
            &[
                Entry::File("launcher", b"binary", 0o755),
                Entry::File("notes.txt", b"text", 0o600),
            ],
        );

        extract_archive(&archive, dest.path()).unwrap();

        let mode = |name: &str| {
            fs::metadata(dest.path().join(name))
                .unwrap()
                .permissions()
                .mode()
                & 0o777
        };
        assert_eq!(mode("launcher") & 0o100, 0o100);
        assert_eq!(mode("notes.txt"), 0o600);
    }

    #[test]
    fn test_extract_truncates_existing_file() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::write(dest.path().join("launcher"), b"a much longer stale binary").unwrap();
        let archive = write_archive(src.path(), &[Entry::File("launcher", b"new", 0o755)]);

        extract_archive(&archive, dest.path()).unwrap();

        assert_eq!(fs::read(dest.path().join("launcher")).unwrap(), b"new".to_vec());
    }

    #[test]
    fn test_extract_leaves_siblings_untouched() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::create_dir(dest.path().join("c")).unwrap();
        fs::write(dest.path().join("c/keep.txt"), b"keep").unwrap();
        let archive = write_archive(src.path(), &[Entry::File("a/b.txt", b"b", 0o644)]);

        extract_archive(&archive, dest.path()).unwrap();

        let mut top: Vec<String> = fs::read_dir(dest.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        top.sort();
        assert_eq!(top, vec!["a".to_string(), "c".to_string()]);
        let in_a: Vec<_> = fs::read_dir(dest.path().join("a")).unwrap().collect();
        assert_eq!(in_a.len(), 1);
        assert_eq!(fs::read(dest.path().join("c/keep.txt")).unwrap(), b"keep".to_vec());
    }

    #[test]
    fn test_extract_rejects_non_zip() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let path = src.path().join("launcher.zip");
        fs::write(&path, b"Not Found").unwrap();

        let err = extract_archive(&path, dest.path()).unwrap_err();
        assert!(err.to_string().starts_with("open reader: archive: "));
    }

    #[test]
    fn test_download_to_writes_body() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/launcher.zip")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_body("zip-bytes")
            .create();
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("launcher.zip");
        fs::write(&dest, b"previous download that was longer").unwrap();

        let fetcher = BinaryFetcher::new().unwrap();
        let written = fetcher
            .download_to(
                &format!("{}/launcher.zip", server.url()),
                &dest,
                Some("secret"),
            )
            .unwrap();

        assert_eq!(written, 9);
        assert_eq!(fs::read(&dest).unwrap(), b"zip-bytes".to_vec());
        mock.assert();
    }

    #[test]
    fn test_download_survives_stall_longer_than_default_timeout() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/launcher.zip")
            .with_status(200)
            .with_chunked_body(|w| {
                w.write_all(b"zip-")?;
                w.flush()?;
                std::thread::sleep(std::time::Duration::from_secs(35));
                w.write_all(b"bytes")
            })
            .create();
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("launcher.zip");

        let written = BinaryFetcher::new()
            .unwrap()
            .download_to(&format!("{}/launcher.zip", server.url()), &dest, None)
            .unwrap();

        assert_eq!(written, 9);
        assert_eq!(fs::read(&dest).unwrap(), b"zip-bytes".to_vec());
        mock.assert();
    }

    #[test]
    fn test_download_to_without_token_sends_no_auth() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/launcher.zip")
            .match_header("authorization", mockito::Matcher::Missing)
            .with_status(200)
            .with_body("zip-bytes")
            .create();
        let dir = TempDir::new().unwrap();

        BinaryFetcher::new()
            .unwrap()
            .download_to(
                &format!("{}/launcher.zip", server.url()),
                &dir.path().join("launcher.zip"),
                None,
            )
            .unwrap();
        mock.assert();
    }

    #[test]
    fn test_download_error_carries_body() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", "/launcher.zip")
            .with_status(401)
            .with_body("Bad credentials")
            .create();
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("launcher.zip");

        let err = BinaryFetcher::new()
            .unwrap()
            .download_to(&format!("{}/launcher.zip", server.url()), &dest, None)
            .unwrap_err();

        assert!(matches!(err, LauncherError::Transfer { status: 401, .. }));
        assert_eq!(err.to_string(), "Bad credentials");
        assert!(!dest.exists());
    }

    #[test]
    fn test_download_error_with_empty_body_uses_status() {
        let mut server = Server::new();
        let _mock = server.mock("GET", "/launcher.zip").with_status(404).create();
        let dir = TempDir::new().unwrap();

        let err = BinaryFetcher::new()
            .unwrap()
            .download_to(
                &format!("{}/launcher.zip", server.url()),
                &dir.path().join("launcher.zip"),
                None,
            )
            .unwrap_err();

        assert_eq!(err.to_string(), "404 Not Found");
    }
}

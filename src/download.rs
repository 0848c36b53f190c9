//! Single-file download manager with collision-aware placement.
//!
//! Transfers are sequential and make exactly one attempt; a failed request
//! is reported through the [`Reporter`] and degrades to the original URL so
//! callers substituting paths into script text always receive a string.

use crate::error::Result;
use crate::events::Reporter;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// What to do when the target path already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Keep the existing file and skip the transfer.
    Skip,
    /// Transfer and overwrite the existing file.
    Replace,
    /// Transfer under a `{n}_` prefixed name that does not exist yet.
    Rename,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded,
    Skipped,
    Renamed(u32),
    Failed,
}

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub directory: PathBuf,
    /// Target file name; when absent it is derived from the final
    /// (post-redirect) response URL.
    pub file_name: Option<String>,
    pub policy: CollisionPolicy,
}

#[derive(Debug, Clone)]
pub struct DownloadResult {
    /// Path the file lives at, or the original URL when the transfer failed.
    pub local_path: String,
    pub outcome: DownloadOutcome,
}

impl DownloadResult {
    pub fn failed(&self) -> bool {
        self.outcome == DownloadOutcome::Failed
    }
}

/// Fetch `request.url` into `request.directory` under the request's
/// collision policy. Transport failures never abort the caller: they are
/// reported via the [`Reporter`] and the result carries the original URL.
pub async fn fetch(
    client: &reqwest::Client,
    reporter: &dyn Reporter,
    request: &DownloadRequest,
) -> DownloadResult {
    match try_fetch(client, reporter, request).await {
        Ok(result) => result,
        Err(error) => {
            tracing::warn!(url = %request.url, %error, "download failed");
            reporter.download_failed(&request.url, &error);
            DownloadResult {
                local_path: request.url.clone(),
                outcome: DownloadOutcome::Failed,
            }
        }
    }
}

async fn try_fetch(
    client: &reqwest::Client,
    reporter: &dyn Reporter,
    request: &DownloadRequest,
) -> Result<DownloadResult> {
    fs::create_dir_all(&request.directory).await?;

    // A Skip request with an explicit target name is decidable without
    // touching the network, so re-runs over a populated cache stay offline.
    if request.policy == CollisionPolicy::Skip {
        if let Some(name) = &request.file_name {
            let target = request.directory.join(name);
            if target.exists() {
                tracing::debug!(path = %target.display(), "already cached, skipping");
                reporter.skipped(name);
                return Ok(DownloadResult {
                    local_path: target.display().to_string(),
                    outcome: DownloadOutcome::Skipped,
                });
            }
        }
    }

    let mut response = client
        .get(&request.url)
        .send()
        .await?
        .error_for_status()?;

    // Redirects commonly change the served name, so derive it from the
    // final response URL rather than the request URL.
    let file_name = match &request.file_name {
        Some(name) => name.clone(),
        None => response_file_name(response.url()),
    };
    let target = request.directory.join(&file_name);

    let (target, outcome) = if target.exists() {
        match request.policy {
            CollisionPolicy::Skip => {
                tracing::debug!(path = %target.display(), "already cached, skipping");
                reporter.skipped(&file_name);
                return Ok(DownloadResult {
                    local_path: target.display().to_string(),
                    outcome: DownloadOutcome::Skipped,
                });
            }
            CollisionPolicy::Replace => (target, DownloadOutcome::Downloaded),
            CollisionPolicy::Rename => {
                let (renamed, suffix) = next_free_name(&request.directory, &file_name);
                (renamed, DownloadOutcome::Renamed(suffix))
            }
        }
    } else {
        (target, DownloadOutcome::Downloaded)
    };

    reporter.downloading(&file_name);
    tracing::debug!(url = %request.url, path = %target.display(), "downloading");

    // Stage the transfer next to the target so an interrupted stream never
    // leaves a truncated file at the final name.
    let staging = NamedTempFile::new_in(&request.directory)?;
    let mut file = fs::File::from_std(staging.reopen()?);
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);
    staging.persist(&target).map_err(|e| e.error)?;

    Ok(DownloadResult {
        local_path: target.display().to_string(),
        outcome,
    })
}

/// Smallest integer n >= 2 for which `{n}_{file_name}` is free in `directory`.
fn next_free_name(directory: &Path, file_name: &str) -> (PathBuf, u32) {
    let mut n = 2;
    loop {
        let candidate = directory.join(format!("{n}_{file_name}"));
        if !candidate.exists() {
            return (candidate, n);
        }
        n += 1;
    }
}

/// Last path segment of the resolved URL, or the host when the path is bare.
fn response_file_name(url: &reqwest::Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .unwrap_or_else(|| url.host_str().unwrap_or("download"))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_suffix_starts_at_two_and_counts_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.exe"), b"one").unwrap();

        let (path, suffix) = next_free_name(dir.path(), "a.exe");
        assert_eq!(path, dir.path().join("2_a.exe"));
        assert_eq!(suffix, 2);

        std::fs::write(&path, b"two").unwrap();
        let (path, suffix) = next_free_name(dir.path(), "a.exe");
        assert_eq!(path, dir.path().join("3_a.exe"));
        assert_eq!(suffix, 3);
    }

    #[test]
    fn file_name_from_url_strips_path_and_query() {
        let url = reqwest::Url::parse("http://host/dir/setup.exe?v=1").unwrap();
        assert_eq!(response_file_name(&url), "setup.exe");

        let bare = reqwest::Url::parse("http://host/").unwrap();
        assert_eq!(response_file_name(&bare), "host");
    }
}

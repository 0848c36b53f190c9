//! Depth-first mirroring of a package and its transitive dependencies.

use crate::api::Registry;
use crate::archive::PackageArchive;
use crate::download::{self, CollisionPolicy, DownloadRequest};
use crate::error::Result;
use crate::events::{NullReporter, Reporter};
use crate::rewrite;
use crate::variables::Variable;
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Entry rewritten inside each package archive.
const INSTALL_SCRIPT: &str = "tools/chocolateyInstall.ps1";

/// Mirrors packages into a local directory: downloads each `.nupkg`,
/// rewrites the URLs inside its install script to local copies, and
/// recurses over declared dependencies.
pub struct PackageCacher<R: Registry> {
    registry: R,
    client: reqwest::Client,
    reporter: Arc<dyn Reporter>,
}

impl<R: Registry + Sync> PackageCacher<R> {
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            client: reqwest::Client::new(),
            reporter: Arc::new(NullReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Mirror `name` and its transitive dependencies into `directory`.
    ///
    /// Traversal is depth-first and sequential. A package already visited
    /// in this run is not revisited, which also keeps dependency cycles
    /// from recursing forever. Metadata lookup failures abort the whole
    /// traversal; individual download failures are reported and leave the
    /// affected URL live in the script.
    pub async fn cache_package(
        &self,
        name: &str,
        directory: &Path,
        variables: &[Variable],
    ) -> Result<()> {
        let mut visited = HashSet::new();
        self.cache_recursive(name, directory, variables, &mut visited)
            .await
    }

    fn cache_recursive<'a>(
        &'a self,
        name: &'a str,
        directory: &'a Path,
        variables: &'a [Variable],
        visited: &'a mut HashSet<String>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if !visited.insert(name.to_lowercase()) {
                tracing::debug!(package = name, "already cached in this run");
                return Ok(());
            }

            self.reporter.caching_package(name);
            let descriptor = self.registry.resolve(name).await?;
            tracing::debug!(
                package = name,
                version = descriptor.version.as_deref().unwrap_or("?"),
                dependencies = descriptor.dependencies.len(),
                "resolved package"
            );

            // Archives are immutable by name+version, never re-downloaded.
            let archive_result = download::fetch(
                &self.client,
                self.reporter.as_ref(),
                &DownloadRequest {
                    url: descriptor.download_url.clone(),
                    directory: directory.to_path_buf(),
                    file_name: Some(nupkg_file_name(&descriptor.name, descriptor.version.as_deref())),
                    policy: CollisionPolicy::Skip,
                },
            )
            .await;

            if archive_result.failed() {
                tracing::warn!(package = name, "package archive unavailable, skipping rewrite");
            } else {
                self.rewrite_install_script(
                    &PathBuf::from(&archive_result.local_path),
                    &descriptor.name,
                    descriptor.version.as_deref(),
                    directory,
                    variables,
                )
                .await?;
            }

            for dependency in &descriptor.dependencies {
                self.cache_recursive(dependency, directory, variables, visited)
                    .await?;
            }

            Ok(())
        })
    }

    async fn rewrite_install_script(
        &self,
        archive_path: &Path,
        package_name: &str,
        version: Option<&str>,
        directory: &Path,
        variables: &[Variable],
    ) -> Result<()> {
        let archive = PackageArchive::open(archive_path);

        // Not every package carries an install script; nothing to rewrite.
        let Some(entry_name) = archive.find_entry(INSTALL_SCRIPT)? else {
            tracing::debug!(package = package_name, "no install script in archive");
            return Ok(());
        };

        let content = archive.read_text(&entry_name)?;
        let package_dir = directory.join(package_subdirectory(package_name, version));
        let rewritten = rewrite::rewrite_urls(
            &self.client,
            self.reporter.as_ref(),
            &content,
            variables,
            &package_dir,
        )
        .await?;

        archive.replace_text(&entry_name, &rewritten)
    }
}

fn nupkg_file_name(name: &str, version: Option<&str>) -> String {
    match version {
        Some(version) => format!("{name}.{version}.nupkg"),
        None => format!("{name}.nupkg"),
    }
}

fn package_subdirectory(name: &str, version: Option<&str>) -> String {
    match version {
        Some(version) => format!("{name}.{version}"),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_and_subdirectory_names_carry_the_version() {
        assert_eq!(nupkg_file_name("git", Some("2.44.0")), "git.2.44.0.nupkg");
        assert_eq!(nupkg_file_name("git", None), "git.nupkg");
        assert_eq!(package_subdirectory("git", Some("2.44.0")), "git.2.44.0");
        assert_eq!(package_subdirectory("git", None), "git");
    }
}

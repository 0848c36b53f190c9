//! Chocolatey community feed client.
//!
//! [`ChocoApi`] resolves a package name to its download URL, version, and
//! dependency list through the community repository's OData feed. The
//! [`Registry`] trait keeps that lookup swappable so the orchestrator can
//! be driven by a stub in tests.

use crate::error::{Result, StoreError};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

const CHOCO_API_BASE: &str = "https://community.chocolatey.org/api/v2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// The feed is an Atom payload. The pieces we need are flat, uniquely named
// elements, so they are mined with anchored patterns rather than a full
// XML parse.
static DOWNLOAD_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<content[^>]*src="([^"]+)""#).unwrap());
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<d:Version[^>]*>([^<]+)<").unwrap());
static DEPENDENCIES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<d:Dependencies[^>]*>([^<]*)<").unwrap());

/// Package metadata as reported by the repository feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: Option<String>,
    pub download_url: String,
    pub dependencies: Vec<String>,
}

/// Metadata lookup seam: package name in, descriptor out.
pub trait Registry {
    fn resolve(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<PackageDescriptor>> + Send;
}

/// Chocolatey community repository client.
pub struct ChocoApi {
    client: reqwest::Client,
    base_url: String,
}

impl ChocoApi {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("chocomirror/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: CHOCO_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl Registry for ChocoApi {
    async fn resolve(&self, name: &str) -> Result<PackageDescriptor> {
        let url = format!(
            "{}/Packages()?$filter=tolower(Id) eq '{}' and IsLatestVersion",
            self.base_url,
            name.to_lowercase()
        );
        tracing::debug!(package = name, %url, "resolving package metadata");

        let feed = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_package_feed(name, &feed)
            .ok_or_else(|| StoreError::PackageNotFound(name.to_string()))
    }
}

/// Extract a descriptor from one feed entry, or `None` when the feed holds
/// no matching package.
fn parse_package_feed(name: &str, feed: &str) -> Option<PackageDescriptor> {
    let download_url = DOWNLOAD_URL_RE.captures(feed)?[1].to_string();
    let version = VERSION_RE.captures(feed).map(|c| c[1].to_string());
    let dependencies = DEPENDENCIES_RE
        .captures(feed)
        .map(|c| parse_dependency_list(&c[1]))
        .unwrap_or_default();

    Some(PackageDescriptor {
        name: name.to_string(),
        version,
        download_url,
        dependencies,
    })
}

/// The feed packs dependencies as `id:versionRange:framework|id2:...`.
/// Framework-group separators have an empty id and are skipped; repeated
/// ids (one per target framework) are reported once, in feed order.
fn parse_dependency_list(raw: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    raw.split('|')
        .filter_map(|spec| spec.split(':').next())
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.to_lowercase()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xml:base="https://community.chocolatey.org/api/v2/">
  <entry>
    <id>https://community.chocolatey.org/api/v2/Packages(Id='git',Version='2.44.0')</id>
    <content type="application/zip" src="https://community.chocolatey.org/api/v2/package/git/2.44.0" />
    <m:properties>
      <d:Version>2.44.0</d:Version>
      <d:Dependencies>git.install:[2.44.0]:|chocolatey-core.extension:1.3.3:|git.install:[2.44.0]:net48</d:Dependencies>
    </m:properties>
  </entry>
</feed>"#;

    #[test]
    fn feed_entry_yields_descriptor() {
        let descriptor = parse_package_feed("git", FEED).unwrap();
        assert_eq!(
            descriptor.download_url,
            "https://community.chocolatey.org/api/v2/package/git/2.44.0"
        );
        assert_eq!(descriptor.version.as_deref(), Some("2.44.0"));
        assert_eq!(
            descriptor.dependencies,
            vec!["git.install", "chocolatey-core.extension"]
        );
    }

    #[test]
    fn empty_feed_is_not_found() {
        let feed = r#"<?xml version="1.0"?><feed></feed>"#;
        assert!(parse_package_feed("missing", feed).is_none());
    }

    #[test]
    fn dependency_list_skips_framework_group_entries() {
        assert_eq!(
            parse_dependency_list("a:1.0:|::net48|b::"),
            vec!["a", "b"]
        );
        assert!(parse_dependency_list("").is_empty());
    }
}

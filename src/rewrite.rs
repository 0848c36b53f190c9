//! URL scan-and-rewrite pass over install script text.
//!
//! Every quoted `http...` token in the script is one logical download site.
//! For each site the rewriter expands the template variables appearing in
//! the URL into every permutation, downloads each resolved combination, and
//! replaces the URL with a single templated local path that still carries
//! the unresolved placeholder tokens. The installer's own variable
//! substitution then picks the right cached file at install time.

use crate::download::{self, CollisionPolicy, DownloadRequest};
use crate::error::Result;
use crate::events::Reporter;
use crate::variables::{self, Binding, Variable};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// A `http...` run enclosed in quotes, not crossing quotes or line breaks.
static QUOTED_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"](http[^'"\r\n]*)['"]"#).unwrap());

/// Download every URL referenced by `content` into `target_dir` and return
/// the text with each URL replaced by its templated local path.
///
/// A URL whose every permutation fails to download is left untouched, so
/// the script keeps a live link instead of a broken local reference.
pub async fn rewrite_urls(
    client: &reqwest::Client,
    reporter: &dyn Reporter,
    content: &str,
    variables: &[Variable],
    target_dir: &Path,
) -> Result<String> {
    let (content, remaining) = variables::collapse_single_valued(content, variables);

    tokio::fs::create_dir_all(target_dir).await?;

    let mut rewritten = String::with_capacity(content.len());
    let mut last_end = 0;

    for captures in QUOTED_URL_RE.captures_iter(&content) {
        let url_match = captures.get(1).unwrap();
        let url = url_match.as_str();

        let relevant: Vec<Variable> = remaining
            .iter()
            .filter(|v| url.contains(&v.token()))
            .cloned()
            .collect();
        let permutations = variables::permutations(&relevant);

        // Distinct URLs can share a base file name. The whole family gets
        // its numeric prefix up front, so every permutation lands exactly
        // where the templated reference in the script says it does.
        let templated_name = free_family_name(
            target_dir,
            &templated_file_name(url, &relevant),
            &permutations,
        );
        let templated_path = target_dir.join(&templated_name).display().to_string();

        tracing::debug!(url, permutations = permutations.len(), "caching url");

        let mut any_succeeded = false;
        for permutation in &permutations {
            let request = DownloadRequest {
                url: variables::apply_bindings(url, permutation),
                directory: target_dir.to_path_buf(),
                file_name: Some(variables::apply_bindings(&templated_name, permutation)),
                policy: CollisionPolicy::Rename,
            };
            let result = download::fetch(client, reporter, &request).await;
            any_succeeded |= !result.failed();
        }

        rewritten.push_str(&content[last_end..url_match.start()]);
        if any_succeeded {
            rewritten.push_str(&templated_path);
        } else {
            rewritten.push_str(url);
        }
        last_end = url_match.end();
    }
    rewritten.push_str(&content[last_end..]);

    Ok(rewritten)
}

/// Templated on-disk name for one URL: the URL's base segment, prefixed
/// with the placeholder tokens of variables that appear elsewhere in the
/// URL. Variables already present in the base segment need no prefix, the
/// resolved name distinguishes their permutations on its own.
fn templated_file_name(url: &str, relevant: &[Variable]) -> String {
    let base = url_file_name(url).unwrap_or_else(|| "download".to_string());
    let prefix = variables::placeholder_prefix(
        relevant
            .iter()
            .filter(|v| !base.contains(&v.token()))
            .map(Variable::name),
    );
    format!("{prefix}{base}")
}

/// Last path segment of `url` with any query or fragment stripped.
fn url_file_name(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let after_scheme = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);
    let (_host, path) = after_scheme.split_once('/')?;
    let name = path.rsplit('/').next().unwrap_or("");
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Family name whose every resolved permutation is free in `directory`:
/// the name itself, or the smallest `{n}_` prefix with n >= 2 that makes
/// it so. Mirrors the download manager's rename rule, applied to the whole
/// family at once so the templated reference stays valid for each variant.
fn free_family_name(directory: &Path, name: &str, permutations: &[Vec<Binding>]) -> String {
    let is_free = |candidate: &str| {
        permutations
            .iter()
            .all(|p| !directory.join(variables::apply_bindings(candidate, p)).exists())
    };

    if is_free(name) {
        return name.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{n}_{name}");
        if is_free(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

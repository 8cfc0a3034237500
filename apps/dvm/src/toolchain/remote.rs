//! Remote version listings.
//!
//! Two sources are combined:
//!
//! - The Docker Store indexes (`download.docker.com/<os>/static/<channel>/<arch>/`),
//!   plain HTML directory listings scraped for `docker-<version>.<ext>` links.
//! - The GitHub releases of `moby/moby`, which cover the legacy releases that
//!   predate the store.
//!
//! The GitHub API base URL defaults to <https://api.github.com> and can be
//! redirected (used by tests).

use anyhow::{Context, Result, bail};
use regex::Regex;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use std::collections::HashSet;

use super::platform::Platform;
use super::policy::{Channel, DEFAULT_STORE_URL, ReleaseIndex};
use super::version::{Version, sort_versions};
use crate::errors::DvmError;

/// Default GitHub API endpoint.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Releases requested per GitHub API page (the API maximum).
const RELEASES_PER_PAGE: usize = 100;

/// Directory listings of the Docker Store release channels.
pub struct StoreIndex<'a> {
    client: &'a Client,
    base_url: String,
    platform: Platform,
}

impl<'a> StoreIndex<'a> {
    /// Creates an index reader for the default store or a mirror.
    ///
    /// Only the scheme and host of `mirror_url` are used.
    ///
    /// # Errors
    ///
    /// Returns an error if `mirror_url` cannot be parsed.
    pub fn new(client: &'a Client, mirror_url: Option<&str>, platform: Platform) -> Result<Self> {
        let base_url = match mirror_url.filter(|url| !url.is_empty()) {
            Some(mirror) => {
                let url = reqwest::Url::parse(mirror)
                    .with_context(|| format!("Unable to parse the mirror URL: {mirror}"))?;
                url.origin().ascii_serialization()
            }
            None => DEFAULT_STORE_URL.to_string(),
        };
        Ok(Self {
            client,
            base_url,
            platform,
        })
    }

    /// URL of the listing for `channel`.
    #[must_use]
    pub fn index_url(&self, channel: Channel) -> String {
        format!(
            "{}/{}/static/{channel}/{}/",
            self.base_url,
            self.platform.moby_os(),
            self.platform.docker_arch()
        )
    }
}

impl ReleaseIndex for StoreIndex<'_> {
    fn list_versions(&self, channel: Channel) -> Result<Vec<Version>> {
        let url = self.index_url(channel);
        tracing::debug!(%url, "listing {channel} releases");

        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("Unable to list {channel} releases at {url}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DvmError::http_status(&url, status.as_u16()).into());
        }
        let body = response
            .text()
            .with_context(|| format!("Unable to read the listing of {channel} releases at {url}"))?;

        let versions = parse_index(&body, self.platform.archive_extension())?;
        if versions.is_empty() {
            bail!("No valid {channel} versions were found at {url}");
        }
        Ok(versions)
    }
}

/// Extracts the versions linked from a store directory listing, sorted.
///
/// Links whose version is not semantic are skipped.
///
/// # Errors
///
/// Returns an error only if the link pattern fails to compile.
pub fn parse_index(html: &str, archive_extension: &str) -> Result<Vec<Version>> {
    let pattern = Regex::new(&format!(
        r#"href="docker-([^"]+){}""#,
        regex::escape(archive_extension)
    ))
    .context("Invalid index pattern")?;

    let mut versions: Vec<Version> = pattern
        .captures_iter(html)
        .map(|captures| Version::parse(&captures[1]))
        .filter(Version::has_semver)
        .collect();
    sort_versions(&mut versions);
    Ok(versions)
}

/// A GitHub release, as returned by the releases API.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Release {
    /// The release name, falling back to the tag.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.tag_name)
    }
}

/// Minimal client for the GitHub releases API.
pub struct GitHubClient<'a> {
    client: &'a Client,
    api_url: String,
    token: Option<String>,
}

impl<'a> GitHubClient<'a> {
    #[must_use]
    pub fn new(client: &'a Client, api_url: Option<&str>, token: Option<String>) -> Self {
        Self {
            client,
            api_url: api_url
                .unwrap_or(GITHUB_API_URL)
                .trim_end_matches('/')
                .to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        match &self.token {
            Some(token) => request.header(reqwest::header::AUTHORIZATION, format!("token {token}")),
            None => request,
        }
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .get(url)
            .send()
            .with_context(|| format!("Unable to query {url}"))?;
        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(anyhow::Error::new(DvmError::http_status(url, status.as_u16())).context(
                "Your GitHub API rate limit has been exceeded. \
                 Set the GITHUB_TOKEN environment variable or use the --github-token flag \
                 with a GitHub personal access token to increase the limit.",
            ));
        }
        if !status.is_success() {
            return Err(DvmError::http_status(url, status.as_u16()).into());
        }
        response
            .json()
            .with_context(|| format!("Unable to parse the response from {url}"))
    }

    /// Every release of `owner/repo`, following pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if a page cannot be fetched or parsed.
    pub fn list_releases(&self, owner: &str, repo: &str) -> Result<Vec<Release>> {
        let mut releases = Vec::new();
        for page in 1.. {
            let url = format!(
                "{}/repos/{owner}/{repo}/releases?per_page={RELEASES_PER_PAGE}&page={page}",
                self.api_url
            );
            let batch: Vec<Release> = self.get_json(&url)?;
            let done = batch.len() < RELEASES_PER_PAGE;
            releases.extend(batch);
            if done {
                break;
            }
        }
        Ok(releases)
    }

    /// The latest published release of `owner/repo`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the repository has no releases.
    pub fn latest_release(&self, owner: &str, repo: &str) -> Result<Release> {
        let url = format!("{}/repos/{owner}/{repo}/releases/latest", self.api_url);
        self.get_json(&url)
    }
}

/// Every Docker version that can be installed, sorted ascending.
///
/// Prereleases are included only when `include_prereleases` is set.
///
/// # Errors
///
/// Returns an error if any source cannot be listed.
pub fn list_available_versions(
    github: &GitHubClient<'_>,
    index: &dyn ReleaseIndex,
    include_prereleases: bool,
) -> Result<Vec<Version>> {
    let mut versions: Vec<Version> = github
        .list_releases("moby", "moby")
        .context("Unable to retrieve the list of Docker releases from GitHub")?
        .iter()
        .map(|release| Version::parse(release.display_name()))
        .filter(|version| version.has_semver() && (include_prereleases || !version.is_prerelease()))
        .collect();

    versions.extend(index.list_versions(Channel::Stable)?);
    if include_prereleases {
        versions.extend(index.list_versions(Channel::Test)?);
    }

    let mut seen = HashSet::new();
    versions.retain(|version| seen.insert(version.to_string()));
    sort_versions(&mut versions);
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::download::http_client;
    use crate::toolchain::platform::{Arch, Os};
    use mockito::Matcher;

    const LINUX: Platform = Platform::new(Os::Linux, Arch::X86_64);

    const STABLE_LISTING: &str = r#"<html><body>
<a href="docker-17.06.0-ce.tgz">docker-17.06.0-ce.tgz</a>
<a href="docker-17.03.0-ce.tgz">docker-17.03.0-ce.tgz</a>
<a href="docker-latest.tgz">docker-latest.tgz</a>
<a href="docker-17.06.1-ce.tgz">docker-17.06.1-ce.tgz</a>
</body></html>"#;

    fn rendered(versions: &[Version]) -> Vec<String> {
        versions.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parse_index_skips_non_semver_and_sorts() {
        let versions = parse_index(STABLE_LISTING, ".tgz").expect("Should parse");
        assert_eq!(
            rendered(&versions),
            vec!["17.03.0-ce", "17.06.0-ce", "17.06.1-ce"]
        );
    }

    #[test]
    fn parse_index_only_matches_platform_extension() {
        let html = r#"<a href="docker-17.06.0-ce.zip">x</a><a href="docker-17.06.1-ce.tgz">y</a>"#;
        assert_eq!(
            rendered(&parse_index(html, ".zip").expect("Should parse")),
            vec!["17.06.0-ce"]
        );
    }

    #[test]
    fn store_index_uses_mirror_origin() {
        let client = http_client().expect("Should build client");
        let index = StoreIndex::new(&client, Some("http://mirror.local:8080/builds"), LINUX)
            .expect("Should parse mirror");
        assert_eq!(
            index.index_url(Channel::Edge),
            "http://mirror.local:8080/linux/static/edge/x86_64/"
        );
    }

    #[test]
    fn store_index_lists_latest_edge() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/linux/static/edge/x86_64/")
            .with_status(200)
            .with_body(STABLE_LISTING)
            .create();

        let client = http_client().expect("Should build client");
        let index = StoreIndex::new(&client, Some(&server.url()), LINUX).expect("Should parse");
        let latest = index.latest(Channel::Edge).expect("Should list");

        mock.assert();
        assert_eq!(latest.to_string(), "17.06.1-ce");
    }

    #[test]
    fn store_index_without_versions_is_an_error() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/linux/static/stable/x86_64/")
            .with_status(200)
            .with_body("<html></html>")
            .create();

        let client = http_client().expect("Should build client");
        let index = StoreIndex::new(&client, Some(&server.url()), LINUX).expect("Should parse");
        let err = index.list_versions(Channel::Stable).expect_err("Should fail");
        assert!(err.to_string().contains("No valid stable versions were found"));
    }

    #[test]
    fn github_releases_are_paginated() {
        let mut server = mockito::Server::new();
        let first_page: Vec<serde_json::Value> = (0..RELEASES_PER_PAGE)
            .map(|i| serde_json::json!({ "tag_name": format!("v1.0.{i}"), "name": format!("v1.0.{i}") }))
            .collect();
        let page1 = server
            .mock("GET", "/repos/moby/moby/releases")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_status(200)
            .with_body(serde_json::Value::Array(first_page).to_string())
            .create();
        let page2 = server
            .mock("GET", "/repos/moby/moby/releases")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(200)
            .with_body(r#"[{"tag_name": "v1.13.1", "name": null}]"#)
            .create();

        let client = http_client().expect("Should build client");
        let github = GitHubClient::new(&client, Some(&server.url()), None);
        let releases = github.list_releases("moby", "moby").expect("Should list");

        page1.assert();
        page2.assert();
        assert_eq!(releases.len(), RELEASES_PER_PAGE + 1);
        assert_eq!(releases[RELEASES_PER_PAGE].display_name(), "v1.13.1");
    }

    #[test]
    fn github_token_is_sent() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/repos/howtowhale/dvm/releases/latest")
            .match_header("authorization", "token secret")
            .with_status(200)
            .with_body(r#"{"tag_name": "1.0.0", "name": "1.0.0"}"#)
            .create();

        let client = http_client().expect("Should build client");
        let github = GitHubClient::new(&client, Some(&server.url()), Some("secret".to_string()));
        let latest = github
            .latest_release("howtowhale", "dvm")
            .expect("Should fetch");

        mock.assert();
        assert_eq!(latest.tag_name, "1.0.0");
    }

    #[test]
    fn github_rate_limit_is_explained() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/repos/howtowhale/dvm/releases/latest")
            .with_status(403)
            .create();

        let client = http_client().expect("Should build client");
        let github = GitHubClient::new(&client, Some(&server.url()), None);
        let err = github
            .latest_release("howtowhale", "dvm")
            .expect_err("Should fail");
        assert!(err.to_string().contains("rate limit"));
    }

    /// Index that serves fixed stable and test listings.
    struct FixedIndex;

    impl ReleaseIndex for FixedIndex {
        fn list_versions(&self, channel: Channel) -> Result<Vec<Version>> {
            let listing: &[&str] = match channel {
                Channel::Stable => &["17.03.0-ce", "17.06.0-ce"],
                Channel::Test => &["17.07.0-ce-rc1"],
                Channel::Edge => &[],
            };
            Ok(listing.iter().map(|v| Version::parse(v)).collect())
        }
    }

    #[test]
    fn available_versions_merge_sources() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/repos/moby/moby/releases")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"[
                    {"tag_name": "v17.03.0-ce", "name": "v17.03.0-ce"},
                    {"tag_name": "v1.13.0-rc1", "name": "v1.13.0-rc1"},
                    {"tag_name": "v1.12.3", "name": ""},
                    {"tag_name": "docs-v1", "name": "docs"}
                ]"#,
            )
            .create();

        let client = http_client().expect("Should build client");
        let github = GitHubClient::new(&client, Some(&server.url()), None);

        let stable = list_available_versions(&github, &FixedIndex, false).expect("Should list");
        assert_eq!(
            rendered(&stable),
            vec!["1.12.3", "17.03.0-ce", "17.06.0-ce"]
        );

        let all = list_available_versions(&github, &FixedIndex, true).expect("Should list");
        assert_eq!(
            rendered(&all),
            vec![
                "1.12.3",
                "1.13.0-rc1",
                "17.03.0-ce",
                "17.06.0-ce",
                "17.07.0-ce-rc1"
            ]
        );
    }
}

//! Download policy: where a Docker release lives and how it is packaged.
//!
//! Docker moved its client binaries several times. The policy encodes that
//! history:
//!
//! | Version          | Location                                         | Archived | Checksum |
//! |------------------|--------------------------------------------------|----------|----------|
//! | `< 1.11.0`       | `get.docker.com/builds/<OS>/<arch>/docker-<v>`   | no       | yes      |
//! | `< 17.06.0`      | `get.docker.com/builds/<OS>/<arch>/docker-<v>.tgz` | yes    | yes      |
//! | `>= 17.06.0`     | `download.docker.com/<os>/static/<channel>/<arch>/docker-<v>.tgz` | yes | no |
//! | `edge`           | as above on the `edge` channel, latest build     | yes      | no       |
//!
//! Prereleases come from `test.docker.com` or the `test` channel. A mirror
//! URL replaces `https://get.docker.com/builds` for legacy releases and the
//! scheme and host of `https://download.docker.com` for store releases.

use anyhow::{Context, Result, bail};
use std::fmt;

use super::platform::Platform;
use super::version::Version;

/// Default host for Docker Store releases.
pub const DEFAULT_STORE_URL: &str = "https://download.docker.com";

/// Legacy stable releases.
pub const LEGACY_STABLE_URL: &str = "https://get.docker.com/builds";

/// Legacy prereleases.
pub const LEGACY_TEST_URL: &str = "https://test.docker.com/builds";

/// Release channel a version is published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Stable,
    Test,
    Edge,
}

impl Channel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Test => "test",
            Self::Edge => "edge",
        }
    }

    /// The channel `version` is published on.
    #[must_use]
    pub fn for_version(version: &Version) -> Self {
        if version.is_edge() {
            Self::Edge
        } else if version.is_prerelease() {
            Self::Test
        } else {
            Self::Stable
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where to fetch a release and how to unpack it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadDescriptor {
    pub url: String,
    pub archived: bool,
    pub checksummed: bool,
    pub channel: Channel,
}

/// Lists the versions published on a release channel.
pub trait ReleaseIndex {
    /// Returns every version on `channel`, sorted ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be fetched or holds no versions.
    fn list_versions(&self, channel: Channel) -> Result<Vec<Version>>;

    /// Returns the newest version on `channel`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be fetched or holds no versions.
    fn latest(&self, channel: Channel) -> Result<Version> {
        self.list_versions(channel)?
            .pop()
            .with_context(|| format!("No valid {channel} versions were found"))
    }
}

/// Maps versions to download locations for one platform and mirror.
#[derive(Debug, Clone)]
pub struct DownloadPolicy {
    platform: Platform,
    mirror_url: Option<String>,
}

impl DownloadPolicy {
    #[must_use]
    pub fn new(platform: Platform, mirror_url: Option<String>) -> Self {
        let mirror_url = mirror_url
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        Self {
            platform,
            mirror_url,
        }
    }

    /// Path of the Docker binary inside a release archive.
    #[must_use]
    pub fn archived_entry(&self) -> String {
        format!("docker/docker{}", self.platform.executable_extension())
    }

    /// Pins `edge` to the latest published edge build; other versions are
    /// returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge listing cannot be read.
    pub fn resolve(&self, version: &Version, index: &dyn ReleaseIndex) -> Result<Version> {
        if !version.is_edge() {
            return Ok(version.clone());
        }
        let mut latest = index
            .latest(Channel::Edge)
            .context("Unable to find the latest edge release")?;
        latest.set_as_edge();
        Ok(latest)
    }

    /// Resolves `version` and describes where to download it.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge lookup fails or the version has no
    /// semantic version to build a URL from.
    pub fn build_download_url(
        &self,
        version: &Version,
        index: &dyn ReleaseIndex,
    ) -> Result<DownloadDescriptor> {
        let resolved = self.resolve(version, index)?;
        self.descriptor(&resolved, Channel::for_version(&resolved))
    }

    /// Describes where `version` lives on `channel`.
    ///
    /// `version` must carry a semantic version; resolve `edge` first.
    ///
    /// # Errors
    ///
    /// Returns an error if `version` has no semantic version or the mirror URL
    /// is invalid.
    pub fn descriptor(&self, version: &Version, channel: Channel) -> Result<DownloadDescriptor> {
        let Some(semver) = version.semver() else {
            bail!("Unable to determine a download location for {version}");
        };
        let value = semver.display();

        if version.should_use_docker_store() {
            let base = match &self.mirror_url {
                Some(mirror) => mirror_origin(mirror)?,
                None => DEFAULT_STORE_URL.to_string(),
            };
            return Ok(DownloadDescriptor {
                url: format!(
                    "{base}/{}/static/{channel}/{}/docker-{value}{}",
                    self.platform.moby_os(),
                    self.platform.docker_arch(),
                    self.platform.archive_extension(),
                ),
                archived: true,
                checksummed: false,
                channel,
            });
        }

        let base = match (&self.mirror_url, channel) {
            (Some(mirror), _) => mirror.as_str(),
            (None, Channel::Stable) => LEGACY_STABLE_URL,
            (None, Channel::Test | Channel::Edge) => LEGACY_TEST_URL,
        };
        let archived = version.should_use_archived_release();
        let extension = if archived {
            self.platform.archive_extension()
        } else {
            ""
        };

        Ok(DownloadDescriptor {
            url: format!(
                "{base}/{}/{}/docker-{value}{extension}",
                self.platform.docker_os(),
                self.platform.docker_arch(),
            ),
            archived,
            checksummed: true,
            channel,
        })
    }

    /// The single retry allowed after a stable download returns 404: the same
    /// version on the test channel.
    ///
    /// There is no retry when the test channel resolves to the URL that just
    /// failed, as it does for legacy releases behind a mirror.
    #[must_use]
    pub fn fallback(
        &self,
        version: &Version,
        failed: &DownloadDescriptor,
    ) -> Option<DownloadDescriptor> {
        if failed.channel != Channel::Stable {
            return None;
        }
        self.descriptor(version, Channel::Test)
            .ok()
            .filter(|retry| retry.url != failed.url)
    }
}

/// `scheme://host[:port]` of a mirror URL.
fn mirror_origin(mirror: &str) -> Result<String> {
    let url = reqwest::Url::parse(mirror)
        .with_context(|| format!("Unable to parse the mirror URL: {mirror}"))?;
    if !url.has_host() {
        bail!("Unable to parse the mirror URL: {mirror}");
    }
    Ok(url.origin().ascii_serialization())
}

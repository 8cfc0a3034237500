//! Docker client version model.
//!
//! A [`Version`] is either a semantic version, a named alias, an alias bound to
//! a semantic version, or empty. The pseudo-versions `system` and `edge` are
//! aliases with special meaning: `system` is whatever Docker was on `PATH`
//! before dvm touched it, `edge` is the latest build published on the edge
//! channel.
//!
//! Docker publishes versions such as `17.03.0-ce` whose components carry
//! leading zeroes. Those are not valid semver, so the raw string is kept for
//! display and a normalized copy is used for comparisons.

use std::cmp::Ordering;
use std::fmt;

/// Alias for the Docker installation found on the original `PATH`.
pub const SYSTEM_ALIAS: &str = "system";

/// Alias for the latest edge channel build.
pub const EDGE_ALIAS: &str = "edge";

/// Legacy spelling of [`EDGE_ALIAS`].
pub const EXPERIMENTAL_ALIAS: &str = "experimental";

/// Releases from this version onward are published as archives.
pub const ARCHIVED_RELEASE_CUTOFF: semver::Version = semver::Version::new(1, 11, 0);

/// Releases from this version onward are published on the Docker Store.
pub const DOCKER_STORE_CUTOFF: semver::Version = semver::Version::new(17, 6, 0);

const PRERELEASE_MARKERS: [&str; 3] = ["rc", "alpha", "beta"];

/// A semantic version that remembers how it was written.
#[derive(Debug, Clone)]
pub struct SemanticVersion {
    raw: String,
    parsed: semver::Version,
}

impl SemanticVersion {
    /// Parses `value`, accepting a leading `v` and zero-padded components.
    ///
    /// Returns `None` when the value is not a semantic version.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let unprefixed = strip_v_prefix(value);
        let parsed = semver::Version::parse(&normalize_numeric_identifiers(unprefixed)).ok()?;
        Some(Self {
            raw: value.to_string(),
            parsed,
        })
    }

    /// The version as written, minus any leading `v`.
    #[must_use = "returns the display string without side effects"]
    pub fn display(&self) -> &str {
        strip_v_prefix(&self.raw)
    }

    /// The normalized semver value.
    #[must_use]
    pub fn parsed(&self) -> &semver::Version {
        &self.parsed
    }

    /// Returns `true` when the prerelease tag marks an rc, alpha or beta build.
    ///
    /// Docker's own `-ce`/`-ee` suffixes are prerelease tags in semver terms
    /// but denote stable builds.
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        let pre = self.parsed.pre.as_str();
        PRERELEASE_MARKERS.iter().any(|marker| pre.contains(marker))
    }

    /// Compares by precedence; build metadata is ignored.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        self.parsed.cmp_precedence(&other.parsed)
    }

    /// Compares the release number only, so `17.06.0-ce` counts as 17.06.0.
    fn at_least(&self, cutoff: &semver::Version) -> bool {
        let v = &self.parsed;
        (v.major, v.minor, v.patch) >= (cutoff.major, cutoff.minor, cutoff.patch)
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}

fn strip_v_prefix(value: &str) -> &str {
    value
        .strip_prefix('v')
        .or_else(|| value.strip_prefix('V'))
        .unwrap_or(value)
}

/// Removes leading zeroes from purely numeric identifiers so that
/// `17.03.0-ce` parses as `17.3.0-ce`.
fn normalize_numeric_identifiers(value: &str) -> String {
    let (main, build) = match value.split_once('+') {
        Some((main, build)) => (main, Some(build)),
        None => (value, None),
    };
    let (core, pre) = match main.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (main, None),
    };

    let strip = |ident: &str| -> String {
        if ident.len() > 1 && ident.bytes().all(|b| b.is_ascii_digit()) {
            let trimmed = ident.trim_start_matches('0');
            let digits = if trimmed.is_empty() { "0" } else { trimmed };
            digits.to_string()
        } else {
            ident.to_string()
        }
    };

    let mut normalized = core.split('.').map(strip).collect::<Vec<_>>().join(".");
    if let Some(pre) = pre {
        normalized.push('-');
        normalized.push_str(&pre.split('.').map(strip).collect::<Vec<_>>().join("."));
    }
    if let Some(build) = build {
        normalized.push('+');
        normalized.push_str(build);
    }
    normalized
}

/// A Docker client version as understood by dvm.
#[derive(Debug, Clone, Default)]
pub enum Version {
    /// No version was given.
    #[default]
    Empty,
    /// A plain semantic version such as `1.12.3` or `17.03.0-ce`.
    Semantic(SemanticVersion),
    /// A name without a known semantic version, e.g. `system` or `prod`.
    Alias(String),
    /// A name resolved to a semantic version, e.g. `edge (17.06.0-ce)`.
    AliasedSemantic {
        alias: String,
        semver: SemanticVersion,
    },
}

impl Version {
    /// Parses a user supplied version.
    ///
    /// The empty string yields [`Version::Empty`]; anything that is not a
    /// semantic version is treated as an alias.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.is_empty() {
            return Self::Empty;
        }
        match SemanticVersion::parse(value) {
            Some(semver) => Self::Semantic(semver),
            None => Self::Alias(value.to_string()),
        }
    }

    /// Creates a version named `alias` that points at `value`.
    #[must_use]
    pub fn new_alias(alias: &str, value: &str) -> Self {
        Self::parse(value).with_alias(alias)
    }

    fn with_alias(self, alias: &str) -> Self {
        if alias.is_empty() {
            return self.without_alias();
        }
        match self {
            Self::Semantic(semver) | Self::AliasedSemantic { semver, .. } => Self::AliasedSemantic {
                alias: alias.to_string(),
                semver,
            },
            Self::Empty | Self::Alias(_) => Self::Alias(alias.to_string()),
        }
    }

    fn without_alias(self) -> Self {
        match self {
            Self::Semantic(semver) | Self::AliasedSemantic { semver, .. } => Self::Semantic(semver),
            Self::Empty | Self::Alias(_) => Self::Empty,
        }
    }

    /// Returns the alias, if any.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        match self {
            Self::Alias(alias) | Self::AliasedSemantic { alias, .. } => Some(alias),
            Self::Empty | Self::Semantic(_) => None,
        }
    }

    /// Returns the semantic version, if any.
    #[must_use]
    pub fn semver(&self) -> Option<&SemanticVersion> {
        match self {
            Self::Semantic(semver) | Self::AliasedSemantic { semver, .. } => Some(semver),
            Self::Empty | Self::Alias(_) => None,
        }
    }

    #[must_use]
    pub fn has_semver(&self) -> bool {
        self.semver().is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    #[must_use]
    pub fn is_alias(&self) -> bool {
        self.alias().is_some()
    }

    #[must_use]
    pub fn is_system(&self) -> bool {
        self.alias() == Some(SYSTEM_ALIAS)
    }

    #[must_use]
    pub fn is_edge(&self) -> bool {
        matches!(self.alias(), Some(EDGE_ALIAS | EXPERIMENTAL_ALIAS))
    }

    /// Marks this version as the system installation, keeping its semver.
    pub fn set_as_system(&mut self) {
        *self = std::mem::take(self).with_alias(SYSTEM_ALIAS);
    }

    /// Marks this version as the edge build, keeping its semver.
    pub fn set_as_edge(&mut self) {
        *self = std::mem::take(self).with_alias(EDGE_ALIAS);
    }

    /// Returns `true` for rc, alpha and beta builds.
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        self.semver().is_some_and(SemanticVersion::is_prerelease)
    }

    /// Edge builds and everything from 1.11.0 onward ship as archives.
    #[must_use]
    pub fn should_use_archived_release(&self) -> bool {
        self.is_edge()
            || self
                .semver()
                .is_some_and(|v| v.at_least(&ARCHIVED_RELEASE_CUTOFF))
    }

    /// Edge builds and everything from 17.06.0 onward live on the Docker Store.
    #[must_use]
    pub fn should_use_docker_store(&self) -> bool {
        self.is_edge()
            || self
                .semver()
                .is_some_and(|v| v.at_least(&DOCKER_STORE_CUTOFF))
    }

    /// The alias if present, otherwise the semantic version.
    #[must_use]
    pub fn name(&self) -> String {
        match self.alias() {
            Some(alias) => alias.to_string(),
            None => self.value(),
        }
    }

    /// The semantic version without a `v` prefix, or an empty string.
    #[must_use]
    pub fn value(&self) -> String {
        self.semver()
            .map(|v| v.display().to_string())
            .unwrap_or_default()
    }

    /// The directory name used for this version under the versions root.
    ///
    /// `system` has no directory of its own and yields an empty slug.
    #[must_use]
    pub fn slug(&self) -> String {
        if self.is_system() {
            String::new()
        } else if self.is_edge() {
            EDGE_ALIAS.to_string()
        } else {
            self.value()
        }
    }

    /// Total order used when listing versions.
    ///
    /// Versions with a semver sort by precedence and come before alias-only
    /// versions, which sort lexically. Ties on semver are broken by alias.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.semver(), other.semver()) {
            (Some(a), Some(b)) => a
                .compare(b)
                .then_with(|| self.alias().cmp(&other.alias())),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.alias().cmp(&other.alias()),
        }
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        let semver_match = match (self.semver(), other.semver()) {
            (Some(a), Some(b)) => a.compare(b) == Ordering::Equal,
            _ => false,
        };
        let alias_match = match (self.alias(), other.alias()) {
            (Some(a), Some(b)) => canonical_alias(a) == canonical_alias(b),
            _ => false,
        };
        (semver_match && self.is_system() == other.is_system()) || alias_match
    }
}

fn canonical_alias(alias: &str) -> &str {
    if alias == EXPERIMENTAL_ALIAS {
        EDGE_ALIAS
    } else {
        alias
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Semantic(semver) => write!(f, "{semver}"),
            Self::Alias(alias) => f.write_str(alias),
            Self::AliasedSemantic { alias, semver } => write!(f, "{alias} ({semver})"),
        }
    }
}

/// Sorts versions in place using [`Version::compare`].
pub fn sort_versions(versions: &mut [Version]) {
    versions.sort_by(Version::compare);
}

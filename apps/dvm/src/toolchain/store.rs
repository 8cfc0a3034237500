//! Installed versions and aliases.
//!
//! The store is the filesystem: every directory under the versions root is
//! an installed version named by its slug, and every file under the alias
//! directory is an alias whose content is the target version. The versions
//! of `edge`, `system` and whatever `docker` is currently on `PATH` are not
//! recorded anywhere; they are read from `docker -v` on demand.

use anyhow::{Context, Result, bail};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::activation::Activation;
use super::paths::{DOCKER_BINARY, DvmPaths};
use super::version::{SYSTEM_ALIAS, Version, sort_versions};

/// Matches the first line of `docker -v`.
const DOCKER_VERSION_PATTERN: &str = r"^Docker version (.+), build (.+)?";

/// Read access to installed versions and aliases.
pub struct VersionStore<'a> {
    paths: &'a DvmPaths,
}

impl<'a> VersionStore<'a> {
    #[must_use]
    pub fn new(paths: &'a DvmPaths) -> Self {
        Self { paths }
    }

    /// Installed versions whose directory name matches the glob `pattern`,
    /// sorted ascending.
    ///
    /// The edge directory reports the build it actually contains. When the
    /// pattern matches `system` and a Docker client exists on `PATH` outside
    /// the dvm tree, it is included as `system (<version>)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is invalid or the versions directory
    /// cannot be read.
    pub fn list_installed(&self, pattern: &str, path: &Activation) -> Result<Vec<Version>> {
        let mut versions = Vec::new();

        let search = format!(
            "{}{}{pattern}",
            glob::Pattern::escape(&self.paths.versions.to_string_lossy()),
            std::path::MAIN_SEPARATOR
        );
        for entry in glob::glob(&search).with_context(|| format!("Invalid pattern: {pattern}"))? {
            let dir = entry.context("Unable to read the installed versions")?;
            if !dir.is_dir() {
                continue;
            }
            let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let mut version = Version::parse(name);
            if version.is_edge() {
                match self.edge_version() {
                    Ok(edge) => version = edge,
                    Err(e) => tracing::debug!("Unable to determine the edge version: {e:#}"),
                }
            }
            versions.push(version);
        }

        let pattern = glob::Pattern::new(pattern).with_context(|| format!("Invalid pattern: {pattern}"))?;
        if pattern.matches(SYSTEM_ALIAS) {
            match self.system_version(path) {
                Ok(Some(system)) => versions.push(system),
                Ok(None) => tracing::debug!("No system docker found on PATH"),
                Err(e) => tracing::debug!("Unable to determine the system version: {e:#}"),
            }
        }

        sort_versions(&mut versions);
        Ok(versions)
    }

    /// Returns `true` if `version` is installed (or is an existing `system`).
    ///
    /// # Errors
    ///
    /// Returns an error if the installed versions cannot be listed.
    pub fn is_installed(&self, version: &Version, path: &Activation) -> Result<bool> {
        Ok(self
            .list_installed("*", path)?
            .iter()
            .any(|installed| installed == version))
    }

    #[must_use]
    pub fn alias_exists(&self, name: &str) -> bool {
        self.paths.alias_path(name).is_file()
    }

    /// Reads the alias `name`, returning `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the alias file exists but cannot be read.
    pub fn resolve_alias(&self, name: &str) -> Result<Option<Version>> {
        let alias_path = self.paths.alias_path(name);
        if !alias_path.is_file() {
            return Ok(None);
        }
        let target = std::fs::read_to_string(&alias_path)
            .with_context(|| format!("Unable to read alias {name}"))?;
        Ok(Some(Version::new_alias(name, target.trim())))
    }

    /// Points the alias `name` at `target`, replacing any previous target.
    ///
    /// # Errors
    ///
    /// Returns an error if the alias file cannot be written.
    pub fn write_alias(&self, name: &str, target: &Version) -> Result<()> {
        DvmPaths::ensure_dir(&self.paths.aliases)?;
        let alias_path = self.paths.alias_path(name);
        std::fs::write(&alias_path, target.value())
            .with_context(|| format!("Unable to create alias {name}"))
    }

    /// Deletes the alias `name`. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the alias file cannot be removed.
    pub fn remove_alias(&self, name: &str) -> Result<bool> {
        let alias_path = self.paths.alias_path(name);
        if !alias_path.is_file() {
            return Ok(false);
        }
        std::fs::remove_file(&alias_path).with_context(|| format!("Unable to remove alias {name}"))?;
        Ok(true)
    }

    /// Every alias and its target version string, sorted by name.
    ///
    /// Unreadable alias files are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the alias directory exists but cannot be listed.
    pub fn list_aliases(&self) -> Result<BTreeMap<String, String>> {
        let mut aliases = BTreeMap::new();
        if !self.paths.aliases.is_dir() {
            return Ok(aliases);
        }

        let entries = std::fs::read_dir(&self.paths.aliases).with_context(|| {
            format!("Unable to list aliases in {}", self.paths.aliases.display())
        })?;
        for entry in entries {
            let entry = entry.context("Unable to read alias directory entry")?;
            let name = entry.file_name().to_string_lossy().into_owned();
            match std::fs::read_to_string(entry.path()) {
                Ok(target) => {
                    aliases.insert(name, target.trim().to_string());
                }
                Err(e) => tracing::debug!("Excluding alias {name}: {e}"),
            }
        }
        Ok(aliases)
    }

    /// The `docker` binary that `PATH` currently resolves to.
    #[must_use]
    pub fn current_path(&self, path: &Activation) -> Option<PathBuf> {
        lookup(path.path())
    }

    /// The `docker` binary `PATH` resolves to once dvm's entries are removed.
    #[must_use]
    pub fn system_path(&self, path: &Activation) -> Option<PathBuf> {
        lookup(&path.without_managed_segments())
    }

    /// The version of the system Docker, if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the binary exists but its version cannot be read.
    pub fn system_version(&self, path: &Activation) -> Result<Option<Version>> {
        let Some(binary) = self.system_path(path) else {
            return Ok(None);
        };
        let mut version = binary_version(&binary, false)?;
        version.set_as_system();
        Ok(Some(version))
    }

    /// The version of the installed edge build, including its build hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge binary is missing or cannot be queried.
    pub fn edge_version(&self) -> Result<Version> {
        let binary = self.paths.edge_binary_path();
        if !binary.is_file() {
            bail!("The edge build is not installed");
        }
        let mut version = binary_version(&binary, true)?;
        version.set_as_edge();
        Ok(version)
    }

    /// The version of the `docker` currently on `PATH`, or
    /// [`Version::Empty`] when there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the binary cannot be queried.
    pub fn current_version(&self, path: &Activation) -> Result<Version> {
        let Some(current) = self.current_path(path) else {
            return Ok(Version::Empty);
        };

        if same_file(&current, &self.paths.edge_binary_path()) {
            let mut version = binary_version(&current, true)?;
            version.set_as_edge();
            return Ok(version);
        }

        let mut version = binary_version(&current, false)?;
        if self
            .system_path(path)
            .is_some_and(|system| same_file(&system, &current))
        {
            version.set_as_system();
        }
        Ok(version)
    }
}

fn lookup(search_path: &str) -> Option<PathBuf> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    which::which_in(DOCKER_BINARY, Some(search_path), cwd).ok()
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Runs `<binary> -v` and parses the reported version.
///
/// With `include_build` the build hash is kept as semver build metadata,
/// which distinguishes successive edge builds of the same version.
///
/// # Errors
///
/// Returns an error if the binary cannot be run or prints something that is
/// not a Docker version line.
pub fn binary_version(binary: &Path, include_build: bool) -> Result<Version> {
    let output = Command::new(binary)
        .arg("-v")
        .output()
        .with_context(|| format!("Unable to run {}", binary.display()))?;
    if !output.status.success() {
        bail!(
            "{} -v exited with {}",
            binary.display(),
            output.status
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_docker_version_output(&stdout, include_build)?.with_context(|| {
        format!(
            "Unable to parse the version reported by {}: {}",
            binary.display(),
            stdout.trim()
        )
    })
}

/// Parses `Docker version 17.06.0-ce, build 02c1d87`.
///
/// # Errors
///
/// Returns an error only if the version pattern fails to compile.
pub fn parse_docker_version_output(output: &str, include_build: bool) -> Result<Option<Version>> {
    let pattern = Regex::new(DOCKER_VERSION_PATTERN).context("Invalid docker version pattern")?;
    let Some(captures) = pattern.captures(output.trim_start()) else {
        return Ok(None);
    };

    let mut value = captures[1].trim().to_string();
    if include_build && let Some(build) = captures.get(2) {
        let build = build.as_str().trim();
        if !build.is_empty() {
            value = format!("{value}+{build}");
        }
    }
    Ok(Some(Version::parse(&value)))
}

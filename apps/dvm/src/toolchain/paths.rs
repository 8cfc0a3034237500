//! Path management for dvm.
//!
//! The default root directory is `~/.dvm/`, which can be overridden with
//! `--dvm-dir` or the `DVM_DIR` environment variable.
//!
//! ## Directory Structure
//!
//! ```text
//! ~/.dvm/                     # Root directory (or DVM_DIR)
//!   bin/docker/               # Versions root
//!     1.12.3/docker           # One directory per installed version
//!     17.06.0-ce/docker
//!     edge/docker             # Latest edge build
//!   alias/                    # One file per alias, holding the target version
//!     prod
//!   .tmp/                     # Downloads in flight and the activation script
//!     dvm-output.sh
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::platform::Platform;
use super::shell::Shell;
use super::version::Version;

/// Name of the managed binary, without extension.
pub const DOCKER_BINARY: &str = "docker";

/// On-disk locations derived from the dvm root directory.
#[derive(Debug, Clone)]
pub struct DvmPaths {
    /// Root directory (usually `~/.dvm`).
    pub root: PathBuf,
    /// Parent of every installed version directory.
    pub versions: PathBuf,
    /// Alias files.
    pub aliases: PathBuf,
    /// Scratch space for downloads and the activation script.
    pub tmp: PathBuf,
    platform: Platform,
}

impl DvmPaths {
    /// Creates paths rooted at `root`.
    #[must_use]
    pub fn with_root(root: PathBuf, platform: Platform) -> Self {
        Self {
            versions: root.join("bin").join(DOCKER_BINARY),
            aliases: root.join("alias"),
            tmp: root.join(".tmp"),
            root,
            platform,
        }
    }

    /// The default root, `~/.dvm`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_root() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".dvm"))
    }

    /// File name of the Docker binary on this platform.
    #[must_use]
    pub fn binary_name(&self) -> String {
        format!("{DOCKER_BINARY}{}", self.platform.executable_extension())
    }

    /// Installation directory for `version`.
    #[must_use]
    pub fn version_dir(&self, version: &Version) -> PathBuf {
        self.versions.join(version.slug())
    }

    /// Path of the Docker binary for `version`.
    #[must_use]
    pub fn binary_path(&self, version: &Version) -> PathBuf {
        self.version_dir(version).join(self.binary_name())
    }

    /// Path of the edge build's binary.
    #[must_use]
    pub fn edge_binary_path(&self) -> PathBuf {
        self.binary_path(&Version::parse(super::version::EDGE_ALIAS))
    }

    #[must_use]
    pub fn alias_path(&self, name: &str) -> PathBuf {
        self.aliases.join(name)
    }

    /// Script the shell wrapper sources after every invocation.
    #[must_use]
    pub fn output_script(&self, shell: Shell) -> PathBuf {
        self.tmp
            .join(format!("dvm-output.{}", shell.script_extension()))
    }

    /// Creates `dir` and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn ensure_dir(dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))
    }
}

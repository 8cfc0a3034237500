//! PATH activation.
//!
//! dvm owns exactly one kind of `PATH` entry: a directory directly under the
//! versions root (`~/.dvm/bin/docker/<slug>`). Activating a version removes
//! every such entry and puts the chosen version's directory first. The new
//! value is handed back to the calling shell through the activation script
//! (see [`super::shell`]).
//!
//! The engine works on a copy of `PATH`; the process environment is never
//! modified. Lookups that must ignore dvm's entries (finding the system
//! Docker) use [`Activation::without_managed_segments`].

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use super::platform::Platform;
use super::shell::Shell;

/// Name of the search path variable.
pub const PATH_VAR: &str = "PATH";

/// A `PATH` value and the rules for recognizing dvm's entries in it.
#[derive(Debug, Clone)]
pub struct Activation {
    platform: Platform,
    versions_root: String,
    path: String,
}

impl Activation {
    /// Creates an engine for `path` with dvm versions under `versions_root`.
    #[must_use]
    pub fn new(platform: Platform, versions_root: &Path, path: impl Into<String>) -> Self {
        let separators = dir_separators(platform);
        let versions_root = versions_root
            .to_string_lossy()
            .trim_end_matches(separators)
            .to_string();
        Self {
            platform,
            versions_root,
            path: path.into(),
        }
    }

    /// Creates an engine for the current process's `PATH`.
    #[must_use]
    pub fn from_env(platform: Platform, versions_root: &Path) -> Self {
        let path = std::env::var_os(PATH_VAR)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(platform, versions_root, path)
    }

    /// The current `PATH` value.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns `true` when `segment` is the versions root plus exactly one
    /// path component.
    #[must_use]
    pub fn is_managed(&self, segment: &str) -> bool {
        let separators = dir_separators(self.platform);
        let segment = segment.trim_end_matches(separators);

        let Some(rest) = self.strip_versions_root(segment) else {
            return false;
        };
        let Some(component) = rest.strip_prefix(separators) else {
            return false;
        };
        !component.is_empty() && !component.contains(separators)
    }

    fn strip_versions_root<'a>(&self, segment: &'a str) -> Option<&'a str> {
        let root = self.versions_root.as_str();
        if self.platform.is_windows() {
            let head = segment.get(..root.len())?;
            head.eq_ignore_ascii_case(root)
                .then(|| &segment[root.len()..])
        } else {
            segment.strip_prefix(root)
        }
    }

    /// `PATH` with every dvm-managed entry removed.
    #[must_use]
    pub fn without_managed_segments(&self) -> String {
        let separator = self.platform.path_list_separator();
        self.path
            .split(separator)
            .filter(|segment| !self.is_managed(segment))
            .collect::<Vec<_>>()
            .join(&separator.to_string())
    }

    /// Removes every dvm-managed entry. Idempotent.
    pub fn remove_managed_segments(&mut self) {
        self.path = self.without_managed_segments();
    }

    /// Puts `dir` at the front of `PATH`.
    pub fn prepend(&mut self, dir: &Path) {
        let dir = dir.to_string_lossy();
        self.path = if self.path.is_empty() {
            dir.into_owned()
        } else {
            format!("{dir}{}{}", self.platform.path_list_separator(), self.path)
        };
    }

    /// Makes `version_dir` the active version, or deactivates dvm when `None`.
    pub fn activate(&mut self, version_dir: Option<&Path>) {
        self.remove_managed_segments();
        if let Some(dir) = version_dir {
            self.prepend(dir);
        }
    }

    /// Renders the script line that exports the current `PATH`.
    #[must_use]
    pub fn render(&self, shell: Shell) -> String {
        shell.render_export(PATH_VAR, &self.path)
    }
}

fn dir_separators(platform: Platform) -> &'static [char] {
    if platform.is_windows() {
        &['\\', '/']
    } else {
        &['/']
    }
}

/// Appends `contents` to the activation script at `script_path`.
///
/// The wrapper deletes the script after sourcing it, so several commands run
/// in one invocation (e.g. `detect` followed by `use`) accumulate lines.
///
/// # Errors
///
/// Returns an error if the script cannot be created or written.
pub fn write_script(script_path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = script_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(script_path)
        .with_context(|| format!("Failed to open {}", script_path.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write {}", script_path.display()))?;

    tracing::debug!(script = %script_path.display(), "wrote activation script");
    Ok(())
}

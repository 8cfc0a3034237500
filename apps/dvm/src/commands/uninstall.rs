//! Uninstall command for the dvm CLI.
//!
//! Removes an installed Docker client. The active version cannot be removed.
//!
//! ## Usage
//!
//! ```bash
//! dvm uninstall 1.12.3
//! ```

use anyhow::{Context, Result};
use clap::Args;

use super::{current_or_empty, required_version};
use crate::config::Options;
use crate::errors::DvmError;
use crate::toolchain::{Activation, Version};

/// Arguments for the uninstall command.
#[derive(Args)]
pub struct UninstallArgs {
    /// Version to uninstall (e.g., "1.12.3" or "edge").
    pub version: Option<String>,
}

/// Executes the uninstall command.
///
/// # Errors
///
/// Returns an error if no version was given, the version is active, or the
/// directory cannot be removed.
pub fn execute(args: &UninstallArgs, options: &Options) -> Result<()> {
    let version = required_version(
        args.version.as_deref(),
        "The uninstall command requires that a version is specified.",
    )?;
    tracing::debug!("dvm uninstall {version}");
    uninstall(options, &options.activation(), &version)
}

/// Removes `version`; a version that is not installed only warns.
///
/// # Errors
///
/// Returns an error if `version` is `system`, names no version directory, is
/// currently active, or if the directory cannot be removed.
pub fn uninstall(options: &Options, path: &Activation, version: &Version) -> Result<()> {
    let console = options.console();

    if version.is_system() {
        return Err(DvmError::invalid_operation(
            "The system Docker is not managed by dvm and cannot be uninstalled.",
        )
        .into());
    }
    if !version.has_semver() && !version.is_edge() {
        return Err(DvmError::invalid_argument(format!(
            "{version} is not a Docker version."
        ))
        .into());
    }

    let current = current_or_empty(&options.store(), path);
    if current == *version {
        return Err(DvmError::invalid_operation(
            "Cannot uninstall the currently active Docker version.",
        )
        .into());
    }

    let version_dir = options.paths.version_dir(version);
    if !version_dir.is_dir() {
        console.warning(format!("{version} is not installed."));
        return Ok(());
    }

    std::fs::remove_dir_all(&version_dir).with_context(|| {
        format!(
            "Unable to uninstall Docker version {version} located in {}",
            version_dir.display()
        )
    })?;

    console.info(format!("Uninstalled Docker {version}."));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{fake_install, options};
    use crate::errors::exit_code_for;

    fn path_for(options: &Options, value: &str) -> Activation {
        Activation::new(options.platform, &options.paths.versions, value)
    }

    #[test]
    fn removes_version_directory() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let options = options(temp.path());
        let dir = fake_install(&options, "1.12.3");

        uninstall(
            &options,
            &path_for(&options, "/nonexistent/bin"),
            &Version::parse("1.12.3"),
        )
        .expect("Should uninstall");

        assert!(!dir.exists());
        assert!(options.paths.versions.exists());
    }

    #[test]
    fn missing_version_only_warns() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let options = options(temp.path());

        uninstall(
            &options,
            &path_for(&options, "/nonexistent/bin"),
            &Version::parse("1.12.3"),
        )
        .expect("Should succeed");
    }

    #[test]
    fn system_is_refused() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let options = options(temp.path());
        fake_install(&options, "1.12.3");

        let err = uninstall(
            &options,
            &path_for(&options, "/nonexistent/bin"),
            &Version::parse("system"),
        )
        .expect_err("Should fail");

        assert_eq!(exit_code_for(&err), 3);
        assert!(options.paths.versions.join("1.12.3").exists());
    }

    #[test]
    fn unknown_name_is_invalid_argument() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let options = options(temp.path());
        let first = fake_install(&options, "1.12.3");
        let second = fake_install(&options, "17.06.0-ce");

        let err = uninstall(
            &options,
            &path_for(&options, "/nonexistent/bin"),
            &Version::parse("typo"),
        )
        .expect_err("Should fail");

        assert_eq!(exit_code_for(&err), 127);
        assert!(first.exists());
        assert!(second.exists());
    }

    #[cfg(unix)]
    #[test]
    fn active_version_is_refused() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("Should create temp dir");
        let options = options(temp.path());
        let dir = fake_install(&options, "17.06.0-ce");
        let docker = dir.join("docker");
        std::fs::write(
            &docker,
            "#!/bin/sh\necho 'Docker version 17.06.0-ce, build 02c1d87'\n",
        )
        .expect("Should write script");
        std::fs::set_permissions(&docker, std::fs::Permissions::from_mode(0o755))
            .expect("Should chmod");

        let err = uninstall(
            &options,
            &path_for(&options, &dir.display().to_string()),
            &Version::parse("17.06.0-ce"),
        )
        .expect_err("Should fail");

        assert_eq!(exit_code_for(&err), 3);
        assert!(dir.exists());
    }
}

//! Install command for the dvm CLI.
//!
//! Downloads a Docker client into `~/.dvm/bin/docker/<version>` and switches
//! the calling shell to it.
//!
//! ## Usage
//!
//! ```bash
//! dvm install 17.06.0-ce   # Install a specific version
//! dvm install edge         # Install (or refresh) the latest edge build
//! DOCKER_VERSION=1.12.3 dvm install
//! ```

use anyhow::{Context, Result};
use clap::Args;

use super::{required_version, use_cmd};
use crate::config::{MirrorArgs, Options};
use crate::errors::DvmError;
use crate::toolchain::{Version, download_release};

const MISSING_VERSION: &str = "The install command requires that a version is specified \
                               or the DOCKER_VERSION environment variable is set.";

/// Arguments for the install command.
#[derive(Args)]
pub struct InstallArgs {
    /// Version to install, e.g. 17.06.0-ce or edge. Defaults to $DOCKER_VERSION.
    #[arg(env = "DOCKER_VERSION")]
    pub version: Option<String>,

    #[command(flatten)]
    pub mirror: MirrorArgs,
}

/// Executes the install command.
///
/// An already installed version is not downloaded again; dvm switches to it
/// instead.
///
/// # Errors
///
/// Returns an error if no version was given, the version is not published,
/// or the download or activation fails.
pub fn execute(args: &InstallArgs, options: &Options) -> Result<()> {
    let version = required_version(args.version.as_deref(), MISSING_VERSION)?;
    tracing::debug!("dvm install {version}");

    install(options, &version)?;
    use_cmd::activate(options, &mut options.activation(), &version)
}

/// Downloads `version` unless it is already installed.
///
/// `edge` is always downloaded afresh so it tracks the newest build.
///
/// # Errors
///
/// Returns an error if the version cannot be installed.
pub fn install(options: &Options, version: &Version) -> Result<()> {
    let console = options.console();

    if version.is_system() {
        return Err(DvmError::invalid_operation(
            "The system Docker is not managed by dvm and cannot be installed.",
        )
        .into());
    }
    if !version.has_semver() && !version.is_edge() {
        return Err(DvmError::invalid_argument(format!(
            "{version} is not a Docker version or a known alias."
        ))
        .into());
    }

    let version_dir = options.paths.version_dir(version);
    if version.is_edge() && version_dir.exists() {
        std::fs::remove_dir_all(&version_dir).with_context(|| {
            format!("Unable to remove edge version at {}", version_dir.display())
        })?;
    }

    if version_dir.exists() {
        console.warning(format!("{version} is already installed"));
        return Ok(());
    }

    console.info(format!("Installing {version}..."));

    let client = options.http_client()?;
    let index = options.store_index(&client)?;
    let downloader = options.downloader(client.clone());
    let (resolved, binary) = download_release(
        &options.paths,
        &options.download_policy(),
        &downloader,
        &index,
        version,
    )?;

    tracing::debug!("Downloaded Docker {resolved} to {}", binary.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{fake_install, options};
    use crate::errors::exit_code_for;

    #[test]
    fn installed_version_is_not_downloaded() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let mut options = options(temp.path());
        // Any request would fail against this address.
        options.mirror_url = Some("http://127.0.0.1:9".to_string());
        let dir = fake_install(&options, "17.06.0-ce");

        install(&options, &Version::parse("17.06.0-ce")).expect("Should succeed");
        assert!(dir.join("docker").exists());
    }

    #[test]
    fn system_cannot_be_installed() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let err = install(&options(temp.path()), &Version::parse("system"))
            .expect_err("Should fail");
        assert_eq!(exit_code_for(&err), 3);
    }

    #[test]
    fn unknown_alias_is_invalid_argument() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let err = install(&options(temp.path()), &Version::parse("prod"))
            .expect_err("Should fail");
        assert_eq!(exit_code_for(&err), 127);
    }

    #[test]
    fn checksum_failure_installs_nothing() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/Linux/x86_64/docker-1.10.3")
            .with_status(200)
            .with_body("binary")
            .create();
        server
            .mock("GET", "/Linux/x86_64/docker-1.10.3.sha256")
            .with_status(200)
            .with_body("e1a7ad6c6e5b2a3b2bfb7e3c0e33bcb8b6bd2c2a8f1f0bbd5a1cb6d0a5fd2b59")
            .create();

        let temp = tempfile::tempdir().expect("Should create temp dir");
        let mut options = options(temp.path());
        options.mirror_url = Some(server.url());

        let err = install(&options, &Version::parse("1.10.3")).expect_err("Should fail");

        mock.assert();
        assert!(format!("{err:#}").contains("Checksum mismatch"));
        assert!(!options.paths.version_dir(&Version::parse("1.10.3")).join("docker").exists());
    }

    #[test]
    fn edge_directory_is_replaced() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/linux/static/edge/x86_64/")
            .with_status(500)
            .create();

        let temp = tempfile::tempdir().expect("Should create temp dir");
        let mut options = options(temp.path());
        options.mirror_url = Some(server.url());
        let dir = fake_install(&options, "edge");

        let err = install(&options, &Version::parse("edge")).expect_err("Should fail");

        assert!(format!("{err:#}").contains("edge"));
        assert!(!dir.exists());
    }
}

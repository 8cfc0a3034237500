//! Upgrade command for the dvm CLI.
//!
//! Replaces dvm with another release published on GitHub.
//!
//! ## Usage
//!
//! ```bash
//! dvm upgrade                  # Upgrade to the latest release
//! dvm upgrade --check          # Only report whether an upgrade exists
//! dvm upgrade --version 1.0.0  # Install a specific release
//! ```
//!
//! On Windows a running executable cannot be overwritten, so the new binary
//! is staged in `~/.dvm/.tmp` and the wrapper copies it into place through
//! the activation script.
//!
//! Package managers that ship dvm build it with `DVM_UPGRADE_DISABLED=true`,
//! which turns this command off.

use anyhow::{Context, Result};
use clap::Args;

use super::emit;
use crate::config::Options;
use crate::errors::DvmError;
use crate::toolchain::{Downloader, GitHubClient, Shell};

/// Where dvm releases are published.
pub const RELEASE_DOWNLOAD_URL: &str = "https://howtowhale.github.io/dvm/downloads";

/// Version of the running binary.
pub const DVM_VERSION: &str = env!("CARGO_PKG_VERSION");

const UPGRADE_DISABLED: &str = env!("DVM_UPGRADE_DISABLED");

/// Arguments for the upgrade command.
#[derive(Args)]
pub struct UpgradeArgs {
    /// Check whether a newer version of dvm is available without upgrading.
    #[arg(long)]
    pub check: bool,

    /// Upgrade to this version instead of the latest release.
    #[arg(long)]
    pub version: Option<String>,
}

/// Returns `true` when this build was made without self-upgrade.
#[must_use]
pub fn upgrade_disabled() -> bool {
    UPGRADE_DISABLED.eq_ignore_ascii_case("true")
}

/// Executes the upgrade command.
///
/// # Errors
///
/// Returns an error if upgrades are disabled, the latest release cannot be
/// queried, or the download fails.
pub fn execute(args: &UpgradeArgs, options: &Options) -> Result<()> {
    if upgrade_disabled() {
        return Err(DvmError::invalid_operation(
            "Upgrade is disabled for this build of dvm. Use your package manager to upgrade.",
        )
        .into());
    }

    let console = options.console();
    let requested = args
        .version
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if requested.is_some_and(|v| strip_v(v) == DVM_VERSION) {
        console.warning(format!("dvm {DVM_VERSION} is already installed."));
        return Ok(());
    }

    let client = options.http_client()?;
    let target = match requested {
        Some(version) => version.to_string(),
        None => match newer_release(&options.github(&client), DVM_VERSION)? {
            Some(latest) => latest,
            None => {
                console.info("The latest version of dvm is already installed.");
                return Ok(());
            }
        },
    };

    if args.check {
        console.info(format!(
            "dvm {target} is available. Run `dvm upgrade` to install the latest version."
        ));
        return Ok(());
    }

    console.info(format!("Upgrading to dvm {target}..."));
    upgrade_to(options, &options.downloader(client), RELEASE_DOWNLOAD_URL, &target)
}

/// The latest release tag, exactly as published, if it is newer than
/// `current`.
///
/// # Errors
///
/// Returns an error if the release cannot be fetched or either version is
/// not semantic.
pub fn newer_release(github: &GitHubClient<'_>, current: &str) -> Result<Option<String>> {
    let release = github
        .latest_release("howtowhale", "dvm")
        .context("Unable to query the latest dvm release from GitHub")?;
    let tag = release.tag_name.trim();

    let current_version = semver::Version::parse(strip_v(current))
        .with_context(|| format!("Unable to parse the current dvm version: {current}"))?;
    let latest_version = semver::Version::parse(strip_v(tag))
        .with_context(|| format!("Unable to parse the latest dvm version: {tag}"))?;

    Ok((latest_version > current_version).then(|| tag.to_string()))
}

/// `version` without a single leading `v`.
fn strip_v(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}

/// `<base>/<version>/<parts...>`.
#[must_use]
pub fn release_url(base: &str, version: &str, parts: &[&str]) -> String {
    format!(
        "{}/{version}/{}",
        base.trim_end_matches('/'),
        parts.join("/")
    )
}

/// Downloads dvm `version` from `base` into the dvm home directory.
///
/// # Errors
///
/// Returns an error if a download fails, the binary checksum does not match,
/// or the activation script cannot be written.
pub fn upgrade_to(
    options: &Options,
    downloader: &Downloader,
    base: &str,
    version: &str,
) -> Result<()> {
    let platform = options.platform;
    let paths = &options.paths;
    let binary_name = format!("dvm-helper{}", platform.executable_extension());
    let binary_url = release_url(
        base,
        version,
        &[platform.docker_os(), platform.docker_arch(), &binary_name],
    );
    let installed_binary = paths.root.join("dvm-helper").join(&binary_name);

    if platform.is_windows() {
        let staged = paths.tmp.join(&binary_name);
        downloader.download_file_with_checksum(&binary_url, &staged)?;
        for script in ["dvm.ps1", "dvm.cmd"] {
            downloader.download_file(
                &release_url(base, version, &[script]),
                &paths.root.join(script),
            )?;
        }
        emit(options, &copy_command(options.shell, &staged, &installed_binary))?;
    } else {
        downloader.download_file_with_checksum(&binary_url, &installed_binary)?;
        downloader.download_file(
            &release_url(base, version, &["dvm.sh"]),
            &paths.root.join("dvm.sh"),
        )?;
    }

    tracing::debug!("Installed dvm {version} to {}", installed_binary.display());
    Ok(())
}

fn copy_command(shell: Shell, from: &std::path::Path, to: &std::path::Path) -> String {
    match shell {
        Shell::Cmd => format!("copy /Y \"{}\" \"{}\"\r\n", from.display(), to.display()),
        Shell::Powershell | Shell::Sh => format!(
            "Copy-Item -Force '{}' '{}'\r\n",
            from.display(),
            to.display()
        ),
    }
}

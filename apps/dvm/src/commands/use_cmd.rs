//! Use command for the dvm CLI.
//!
//! Switches the calling shell to a Docker version by rewriting `PATH` in the
//! activation script. Missing versions are installed first.
//!
//! ## Usage
//!
//! ```bash
//! dvm use 17.06.0-ce   # A specific version
//! dvm use prod         # An alias
//! dvm use system       # The Docker found outside ~/.dvm
//! dvm use edge         # The installed edge build
//! ```

use anyhow::Result;
use clap::Args;

use super::{emit, install, required_version};
use crate::config::{MirrorArgs, Options};
use crate::errors::DvmError;
use crate::toolchain::{Activation, Version, VersionStore};

const MISSING_VERSION: &str = "The use command requires that a version is specified \
                               or the DOCKER_VERSION environment variable is set.";

/// Arguments for the use command.
#[derive(Args)]
pub struct UseArgs {
    /// Version, alias, `system` or `edge`. Defaults to $DOCKER_VERSION.
    #[arg(env = "DOCKER_VERSION")]
    pub version: Option<String>,

    #[command(flatten)]
    pub mirror: MirrorArgs,

    /// Do not check whether the version is installed (use with caution).
    #[arg(long, env = "DVM_NOCHECK")]
    pub nocheck: bool,
}

/// Executes the use command.
///
/// # Errors
///
/// Returns an error if no version was given, it cannot be installed, or the
/// activation script cannot be written.
pub fn execute(args: &UseArgs, options: &Options) -> Result<()> {
    let version = required_version(args.version.as_deref(), MISSING_VERSION)?;
    tracing::debug!("dvm use {version}");
    activate(options, &mut options.activation(), &version)
}

/// Makes `version` the active Docker client in `path` and writes the new
/// `PATH` to the activation script.
///
/// # Errors
///
/// Returns an error if the version is neither a Docker version nor a known
/// alias, if it is not installed and cannot be, if `system` is requested but
/// no system Docker exists, or if the script cannot be written.
pub fn activate(options: &Options, path: &mut Activation, version: &Version) -> Result<()> {
    let store = options.store();
    let mut version = resolve_alias(&store, version)?;
    if !version.has_semver() && !version.is_system() && !version.is_edge() {
        return Err(DvmError::invalid_argument(format!(
            "{version} is not a Docker version or a known alias."
        ))
        .into());
    }

    if !options.no_check {
        ensure_installed(options, &store, path, &version)?;
    }

    if version.is_system() {
        version = store.system_version(path)?.ok_or_else(|| {
            DvmError::invalid_operation("No system installation of Docker was found.")
        })?;
    } else if version.is_edge() {
        match store.edge_version() {
            Ok(edge) => version = edge,
            Err(e) => tracing::debug!("Unable to query the edge build: {e:#}"),
        }
    }

    let version_dir = (!version.is_system()).then(|| options.paths.version_dir(&version));
    path.activate(version_dir.as_deref());
    emit(options, &path.render(options.shell))?;

    options.console().info(format!("Now using Docker {version}"));
    Ok(())
}

fn resolve_alias(store: &VersionStore<'_>, version: &Version) -> Result<Version> {
    if let Some(name) = version.alias()
        && !version.is_system()
        && !version.is_edge()
        && let Some(aliased) = store.resolve_alias(name)?
    {
        tracing::debug!("Using alias: {aliased}");
        return Ok(aliased);
    }
    Ok(version.clone())
}

fn ensure_installed(
    options: &Options,
    store: &VersionStore<'_>,
    path: &Activation,
    version: &Version,
) -> Result<()> {
    if store.is_installed(version, path)? {
        return Ok(());
    }
    if version.is_system() {
        return Err(
            DvmError::invalid_operation("No system installation of Docker was found.").into(),
        );
    }

    options
        .console()
        .info(format!("{version} is not installed. Installing now..."));
    install::install(options, version)
}

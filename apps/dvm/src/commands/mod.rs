//! Command modules for the dvm CLI.
//!
//! Each subcommand exposes an `execute` function taking its parsed arguments
//! (if any) and the invocation's [`Options`].
//!
//! ## Version Commands
//!
//! - [`install`] - Download a Docker client and switch to it
//! - [`uninstall`] - Remove an installed client
//! - [`use_cmd`] - Switch the calling shell to a version
//! - [`deactivate`] - Remove dvm from the calling shell's `PATH`
//! - [`current`] / [`which`] - Inspect the active client
//! - [`list`] / [`list_remote`] - Installed and available versions
//! - [`detect`] - Match the client to the connected daemon
//!
//! ## Alias Commands
//!
//! - [`alias`] - `alias`, `unalias` and `list-alias`
//!
//! ## Self Management
//!
//! - [`upgrade`] - Update dvm itself

pub mod alias;
pub mod current;
pub mod deactivate;
pub mod detect;
pub mod install;
pub mod list;
pub mod list_remote;
pub mod uninstall;
pub mod upgrade;
pub mod use_cmd;
pub mod which;

use anyhow::Result;

use crate::config::Options;
use crate::errors::DvmError;
use crate::toolchain::{Activation, Version, VersionStore};

/// Parses a required version argument, treating blank input as missing.
///
/// # Errors
///
/// Returns [`DvmError::InvalidArgument`] with `missing` when no version was
/// given.
pub(crate) fn required_version(value: Option<&str>, missing: &str) -> Result<Version> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(DvmError::invalid_argument(missing).into());
    }
    Ok(Version::parse(value))
}

/// The active version, or [`Version::Empty`] when it cannot be determined.
pub(crate) fn current_or_empty(store: &VersionStore<'_>, path: &Activation) -> Version {
    store.current_version(path).unwrap_or_else(|e| {
        tracing::debug!("Unable to determine the current version: {e:#}");
        Version::Empty
    })
}

/// Writes `contents` to the activation script for this invocation.
pub(crate) fn emit(options: &Options, contents: &str) -> Result<()> {
    crate::toolchain::write_script(&options.output_script(), contents)
}

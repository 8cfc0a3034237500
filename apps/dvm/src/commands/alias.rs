//! Alias commands for the dvm CLI.
//!
//! An alias is a file under `~/.dvm/alias/` holding the version it points at.
//!
//! ## Usage
//!
//! ```bash
//! dvm alias prod 1.12.3   # Create or replace an alias
//! dvm unalias prod        # Remove it
//! dvm list-alias          # Show every alias
//! ```

use anyhow::Result;
use clap::Args;

use crate::config::Options;
use crate::errors::DvmError;
use crate::toolchain::{Activation, Version};

/// Arguments for the alias command.
#[derive(Args)]
pub struct AliasArgs {
    /// Name of the alias.
    pub name: Option<String>,

    /// Installed version the alias points at.
    pub version: Option<String>,
}

/// Arguments for the unalias command.
#[derive(Args)]
pub struct UnaliasArgs {
    /// Name of the alias to remove.
    pub name: Option<String>,
}

/// Executes the alias command.
///
/// # Errors
///
/// Returns an error if either argument is missing, the target is not an
/// installed version, or the alias file cannot be written.
pub fn execute_alias(args: &AliasArgs, options: &Options) -> Result<()> {
    let name = args.name.as_deref().map(str::trim).unwrap_or_default();
    let value = args.version.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() || value.is_empty() {
        return Err(DvmError::invalid_argument(
            "The alias command requires both an alias name and a version.",
        )
        .into());
    }
    tracing::debug!("dvm alias {name} {value}");
    alias(options, &options.activation(), name, value)
}

/// Points `name` at the installed version `value`.
///
/// # Errors
///
/// Returns an error if `name` is reserved or not a plain file name, `value`
/// is not an installed semantic version, or the alias cannot be written.
pub fn alias(options: &Options, path: &Activation, name: &str, value: &str) -> Result<()> {
    validate_name(name)?;

    let target = Version::new_alias(name, value);
    if !target.has_semver() {
        return Err(DvmError::invalid_argument(format!(
            "Aliases must point at a semantic version, not {value}."
        ))
        .into());
    }
    if !options.store().is_installed(&target, path)? {
        return Err(DvmError::invalid_operation(format!(
            "The aliased version, {value}, is not installed."
        ))
        .into());
    }

    let store = options.store();
    if store.alias_exists(name) {
        tracing::debug!("Overwriting existing alias {name}");
    }
    store.write_alias(name, &target)?;

    options.console().info(format!("Aliased {name} to {value}."));
    Ok(())
}

fn validate_name(name: &str) -> Result<()> {
    let reserved = Version::parse(name);
    if reserved.is_system() || reserved.is_edge() || reserved.has_semver() {
        return Err(DvmError::invalid_argument(format!(
            "{name} cannot be used as an alias name."
        ))
        .into());
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(DvmError::invalid_argument(format!("Invalid alias name: {name}")).into());
    }
    Ok(())
}

/// Executes the unalias command.
///
/// # Errors
///
/// Returns an error if no name is given or the alias file cannot be removed.
pub fn execute_unalias(args: &UnaliasArgs, options: &Options) -> Result<()> {
    let name = args.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(DvmError::invalid_argument("The unalias command requires an alias name.").into());
    }
    tracing::debug!("dvm unalias {name}");

    let console = options.console();
    if options.store().remove_alias(name)? {
        console.info(format!("Removed alias {name}"));
    } else {
        console.warning(format!("{name} is not an alias."));
    }
    Ok(())
}

/// Executes the list-alias command.
///
/// # Errors
///
/// Returns an error if the alias directory cannot be read.
pub fn execute_list(options: &Options) -> Result<()> {
    tracing::debug!("dvm list-alias");
    let console = options.console();
    for (name, target) in options.store().list_aliases()? {
        console.info(format!("\t{name} -> {target}"));
    }
    Ok(())
}

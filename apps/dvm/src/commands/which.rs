//! Which command for the dvm CLI.

use anyhow::Result;

use crate::config::Options;

/// Prints the path of the `docker` binary the shell currently resolves.
///
/// Prints nothing when there is none.
///
/// # Errors
///
/// This command does not fail.
pub fn execute(options: &Options) -> Result<()> {
    tracing::debug!("dvm which");
    if let Some(current) = options.store().current_path(&options.activation()) {
        options.console().info(current.display());
    }
    Ok(())
}

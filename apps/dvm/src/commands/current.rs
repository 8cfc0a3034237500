//! Current command for the dvm CLI.
//!
//! Prints the version of the Docker client the shell currently resolves,
//! or `N/A` when there is none.

use anyhow::Result;

use super::current_or_empty;
use crate::config::Options;

/// Executes the current command.
///
/// # Errors
///
/// This command does not fail; an unknown version prints `N/A`.
pub fn execute(options: &Options) -> Result<()> {
    tracing::debug!("dvm current");
    let current = current_or_empty(&options.store(), &options.activation());

    let console = options.console();
    if current.is_empty() {
        console.warning("N/A");
    } else {
        console.info(current);
    }
    Ok(())
}

//! List-remote command for the dvm CLI.
//!
//! Lists the Docker versions available for installation.
//!
//! ## Usage
//!
//! ```bash
//! dvm list-remote          # Every stable release
//! dvm list-remote 17.      # Releases starting with 17.
//! dvm list-remote --pre    # Include release candidates, alphas and betas
//! ```

use anyhow::Result;
use clap::Args;

use crate::config::{MirrorArgs, Options};
use crate::toolchain::{Version, list_available_versions};

/// Arguments for the list-remote command.
#[derive(Args)]
pub struct ListRemoteArgs {
    /// Only show versions starting with this prefix.
    pub prefix: Option<String>,

    /// Include pre-release versions.
    #[arg(long)]
    pub pre: bool,

    #[command(flatten)]
    pub mirror: MirrorArgs,
}

/// Executes the list-remote command.
///
/// # Errors
///
/// Returns an error if a release listing cannot be fetched.
pub fn execute(args: &ListRemoteArgs, options: &Options) -> Result<()> {
    let prefix = args.prefix.as_deref().unwrap_or_default();
    tracing::debug!("dvm list-remote {prefix}");

    let client = options.http_client()?;
    let github = options.github(&client);
    let index = options.store_index(&client)?;
    let versions = list_available_versions(&github, &index, options.include_prereleases)?;

    let console = options.console();
    for version in filter_prefix(versions, prefix) {
        console.info(version);
    }
    Ok(())
}

fn filter_prefix(versions: Vec<Version>, prefix: &str) -> impl Iterator<Item = Version> {
    let prefix = prefix.trim_start_matches(['v', 'V']).to_string();
    versions
        .into_iter()
        .filter(move |version| version.value().starts_with(&prefix))
}

#![warn(clippy::pedantic)]

//! # Docker Version Manager helper (dvm-helper)
//!
//! `dvm-helper` does the work behind the `dvm` shell function: it installs
//! Docker clients into `~/.dvm`, and switches between them by writing a
//! script the wrapper sources after every call.
//!
//! ## Subcommands
//!
//! - `install` / `uninstall` - Manage installed clients
//! - `use` / `deactivate` - Change the shell's active client
//! - `current` / `which` - Inspect the active client
//! - `list` / `list-remote` - Installed and available versions
//! - `alias` / `unalias` / `list-alias` - Named versions
//! - `detect` - Match the client to the connected daemon
//! - `upgrade` - Update dvm itself
//!
//! ## Exit Codes
//!
//! - `0` success
//! - `1` runtime error (network, checksum, filesystem)
//! - `3` invalid operation (unknown version, active version, missing target)
//! - `127` invalid argument

mod commands;
mod config;
mod errors;
mod output;
mod toolchain;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{
    alias, current, deactivate, detect, install, list, list_remote, uninstall, upgrade, use_cmd,
    which,
};
use config::{GlobalArgs, Options};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("DVM_GIT_COMMIT"),
    ")"
);

/// Manage multiple versions of the Docker client.
#[derive(Parser)]
#[command(
    name = "dvm",
    bin_name = "dvm",
    version = VERSION,
    about = "Docker Version Manager",
    long_about = "Manage multiple versions of the Docker client.",
    after_help = "\
ENVIRONMENT VARIABLES:
    DVM_DIR             dvm home directory (default: ~/.dvm)
    DOCKER_VERSION      Version used by install and use when none is given
    DVM_MIRROR_URL      Alternate download location for Docker clients
    GITHUB_TOKEN        GitHub personal access token for list-remote and upgrade
    DVM_SILENT          Suppress output"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the dvm CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Detect the appropriate Docker client version.
    ///
    /// Queries the daemon the shell is configured for and switches to the
    /// matching client.
    Detect(detect::DetectArgs),

    /// Install a Docker version, using $DOCKER_VERSION if none is given.
    #[command(visible_alias = "i")]
    Install(install::InstallArgs),

    /// Uninstall a Docker version.
    Uninstall(uninstall::UninstallArgs),

    /// Use a Docker version, using $DOCKER_VERSION if none is given.
    ///
    /// Accepts a version, an alias, `system` or `edge`.
    Use(use_cmd::UseArgs),

    /// Undo the effects of dvm on the current shell.
    Deactivate,

    /// Print the current Docker version.
    Current,

    /// Print the path to the current Docker client.
    Which,

    /// Create an alias to an installed Docker version.
    Alias(alias::AliasArgs),

    /// Remove a Docker version alias.
    Unalias(alias::UnaliasArgs),

    /// List installed Docker versions.
    #[command(visible_alias = "ls")]
    List(list::ListArgs),

    /// List available Docker versions.
    #[command(visible_alias = "ls-remote")]
    ListRemote(list_remote::ListRemoteArgs),

    /// List Docker version aliases.
    #[command(visible_alias = "ls-alias")]
    ListAlias,

    /// Upgrade dvm to the latest release.
    Upgrade(upgrade::UpgradeArgs),
}

fn main() {
    if let Err(e) = run() {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Prints the error chain and returns the exit code it maps to.
fn handle_error(e: &anyhow::Error) -> i32 {
    eprintln!("Error: {e:?}");
    errors::exit_code_for(e)
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    output::init_logging(cli.global.debug, cli.global.silent);

    let options = Options::from_args(&cli.global)?;

    match cli.command {
        Commands::Detect(args) => detect::execute(&args, &options),
        Commands::Install(args) => install::execute(&args, &options.with_mirror(&args.mirror)),
        Commands::Uninstall(args) => uninstall::execute(&args, &options),
        Commands::Use(args) => use_cmd::execute(
            &args,
            &options.with_mirror(&args.mirror).with_no_check(args.nocheck),
        ),
        Commands::Deactivate => deactivate::execute(&options),
        Commands::Current => current::execute(&options),
        Commands::Which => which::execute(&options),
        Commands::Alias(args) => alias::execute_alias(&args, &options),
        Commands::Unalias(args) => alias::execute_unalias(&args, &options),
        Commands::List(args) => list::execute(&args, &options),
        Commands::ListRemote(args) => {
            list_remote::execute(
                &args,
                &options.with_mirror(&args.mirror).with_prereleases(args.pre),
            )
        }
        Commands::ListAlias => alias::execute_list(&options),
        Commands::Upgrade(args) => upgrade::execute(&args, &options),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn subcommand_aliases_parse() {
        let cli = Cli::try_parse_from(["dvm", "ls", "17."]).expect("Should parse");
        assert!(matches!(cli.command, Commands::List(ref args) if args.pattern.as_deref() == Some("17.")));

        let cli = Cli::try_parse_from(["dvm", "ls-remote", "--pre"]).expect("Should parse");
        assert!(matches!(cli.command, Commands::ListRemote(ref args) if args.pre));

        let cli = Cli::try_parse_from(["dvm", "i", "1.12.3", "--mirror-url", "http://mirror"])
            .expect("Should parse");
        assert!(matches!(
            cli.command,
            Commands::Install(ref args) if args.mirror.mirror_url.as_deref() == Some("http://mirror")
        ));
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from(["dvm", "use", "system", "--debug", "--dvm-dir", "/tmp/dvm"])
            .expect("Should parse");
        assert!(cli.global.debug);
        assert_eq!(
            cli.global.dvm_dir.as_deref(),
            Some(std::path::Path::new("/tmp/dvm"))
        );
    }
}

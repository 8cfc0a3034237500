//! Command line configuration.
//!
//! Global flags are parsed once by clap and turned into an immutable
//! [`Options`] value that every command receives. Command-specific flags
//! (`--mirror-url`, `--nocheck`, `--pre`) are folded in with the `with_*`
//! builders before the command runs.

use anyhow::Result;
use clap::Args;
use reqwest::blocking::Client;
use std::path::PathBuf;

use crate::output::Console;
use crate::toolchain::{
    Activation, DownloadPolicy, Downloader, DvmPaths, GitHubClient, Platform, Shell, StoreIndex,
    VersionStore, http_client,
};

/// Flags accepted by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Increase the GitHub API rate limit with a personal access token.
    #[arg(long, env = "GITHUB_TOKEN", global = true, hide_env_values = true)]
    pub github_token: Option<String>,

    /// Alternate dvm home directory. Defaults to ~/.dvm.
    #[arg(long, env = "DVM_DIR", global = true)]
    pub dvm_dir: Option<PathBuf>,

    /// Shell format for exported variables: sh, powershell or cmd.
    #[arg(long, env = "SHELL", global = true)]
    pub shell: Option<String>,

    /// Print additional debug information.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Suppress output. Errors are still displayed.
    #[arg(long, env = "DVM_SILENT", global = true)]
    pub silent: bool,

    /// Alternate GitHub API endpoint.
    #[arg(long, env = "DVM_GITHUB_API_URL", global = true, hide = true)]
    pub github_api_url: Option<String>,
}

/// Mirror flag shared by `install` and `use`.
#[derive(Args, Debug, Clone, Default)]
pub struct MirrorArgs {
    /// Alternate URL from which to download the Docker client.
    #[arg(long, env = "DVM_MIRROR_URL")]
    pub mirror_url: Option<String>,
}

/// Settings for a single dvm invocation.
#[derive(Debug, Clone)]
pub struct Options {
    pub paths: DvmPaths,
    pub platform: Platform,
    pub shell: Shell,
    pub debug: bool,
    pub silent: bool,
    pub github_token: Option<String>,
    pub github_api_url: Option<String>,
    pub mirror_url: Option<String>,
    pub no_check: bool,
    pub include_prereleases: bool,
}

impl Options {
    /// Builds options for the running machine.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform is unsupported, the home directory
    /// cannot be found, or the shell is invalid on Windows.
    pub fn from_args(args: &GlobalArgs) -> Result<Self> {
        Self::for_platform(args, Platform::detect()?)
    }

    /// Builds options for `platform`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be found or the shell is
    /// invalid on Windows.
    pub fn for_platform(args: &GlobalArgs, platform: Platform) -> Result<Self> {
        let shell = Shell::resolve(args.shell.as_deref(), platform)?;
        let root = match &args.dvm_dir {
            Some(dir) if !dir.as_os_str().is_empty() => dir.clone(),
            _ => DvmPaths::default_root()?,
        };
        tracing::debug!(root = %root.display(), "dvm home directory");

        Ok(Self {
            paths: DvmPaths::with_root(root, platform),
            platform,
            shell,
            debug: args.debug,
            silent: args.silent,
            github_token: args.github_token.clone().filter(|t| !t.is_empty()),
            github_api_url: args.github_api_url.clone().filter(|u| !u.is_empty()),
            mirror_url: None,
            no_check: false,
            include_prereleases: false,
        })
    }

    #[must_use]
    pub fn with_mirror(mut self, mirror: &MirrorArgs) -> Self {
        self.mirror_url = mirror.mirror_url.clone().filter(|u| !u.is_empty());
        self
    }

    #[must_use]
    pub fn with_no_check(mut self, no_check: bool) -> Self {
        self.no_check = no_check;
        self
    }

    #[must_use]
    pub fn with_prereleases(mut self, include: bool) -> Self {
        self.include_prereleases = include;
        self
    }

    #[must_use]
    pub fn console(&self) -> Console {
        Console::new(self.silent)
    }

    #[must_use]
    pub fn store(&self) -> VersionStore<'_> {
        VersionStore::new(&self.paths)
    }

    /// The process `PATH`, ready for activation.
    #[must_use]
    pub fn activation(&self) -> Activation {
        Activation::from_env(self.platform, &self.paths.versions)
    }

    #[must_use]
    pub fn download_policy(&self) -> DownloadPolicy {
        DownloadPolicy::new(self.platform, self.mirror_url.clone())
    }

    /// Downloader staging files in the dvm temp directory.
    #[must_use]
    pub fn downloader(&self, client: Client) -> Downloader {
        Downloader::new(client, self.paths.tmp.clone())
    }

    /// Store listings for the configured mirror.
    ///
    /// # Errors
    ///
    /// Returns an error if the mirror URL is invalid.
    pub fn store_index<'a>(&self, client: &'a Client) -> Result<StoreIndex<'a>> {
        StoreIndex::new(client, self.mirror_url.as_deref(), self.platform)
    }

    #[must_use]
    pub fn github<'a>(&self, client: &'a Client) -> GitHubClient<'a> {
        GitHubClient::new(
            client,
            self.github_api_url.as_deref(),
            self.github_token.clone(),
        )
    }

    /// Shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn http_client(&self) -> Result<Client> {
        http_client()
    }

    /// The activation script the shell wrapper sources.
    #[must_use]
    pub fn output_script(&self) -> PathBuf {
        self.paths.output_script(self.shell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::platform::{Arch, Os};

    const LINUX: Platform = Platform::new(Os::Linux, Arch::X86_64);
    const WINDOWS: Platform = Platform::new(Os::Windows, Arch::X86_64);

    fn args_with_dir(dir: &str) -> GlobalArgs {
        GlobalArgs {
            dvm_dir: Some(PathBuf::from(dir)),
            ..GlobalArgs::default()
        }
    }

    #[test]
    fn dvm_dir_sets_root() {
        let options = Options::for_platform(&args_with_dir("/tmp/dvm-home"), LINUX)
            .expect("Should build options");
        assert_eq!(options.paths.root, PathBuf::from("/tmp/dvm-home"));
        assert_eq!(
            options.output_script(),
            PathBuf::from("/tmp/dvm-home/.tmp/dvm-output.sh")
        );
    }

    #[test]
    fn posix_ignores_login_shell() {
        let mut args = args_with_dir("/tmp/dvm-home");
        args.shell = Some("/bin/zsh".to_string());
        let options = Options::for_platform(&args, LINUX).expect("Should build options");
        assert_eq!(options.shell, Shell::Sh);
    }

    #[test]
    fn windows_requires_shell() {
        let err = Options::for_platform(&args_with_dir("C:\\dvm"), WINDOWS)
            .expect_err("Should reject missing shell");
        assert_eq!(crate::errors::exit_code_for(&err), 127);

        let mut args = args_with_dir("C:\\dvm");
        args.shell = Some("powershell".to_string());
        let options = Options::for_platform(&args, WINDOWS).expect("Should build options");
        assert_eq!(options.shell, Shell::Powershell);
    }

    #[test]
    fn empty_values_are_unset() {
        let mut args = args_with_dir("/tmp/dvm-home");
        args.github_token = Some(String::new());
        let options = Options::for_platform(&args, LINUX)
            .expect("Should build options")
            .with_mirror(&MirrorArgs {
                mirror_url: Some(String::new()),
            })
            .with_no_check(true)
            .with_prereleases(true);
        assert!(options.github_token.is_none());
        assert!(options.mirror_url.is_none());
        assert!(options.no_check);
        assert!(options.include_prereleases);
    }
}

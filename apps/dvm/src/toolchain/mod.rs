//! Docker client version management.
//!
//! Everything dvm knows about Docker releases and the local install tree
//! lives here; the command modules only orchestrate these pieces.
//!
//! ## Module Structure
//!
//! - [`version`] - Version model (semantic versions, aliases, ordering)
//! - [`platform`] - OS and architecture detection
//! - [`paths`] - Layout of the dvm home directory
//! - [`shell`] - Shell dialects for the activation script
//! - [`policy`] - Where each Docker release is published
//! - [`remote`] - Store and GitHub release listings
//! - [`download`] - HTTP downloads with checksum and archive handling
//! - [`verify`] - SHA256 checksum verification
//! - [`archive`] - ZIP and tar.gz archive extraction utilities
//! - [`acquire`] - Download with the stable to test channel retry
//! - [`activation`] - `PATH` rewriting
//! - [`store`] - Installed versions and aliases

pub mod acquire;
pub mod activation;
pub mod archive;
pub mod download;
pub mod paths;
pub mod platform;
pub mod policy;
pub mod remote;
pub mod shell;
pub mod store;
pub mod verify;
pub mod version;

pub use acquire::download_release;
pub use activation::{Activation, write_script};
pub use download::{Downloader, http_client};
pub use paths::DvmPaths;
pub use platform::Platform;
pub use policy::{Channel, DownloadPolicy, ReleaseIndex};
pub use remote::{GitHubClient, StoreIndex, list_available_versions};
pub use shell::Shell;
pub use store::VersionStore;
pub use version::Version;

//! HTTP downloads for Docker releases.
//!
//! Every download lands in a temporary file first and is renamed into place
//! only after it has been fetched, verified and (for archives) extracted, so a
//! failed install never leaves a half-written binary in the versions root.
//!
//! ## Transport variants
//!
//! - [`Downloader::download_file`]: a bare binary.
//! - [`Downloader::download_file_with_checksum`]: a bare binary plus its
//!   `.sha256` sidecar.
//! - [`Downloader::download_archived_file`]: an archive from which a single
//!   entry is extracted, optionally verified against a sidecar first.
//!
//! The downloader never retries; the caller decides whether a failure is
//! worth a second attempt against another channel.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;

use super::archive::{extract_archive, set_executable_permissions};
use super::verify::verify_checksum_file;
use crate::errors::DvmError;

/// Suffix of the checksum sidecar published next to legacy releases.
pub const CHECKSUM_SUFFIX: &str = ".sha256";

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("dvm-helper/", env!("CARGO_PKG_VERSION"));

/// Builds the HTTP client shared by downloads and remote listings.
///
/// Requests have no timeout: a slow mirror should finish rather than abort.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(None)
        .build()
        .context("Failed to create HTTP client")
}

/// Fetches release artifacts into the dvm tree.
pub struct Downloader {
    client: Client,
    tmp_dir: PathBuf,
}

impl Downloader {
    /// Creates a downloader that stages files in `tmp_dir`.
    #[must_use]
    pub fn new(client: Client, tmp_dir: PathBuf) -> Self {
        Self { client, tmp_dir }
    }

    /// Downloads `url` to `dest` and marks it executable.
    ///
    /// # Errors
    ///
    /// Returns [`DvmError::HttpStatus`] for a non-success response, or an
    /// error if the file cannot be written.
    pub fn download_file(&self, url: &str, dest: &Path) -> Result<()> {
        let temp_path = dest.with_extension("tmp");
        create_parent(dest)?;

        if let Err(e) = self.fetch(url, &temp_path) {
            remove_quietly(&temp_path);
            return Err(e);
        }

        std::fs::rename(&temp_path, dest).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                dest.display()
            )
        })?;
        set_executable_permissions(dest)
    }

    /// Downloads `url` and its `.sha256` sidecar, verifies the digest and
    /// moves the file to `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if either download fails or the digest does not match.
    /// Nothing is written to `dest` on failure.
    pub fn download_file_with_checksum(&self, url: &str, dest: &Path) -> Result<()> {
        let staged = self.staging_path(url)?;
        self.fetch_verified(url, &staged)?;
        if staged == dest {
            return set_executable_permissions(dest);
        }

        let result = move_file(&staged, dest).and_then(|()| set_executable_permissions(dest));
        remove_quietly(&staged);
        result
    }

    /// Downloads the archive at `url`, extracts it and moves `entry` (a path
    /// inside the archive, e.g. `docker/docker`) to `dest`.
    ///
    /// When `checksummed` is set the archive is verified before extraction.
    /// The archive and the extraction directory are removed afterwards
    /// whether or not the install succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if the download, verification or extraction fails, or
    /// if the archive does not contain `entry`.
    pub fn download_archived_file(
        &self,
        url: &str,
        entry: &str,
        dest: &Path,
        checksummed: bool,
    ) -> Result<()> {
        let archive_path = self.staging_path(url)?;
        let scratch_dir = scratch_dir_for(&archive_path);

        let result = self
            .fetch_archive(url, &archive_path, checksummed)
            .and_then(|()| install_entry(&archive_path, &scratch_dir, entry, dest));

        cleanup_file(&archive_path);
        cleanup_dir(&scratch_dir);
        result
    }

    fn fetch_archive(&self, url: &str, archive_path: &Path, checksummed: bool) -> Result<()> {
        if checksummed {
            self.fetch_verified(url, archive_path)
        } else {
            self.fetch(url, archive_path)
        }
    }

    /// Downloads `url` and its sidecar into `path`, leaving only the verified
    /// file behind.
    fn fetch_verified(&self, url: &str, path: &Path) -> Result<()> {
        let checksum_url = format!("{url}{CHECKSUM_SUFFIX}");
        let checksum_path = append_suffix(path, CHECKSUM_SUFFIX);

        let result = self
            .fetch(url, path)
            .and_then(|()| self.fetch(&checksum_url, &checksum_path))
            .and_then(|()| verify_checksum_file(path, &checksum_path));

        remove_quietly(&checksum_path);
        if result.is_err() {
            remove_quietly(path);
        }
        result
    }

    /// Streams the body of a GET request into `dest`.
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        tracing::debug!(%url, dest = %dest.display(), "downloading");
        create_parent(dest)?;

        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to connect to {url}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DvmError::http_status(url, status.as_u16()).into());
        }

        let mut file = std::fs::File::create(dest)
            .with_context(|| format!("Failed to create file: {}", dest.display()))?;
        response
            .copy_to(&mut file)
            .with_context(|| format!("Failed to read response body from {url}"))?;

        Ok(())
    }

    /// Location in the temp directory for the file named by `url`.
    fn staging_path(&self, url: &str) -> Result<PathBuf> {
        Ok(self.tmp_dir.join(file_name_from_url(url)?))
    }
}

/// The last path segment of `url`.
///
/// # Errors
///
/// Returns an error if the URL cannot be parsed or has no file name.
pub fn file_name_from_url(url: &str) -> Result<String> {
    let parsed = reqwest::Url::parse(url).with_context(|| format!("Invalid URL: {url}"))?;
    match parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
    {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => bail!("URL has no file name: {url}"),
    }
}

/// Directory an archive is extracted into: its path without the extension.
fn scratch_dir_for(archive_path: &Path) -> PathBuf {
    match (archive_path.file_stem(), archive_path.file_name()) {
        (Some(stem), Some(name)) if stem != name => archive_path.with_file_name(stem),
        _ => append_suffix(archive_path, "-extracted"),
    }
}

fn install_entry(archive_path: &Path, scratch_dir: &Path, entry: &str, dest: &Path) -> Result<()> {
    if scratch_dir.exists() {
        std::fs::remove_dir_all(scratch_dir)
            .with_context(|| format!("Failed to clear {}", scratch_dir.display()))?;
    }
    extract_archive(archive_path, scratch_dir)?;

    let extracted = scratch_dir.join(entry);
    if !extracted.is_file() {
        bail!(
            "Archive {} does not contain {entry}",
            archive_path.display()
        );
    }

    move_file(&extracted, dest)?;
    set_executable_permissions(dest)
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Moves `src` to `dest`, replacing `dest` if it exists.
///
/// Falls back to copy-and-delete when the rename crosses filesystems.
fn move_file(src: &Path, dest: &Path) -> Result<()> {
    create_parent(dest)?;
    if dest.exists() {
        std::fs::remove_file(dest)
            .with_context(|| format!("Failed to replace {}", dest.display()))?;
    }

    if std::fs::rename(src, dest).is_err() {
        std::fs::copy(src, dest).with_context(|| {
            format!("Failed to move {} to {}", src.display(), dest.display())
        })?;
        remove_quietly(src);
    }
    Ok(())
}

fn remove_quietly(path: &Path) {
    let _ = std::fs::remove_file(path);
}

fn cleanup_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!("Unable to remove {}: {e}", path.display());
    }
}

fn cleanup_dir(path: &Path) {
    if let Err(e) = std::fs::remove_dir_all(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!("Unable to remove {}: {e}", path.display());
    }
}

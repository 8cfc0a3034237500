//! Fetching a Docker release into the versions root.

use anyhow::Result;
use std::path::PathBuf;

use super::download::Downloader;
use super::paths::DvmPaths;
use super::policy::{Channel, DownloadDescriptor, DownloadPolicy, ReleaseIndex};
use super::version::Version;
use crate::errors::{DvmError, find_dvm_error};

/// Downloads `version` and installs its client binary.
///
/// `edge` is pinned to the newest edge build first. A stable release that
/// answers 404 is retried once on the test channel; a second 404 is
/// reported as [`DvmError::VersionNotFound`].
///
/// Returns the resolved version and the installed binary's path.
///
/// # Errors
///
/// Returns an error if the version cannot be resolved, is not published, or
/// the download, verification or extraction fails.
pub fn download_release(
    paths: &DvmPaths,
    policy: &DownloadPolicy,
    downloader: &Downloader,
    index: &dyn ReleaseIndex,
    version: &Version,
) -> Result<(Version, PathBuf)> {
    let resolved = policy.resolve(version, index)?;
    let dest = paths.binary_path(&resolved);
    let descriptor = policy.descriptor(&resolved, Channel::for_version(&resolved))?;

    match fetch(policy, downloader, &descriptor, &dest) {
        Ok(()) => {}
        Err(e) if is_not_found(&e) => {
            let Some(retry) = policy.fallback(&resolved, &descriptor) else {
                return Err(DvmError::version_not_found(resolved.to_string()).into());
            };
            tracing::debug!(url = %retry.url, "not found on the stable channel, trying test");
            fetch(policy, downloader, &retry, &dest).map_err(|e| {
                if is_not_found(&e) {
                    anyhow::Error::from(DvmError::version_not_found(resolved.to_string()))
                } else {
                    e
                }
            })?;
        }
        Err(e) => return Err(e),
    }

    tracing::debug!(version = %resolved, dest = %dest.display(), "downloaded Docker");
    Ok((resolved, dest))
}

fn fetch(
    policy: &DownloadPolicy,
    downloader: &Downloader,
    descriptor: &DownloadDescriptor,
    dest: &std::path::Path,
) -> Result<()> {
    if descriptor.archived {
        downloader.download_archived_file(
            &descriptor.url,
            &policy.archived_entry(),
            dest,
            descriptor.checksummed,
        )
    } else if descriptor.checksummed {
        downloader.download_file_with_checksum(&descriptor.url, dest)
    } else {
        downloader.download_file(&descriptor.url, dest)
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    find_dvm_error(err).is_some_and(DvmError::is_not_found)
}

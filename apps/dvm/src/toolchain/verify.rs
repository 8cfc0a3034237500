//! SHA-256 verification for downloaded Docker binaries.
//!
//! Docker publishes a `<file>.sha256` sidecar next to legacy releases. The
//! sidecar holds the hex digest, optionally followed by whitespace and the
//! file name (`sha256sum` output format).

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use sha2::{Digest, Sha256};

use crate::errors::DvmError;

/// Verifies `file_path` against the digest recorded in `checksum_path`.
///
/// The comparison is exact: the sidecar must carry the lowercase hex digest.
///
/// # Errors
///
/// Returns an error if either file cannot be read, the sidecar is empty, or
/// the digests differ ([`DvmError::ChecksumMismatch`]).
pub fn verify_checksum_file(file_path: &Path, checksum_path: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(checksum_path).with_context(|| {
        format!("Failed to read checksum file: {}", checksum_path.display())
    })?;

    let Some(expected) = contents.split_whitespace().next() else {
        bail!("Checksum file is empty: {}", checksum_path.display());
    };

    verify_checksum(file_path, expected)
}

/// Verifies that a file matches the expected SHA-256 hex digest.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the digest differs.
pub fn verify_checksum(file_path: &Path, expected: &str) -> Result<()> {
    let actual = compute_sha256(file_path)?;

    if actual != expected {
        return Err(DvmError::ChecksumMismatch {
            file: file_path.display().to_string(),
            expected: expected.to_string(),
            actual,
        }
        .into());
    }

    tracing::debug!(file = %file_path.display(), "checksum verified");
    Ok(())
}

/// Computes the SHA-256 hash of a file as a lowercase hex string.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn compute_sha256(file_path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(file_path)
        .with_context(|| format!("Failed to open file for checksum: {}", file_path.display()))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer).with_context(|| {
            format!("Failed to read file for checksum: {}", file_path.display())
        })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

//! Error types for dvm.
//!
//! Most code returns `anyhow::Result` and attaches context as errors bubble
//! up. The failures that decide the process exit code are raised as a
//! [`DvmError`] somewhere in the chain; `main` looks for one to pick the code.
//!
//! | Exit code | Meaning                                          |
//! |-----------|--------------------------------------------------|
//! | 127       | Invalid argument (missing version, bad `--shell`) |
//! | 3         | Invalid operation (unknown version, active version) |
//! | 1         | Anything else (network, checksum, filesystem)    |

use thiserror::Error;

/// Exit code for invalid or missing arguments.
pub const EXIT_INVALID_ARGUMENT: i32 = 127;

/// Exit code for operations that cannot be carried out.
pub const EXIT_INVALID_OPERATION: i32 = 3;

/// Exit code for runtime failures.
pub const EXIT_RUNTIME_ERROR: i32 = 1;

/// Typed dvm failures.
#[derive(Debug, Error)]
pub enum DvmError {
    /// The user supplied a missing or malformed argument.
    #[error("{message}")]
    InvalidArgument {
        /// What was wrong with the argument.
        message: String,
    },

    /// The request is well formed but cannot be carried out.
    #[error("{message}")]
    InvalidOperation {
        /// Why the operation was refused.
        message: String,
    },

    /// The requested version is not published upstream.
    #[error("Version {version} not found. Run `dvm list-remote` to see available versions.")]
    VersionNotFound {
        /// The version that was requested.
        version: String,
    },

    /// A download returned a non-success HTTP status.
    #[error("Unable to download {url}: HTTP {status}")]
    HttpStatus {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// A downloaded file did not match its published checksum.
    #[error("Checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The file that was verified.
        file: String,
        /// The published checksum.
        expected: String,
        /// The checksum of the downloaded file.
        actual: String,
    },
}

impl DvmError {
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn version_not_found(version: impl Into<String>) -> Self {
        Self::VersionNotFound {
            version: version.into(),
        }
    }

    #[must_use]
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// The process exit code this error maps to.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } => EXIT_INVALID_ARGUMENT,
            Self::InvalidOperation { .. } | Self::VersionNotFound { .. } => EXIT_INVALID_OPERATION,
            Self::HttpStatus { .. } | Self::ChecksumMismatch { .. } => EXIT_RUNTIME_ERROR,
        }
    }

    /// Returns `true` for an HTTP 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::HttpStatus { status: 404, .. })
    }
}

/// Finds the first [`DvmError`] in an error chain.
#[must_use]
pub fn find_dvm_error(err: &anyhow::Error) -> Option<&DvmError> {
    err.chain().find_map(|cause| cause.downcast_ref::<DvmError>())
}

/// Exit code for an arbitrary error.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    find_dvm_error(err).map_or(EXIT_RUNTIME_ERROR, DvmError::exit_code)
}

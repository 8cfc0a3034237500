//! Platform detection for dvm.
//!
//! Everything that differs between operating systems (separators, file
//! extensions, the names Docker uses for the OS and architecture in download
//! URLs) is answered by a [`Platform`] value. It is detected once at startup
//! and passed down explicitly, so tests can exercise the Windows behavior on
//! any host.

use anyhow::{Result, bail};
use std::fmt;

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    Macos,
    Windows,
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86_64,
    Aarch64,
}

/// An OS and architecture combination that Docker publishes clients for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    os: Os,
    arch: Arch,
}

impl Platform {
    #[must_use]
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Detects the current platform based on compile-time configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the current OS/architecture combination is not supported.
    pub fn detect() -> Result<Self> {
        let os = match std::env::consts::OS {
            "linux" => Os::Linux,
            "macos" => Os::Macos,
            "windows" => Os::Windows,
            other => bail!("Unsupported operating system: {other}"),
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => Arch::X86_64,
            "aarch64" => Arch::Aarch64,
            other => bail!("Unsupported architecture: {other}"),
        };
        Ok(Self::new(os, arch))
    }

    #[must_use]
    pub fn os(self) -> Os {
        self.os
    }

    #[must_use = "returns platform check result without side effects"]
    pub fn is_windows(self) -> bool {
        matches!(self.os, Os::Windows)
    }

    /// Returns `.exe` on Windows, empty string elsewhere.
    #[must_use = "returns the extension string without side effects"]
    pub fn executable_extension(self) -> &'static str {
        if self.is_windows() { ".exe" } else { "" }
    }

    /// Extension of the archives Docker publishes for this platform.
    #[must_use = "returns the extension string without side effects"]
    pub fn archive_extension(self) -> &'static str {
        if self.is_windows() { ".zip" } else { ".tgz" }
    }

    /// Separator between `PATH` entries.
    #[must_use]
    pub fn path_list_separator(self) -> char {
        if self.is_windows() { ';' } else { ':' }
    }

    /// Separator between path components.
    #[must_use]
    pub fn dir_separator(self) -> char {
        if self.is_windows() { '\\' } else { '/' }
    }

    /// OS name used by the legacy `get.docker.com/builds` layout and by dvm's
    /// own release downloads.
    #[must_use = "returns the OS string without side effects"]
    pub fn docker_os(self) -> &'static str {
        match self.os {
            Os::Linux => "Linux",
            Os::Macos => "Darwin",
            Os::Windows => "Windows",
        }
    }

    /// OS name used by the `download.docker.com` store layout.
    #[must_use = "returns the OS string without side effects"]
    pub fn moby_os(self) -> &'static str {
        match self.os {
            Os::Linux => "linux",
            Os::Macos => "mac",
            Os::Windows => "win",
        }
    }

    #[must_use = "returns the arch string without side effects"]
    pub fn docker_arch(self) -> &'static str {
        match self.arch {
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.moby_os(), self.docker_arch())
    }
}

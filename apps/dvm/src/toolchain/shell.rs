//! Shell script rendering.
//!
//! A child process cannot change its parent's environment, so dvm writes the
//! variables it wants changed into a script that the `dvm` shell wrapper
//! sources (and then deletes) after `dvm-helper` exits.
//!
//! ## Formats
//!
//! ```text
//! sh:          export PATH="/home/user/.dvm/bin/docker/1.12.3:/usr/bin"
//! powershell:  $env:PATH="C:\Users\user\.dvm\bin\docker\1.12.3;C:\Windows"
//! cmd:         PATH=C:\Users\user\.dvm\bin\docker\1.12.3;C:\Windows
//! ```
//!
//! PowerShell and cmd lines end with `\r\n`, sh lines with `\n`.

use anyhow::Result;
use std::fmt;
use std::path::Path;

use super::platform::Platform;
use crate::errors::DvmError;

/// The shell the wrapper runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Sh,
    Powershell,
    Cmd,
}

impl Shell {
    /// Picks the script format for `requested` (a `--shell` value or `$SHELL`).
    ///
    /// Every POSIX shell sources the same `sh` script. Windows has no default
    /// and must be told whether the wrapper is PowerShell or cmd.
    ///
    /// # Errors
    ///
    /// Returns [`DvmError::InvalidArgument`] on Windows when `requested` is not
    /// `powershell` or `cmd`.
    pub fn resolve(requested: Option<&str>, platform: Platform) -> Result<Self> {
        if !platform.is_windows() {
            return Ok(Self::Sh);
        }
        match requested.and_then(Self::from_name) {
            Some(shell @ (Self::Powershell | Self::Cmd)) => Ok(shell),
            _ => Err(DvmError::invalid_argument(format!(
                "The --shell flag or SHELL environment variable must be set when running on Windows. \
                 Available values are powershell and cmd. Got: {}",
                requested.unwrap_or("")
            ))
            .into()),
        }
    }

    /// Parses a shell name or path such as `/bin/bash` or `powershell.exe`.
    #[must_use]
    pub fn from_name(value: &str) -> Option<Self> {
        let name = Path::new(value)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(value)
            .to_ascii_lowercase();
        match name.as_str() {
            "powershell" | "pwsh" => Some(Self::Powershell),
            "cmd" => Some(Self::Cmd),
            "sh" | "bash" | "zsh" | "ksh" | "dash" | "ash" => Some(Self::Sh),
            _ => None,
        }
    }

    /// Extension of the activation script for this shell.
    #[must_use]
    pub fn script_extension(self) -> &'static str {
        match self {
            Self::Sh => "sh",
            Self::Powershell => "ps1",
            Self::Cmd => "cmd",
        }
    }

    /// Renders a line that sets `name` to `value`.
    #[must_use]
    pub fn render_export(self, name: &str, value: &str) -> String {
        match self {
            Self::Sh => {
                let escaped = value
                    .replace('\\', "\\\\")
                    .replace('"', "\\\"")
                    .replace('$', "\\$")
                    .replace('`', "\\`");
                format!("export {name}=\"{escaped}\"\n")
            }
            Self::Powershell => {
                let escaped = value
                    .replace('`', "``")
                    .replace('"', "`\"")
                    .replace('$', "`$");
                format!("$env:{name}=\"{escaped}\"\r\n")
            }
            Self::Cmd => format!("{name}={value}\r\n"),
        }
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sh => "sh",
            Self::Powershell => "powershell",
            Self::Cmd => "cmd",
        })
    }
}

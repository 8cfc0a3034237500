//! Deactivate command for the dvm CLI.
//!
//! Removes every dvm entry from the calling shell's `PATH`, leaving whatever
//! Docker the system provides.

use anyhow::Result;

use super::emit;
use crate::config::Options;
use crate::toolchain::Activation;

/// Executes the deactivate command.
///
/// # Errors
///
/// Returns an error if the activation script cannot be written.
pub fn execute(options: &Options) -> Result<()> {
    tracing::debug!("dvm deactivate");
    deactivate(options, &mut options.activation())
}

/// Strips dvm's entries from `path` and writes the result.
///
/// # Errors
///
/// Returns an error if the activation script cannot be written.
pub fn deactivate(options: &Options, path: &mut Activation) -> Result<()> {
    path.activate(None);
    emit(options, &path.render(options.shell))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{options, script};

    #[test]
    fn writes_path_without_managed_entries() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let options = options(temp.path());
        let managed = options.paths.versions.join("1.12.3");
        let mut path = Activation::new(
            options.platform,
            &options.paths.versions,
            format!("{}:/bin", managed.display()),
        );

        deactivate(&options, &mut path).expect("Should deactivate");

        assert_eq!(script(&options), "export PATH=\"/bin\"\n");
    }
}

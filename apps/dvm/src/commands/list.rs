//! List command for the dvm CLI.
//!
//! Lists installed Docker versions whose name starts with an optional
//! pattern, marking the active one with `->`.
//!
//! ## Usage
//!
//! ```bash
//! dvm list          # Everything installed, plus the system Docker
//! dvm list 17.      # Versions starting with 17.
//! ```

use anyhow::Result;
use clap::Args;

use super::current_or_empty;
use crate::config::Options;
use crate::toolchain::{Activation, Version};

/// Arguments for the list command.
#[derive(Args)]
pub struct ListArgs {
    /// Glob prefix to filter versions by (e.g., "17.0" or "1.1?").
    pub pattern: Option<String>,
}

/// Executes the list command.
///
/// # Errors
///
/// Returns an error if the pattern is invalid or the versions directory
/// cannot be read.
pub fn execute(args: &ListArgs, options: &Options) -> Result<()> {
    let pattern = args.pattern.as_deref().unwrap_or_default();
    tracing::debug!("dvm list {pattern}");

    let console = options.console();
    for line in render(options, &options.activation(), pattern)? {
        console.info(line);
    }
    Ok(())
}

/// One output line per installed version matching `pattern`.
///
/// # Errors
///
/// Returns an error if the versions cannot be listed.
pub fn render(options: &Options, path: &Activation, pattern: &str) -> Result<Vec<String>> {
    let store = options.store();
    let versions = store.list_installed(&format!("{pattern}*"), path)?;
    let current = current_or_empty(&store, path);

    Ok(versions
        .iter()
        .map(|version| format_line(version, &current))
        .collect())
}

fn format_line(version: &Version, current: &Version) -> String {
    if !current.is_empty() && current.to_string() == version.to_string() {
        format!("->\t{version}")
    } else {
        format!("\t{version}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{fake_install, options};

    #[test]
    fn lists_matching_versions_sorted() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let options = options(temp.path());
        for slug in ["17.06.0-ce", "1.12.3", "17.03.0-ce"] {
            fake_install(&options, slug);
        }
        let path = Activation::new(options.platform, &options.paths.versions, "/nonexistent/bin");

        assert_eq!(
            render(&options, &path, "").expect("Should list"),
            vec!["\t1.12.3", "\t17.03.0-ce", "\t17.06.0-ce"]
        );
        assert_eq!(
            render(&options, &path, "17.0").expect("Should list"),
            vec!["\t17.03.0-ce", "\t17.06.0-ce"]
        );
    }

    #[test]
    fn empty_install_lists_nothing() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let options = options(temp.path());
        let path = Activation::new(options.platform, &options.paths.versions, "/nonexistent/bin");

        assert!(render(&options, &path, "").expect("Should list").is_empty());
    }

    #[test]
    fn current_version_is_marked() {
        let current = Version::parse("17.06.0-ce");
        assert_eq!(format_line(&Version::parse("17.06.0-ce"), &current), "->\t17.06.0-ce");
        assert_eq!(format_line(&Version::parse("1.12.3"), &current), "\t1.12.3");
        assert_eq!(format_line(&Version::parse("1.12.3"), &Version::Empty), "\t1.12.3");
    }
}

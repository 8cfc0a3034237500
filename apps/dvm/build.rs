//! Build script for dvm-helper.
//!
//! Embeds the git commit into the binary for `--version` output.

use std::process::Command;

fn main() {
    let commit = get_git_commit();
    println!("cargo:rustc-env=DVM_GIT_COMMIT={commit}");

    // Upgrade can be switched off by packagers that ship dvm themselves.
    let upgrade_disabled = std::env::var("DVM_UPGRADE_DISABLED").unwrap_or_default();
    println!("cargo:rustc-env=DVM_UPGRADE_DISABLED={upgrade_disabled}");
    println!("cargo:rerun-if-env-changed=DVM_UPGRADE_DISABLED");

    if let Some(workspace_root) = get_workspace_root() {
        println!("cargo:rerun-if-changed={workspace_root}/.git/HEAD");
    }
}

/// Gets the workspace root directory.
fn get_workspace_root() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .ok()?;

    if output.status.success() {
        let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !path.is_empty() {
            return Some(path);
        }
    }
    None
}

/// Gets the short git commit hash, or `unknown` outside a checkout.
fn get_git_commit() -> String {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output();

    if let Ok(output) = output
        && output.status.success()
    {
        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !hash.is_empty() {
            return hash;
        }
    }

    "unknown".to_string()
}

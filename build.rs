// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-env-changed=SPECTROSCOPE_VERSION");

    // Packagers may pin the version string
    let version = std::env::var("SPECTROSCOPE_VERSION").unwrap_or_else(|_| build_version());

    println!("cargo::rustc-env=BUILD_VERSION={}", version);
}

/// Crate version, suffixed with the short commit hash when built from git
fn build_version() -> String {
    let base = env!("CARGO_PKG_VERSION");
    match commit_hash() {
        Some(hash) => format!("{}-{}", base, hash),
        None => base.to_string(),
    }
}

fn commit_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;

    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        None
    }
}

// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=DEPTH_CAPTURE_VERSION");

    // Packagers can pin the version when building outside a git checkout
    let version = std::env::var("DEPTH_CAPTURE_VERSION").unwrap_or_else(|_| version_from_git());
    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// `0.3.1` at a tag, `0.3.1+5.gabcdef1` after one, the package version otherwise
fn version_from_git() -> String {
    let package = std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());

    let Some(describe) = git(&["describe", "--tags", "--match", "v*"]) else {
        return match git(&["rev-parse", "--short", "HEAD"]) {
            Some(hash) => format!("{}+g{}", package, hash),
            None => package,
        };
    };

    let describe = describe.strip_prefix('v').unwrap_or(&describe);
    let parts: Vec<&str> = describe.rsplitn(3, '-').collect();
    match parts.as_slice() {
        [hash, commits, tag] => format!("{}+{}.{}", tag, commits, hash),
        _ => describe.to_string(),
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

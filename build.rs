//! Stamps the build with a version and short commit SHA.
//!
//! `CALICO_VERSION` and `CALICO_GIT_SHA` may be set by CI; otherwise the
//! version comes from Cargo.toml and the SHA from `GITHUB_SHA` or git.

use std::env;
use std::process::Command;

const SHA_LEN: usize = 7;

fn main() {
    let version = env::var("CALICO_VERSION")
        .or_else(|_| env::var("CARGO_PKG_VERSION"))
        .unwrap_or_else(|_| "unknown".into());

    let git_sha = env::var("CALICO_GIT_SHA")
        .or_else(|_| env::var("GITHUB_SHA").map(|sha| sha.chars().take(SHA_LEN).collect()))
        .ok()
        .or_else(git_short_sha)
        .unwrap_or_else(|| "unknown".into());

    println!("cargo:rustc-env=CALICO_VERSION={}", version);
    println!("cargo:rustc-env=CALICO_GIT_SHA={}", git_sha);

    for var in ["CALICO_VERSION", "CALICO_GIT_SHA", "GITHUB_SHA"] {
        println!("cargo:rerun-if-env-changed={}", var);
    }
}

fn git_short_sha() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", &format!("--short={}", SHA_LEN), "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let sha = String::from_utf8(output.stdout).ok()?;
    Some(sha.trim().to_string()).filter(|sha| !sha.is_empty())
}

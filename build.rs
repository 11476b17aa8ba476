//! Embeds git and target information for `review-panel version`.

use std::env;
use std::process::Command;

/// Run a command and return its trimmed stdout, if it succeeded.
fn capture(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

fn set(key: &str, value: &str) {
    println!("cargo:rustc-env=REVIEW_PANEL_{}={}", key, value);
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let unknown = || "unknown".to_string();
    let cargo_var = |name: &str| env::var(name).unwrap_or_else(|_| unknown());

    let dirty = match capture("git", &["status", "--porcelain"]) {
        Some(status) if !status.is_empty() => "true",
        Some(_) => "false",
        None => "unknown",
    };

    set("GIT_HASH", &capture("git", &["rev-parse", "--short=8", "HEAD"]).unwrap_or_else(unknown));
    set("GIT_BRANCH", &capture("git", &["rev-parse", "--abbrev-ref", "HEAD"]).unwrap_or_else(unknown));
    set("GIT_DIRTY", dirty);
    set(
        "BUILD_TIMESTAMP",
        &chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    set("TARGET", &cargo_var("TARGET"));
    set("PROFILE", &cargo_var("PROFILE"));
    set("RUSTC_VERSION", &capture("rustc", &["--version"]).unwrap_or_else(unknown));
}

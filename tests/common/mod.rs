//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::path::PathBuf;

use assert_cmd::Command;

/// Directory holding the test fixtures
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Path to a specific fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

/// Command for the review-panel binary with a clean environment
pub fn panel_cmd() -> Command {
    let mut cmd = Command::cargo_bin("review-panel").unwrap();
    cmd.env_remove("REVIEW_PANEL_CONFIG")
        .env_remove("REVIEW_PANEL_BACKEND")
        .env_remove("REVIEW_PANEL_API_KEY")
        .env_remove("REVIEW_PANEL_PERSONA_KIND")
        .env_remove("RUST_LOG");
    cmd
}

/// Command preconfigured with the mock backend config and persona fixture
pub fn mock_cmd() -> Command {
    let mut cmd = panel_cmd();
    cmd.arg("--config")
        .arg(fixture_path("mock.toml"))
        .arg("--personas")
        .arg(fixture_path("personas.csv"));
    cmd
}

/// Command preconfigured with the mock backend and the expert reviewer fixture
pub fn expert_cmd() -> Command {
    let mut cmd = panel_cmd();
    cmd.arg("--config")
        .arg(fixture_path("mock.toml"))
        .arg("--personas")
        .arg(fixture_path("experts.csv"))
        .arg("--kind")
        .arg("expert");
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_exist() {
        for name in ["personas.csv", "experts.csv", "product.json", "criteria.json", "mock.toml"] {
            assert!(fixture_path(name).exists(), "missing fixture {}", name);
        }
    }
}

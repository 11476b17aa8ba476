//! CLI integration tests
//!
//! Drives the review-panel binary with assert_cmd against the mock backend

mod common;

use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

use common::{expert_cmd, fixture_path, mock_cmd, panel_cmd};

fn stdout_json(output: std::process::Output) -> Value {
    assert!(output.status.success(), "command failed: {:?}", output);
    serde_json::from_slice(&output.stdout).unwrap()
}

// ─────────────────────────────────────────────────────────────────
// Help and Version
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    panel_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("review"))
        .stdout(predicate::str::contains("personas"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("version"));
}

#[test]
fn test_version_command() {
    panel_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("review-panel"))
        .stdout(predicate::str::contains("Profile:"));
}

#[test]
fn test_review_help_lists_criteria_flags() {
    panel_cmd()
        .args(["review", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--product"))
        .stdout(predicate::str::contains("--age"))
        .stdout(predicate::str::contains("--min-matching-hobbies"))
        .stdout(predicate::str::contains("--set"));
}

#[test]
fn test_missing_subcommand() {
    panel_cmd().assert().failure();
}

// ─────────────────────────────────────────────────────────────────
// Personas
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_personas_catalog() {
    let output = mock_cmd().args(["personas", "catalog"]).output().unwrap();
    let catalog = stdout_json(output);

    let professions = catalog["professions"].as_array().unwrap();
    assert!(professions.contains(&Value::from("Software engineer")));
    assert!(catalog["hobbies"].as_array().unwrap().contains(&Value::from("gaming")));
    assert_eq!(catalog["ages"].as_array().unwrap().len(), 8);
}

#[test]
fn test_personas_select_with_backfill() {
    let output = mock_cmd()
        .args(["personas", "select", "--count", "3", "--seed", "5"])
        .arg("--criteria")
        .arg(fixture_path("criteria.json"))
        .output()
        .unwrap();
    let selected = stdout_json(output);
    let selected = selected.as_array().unwrap();

    assert_eq!(selected.len(), 3);
    let names: Vec<&str> = selected.iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert!(names.contains(&"Alice"));
    assert!(names.contains(&"Chen"));
    for persona in selected {
        let age = persona["age"].as_u64().unwrap();
        assert!((25..=35).contains(&age));
        assert_eq!(persona["profession"], "Software engineer");
    }
}

#[test]
fn test_personas_select_no_backfill() {
    let output = mock_cmd()
        .args(["personas", "select", "--profession", "Teacher", "--count", "5", "--no-backfill"])
        .output()
        .unwrap();
    let selected = stdout_json(output);
    assert_eq!(selected.as_array().unwrap().len(), 2);
}

#[test]
fn test_personas_select_unsatisfiable() {
    mock_cmd()
        .args(["personas", "select", "--hobby", "gaming", "--min-matching-hobbies", "2"])
        .assert()
        .failure()
        .code(40)
        .stderr(predicate::str::contains("E401"));
}

#[test]
fn test_personas_missing_columns() {
    panel_cmd()
        .arg("--config")
        .arg(fixture_path("mock.toml"))
        .arg("--personas")
        .arg(fixture_path("missing_columns.csv"))
        .args(["personas", "catalog"])
        .assert()
        .failure()
        .code(30)
        .stderr(predicate::str::contains("nationality"))
        .stderr(predicate::str::contains("salary_range"));
}

#[test]
fn test_expert_catalog() {
    let output = expert_cmd().args(["personas", "catalog"]).output().unwrap();
    let catalog = stdout_json(output);

    assert_eq!(catalog["years_experience"], serde_json::json!([4, 12, 20, 25]));
    assert!(catalog["expertise_areas"].as_array().unwrap().contains(&Value::from("SEO")));
    assert!(catalog["industry_focus"].as_array().unwrap().contains(&Value::from("Retail")));
}

#[test]
fn test_expert_select_with_backfill() {
    let output = expert_cmd()
        .args(["personas", "select", "--count", "3", "--seed", "9"])
        .args(["--experience", "10-30", "--expertise", "SEO"])
        .output()
        .unwrap();
    let selected = stdout_json(output);
    let selected = selected.as_array().unwrap();

    assert_eq!(selected.len(), 3);
    let names: Vec<&str> = selected.iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert!(names.contains(&"Jonas"));
    assert!(names.contains(&"Lars"));
    assert!(names.iter().any(|n| n.starts_with("Reviewer_")));
    for persona in selected {
        assert_eq!(persona["kind"], "expert");
        let years = persona["years_experience"].as_u64().unwrap();
        assert!((10..=30).contains(&years));
        let areas = persona["expertise_areas"].as_array().unwrap();
        assert!(areas.contains(&Value::from("SEO")));
    }
}

#[test]
fn test_expert_kind_rejects_consumer_csv() {
    mock_cmd()
        .args(["--kind", "expert", "personas", "catalog"])
        .assert()
        .failure()
        .code(30)
        .stderr(predicate::str::contains("years_experience"));
}

// ─────────────────────────────────────────────────────────────────
// Review
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_expert_review_with_mock_backend() {
    let output = expert_cmd()
        .arg("review")
        .arg("--product")
        .arg(fixture_path("product.json"))
        .args(["--count", "2", "--profession", "UX designer", "--json"])
        .output()
        .unwrap();
    let outcome = stdout_json(output);

    let reviews = outcome["reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 2);
    let names: Vec<&str> = reviews.iter().map(|r| r["persona"]["name"].as_str().unwrap()).collect();
    assert!(names.contains(&"Iris"));
    assert!(names.contains(&"Kemi"));
    for review in reviews {
        assert_eq!(review["persona"]["kind"], "expert");
    }
}

#[test]
fn test_review_report_with_mock_backend() {
    mock_cmd()
        .arg("review")
        .arg("--product")
        .arg(fixture_path("product.json"))
        .arg("--criteria")
        .arg(fixture_path("criteria.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("PRODUCT INFORMATION"))
        .stdout(predicate::str::contains("Lumen Desk Lamp"))
        .stdout(predicate::str::contains("Overall Sentiment: Positive"))
        .stdout(predicate::str::contains("Purchase Intent: 72.5%"))
        .stdout(predicate::str::contains("• "))
        .stdout(predicate::str::contains("Total Personas: 3"))
        .stdout(predicate::str::contains("Successful Reviews: 3"))
        .stdout(predicate::str::contains("Failed Reviews: 0"))
        .stdout(predicate::str::contains("AI Provider: mock"));
}

#[test]
fn test_review_partial_failure() {
    mock_cmd()
        .arg("review")
        .arg("--product")
        .arg(fixture_path("product.json"))
        .args(["--profession", "Teacher", "--no-backfill"])
        .args(["--set", "fail_when_contains=kenyan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total Personas: 2"))
        .stdout(predicate::str::contains("Successful Reviews: 1"))
        .stdout(predicate::str::contains("Failed Reviews: 1"))
        .stdout(predicate::str::contains("Emeka"));
}

#[test]
fn test_review_json_output() {
    let output = mock_cmd()
        .arg("review")
        .arg("--product")
        .arg(fixture_path("product.json"))
        .args(["--count", "4", "--json"])
        .output()
        .unwrap();
    let outcome = stdout_json(output);

    assert_eq!(outcome["metadata"]["total_personas"], 4);
    assert_eq!(outcome["metadata"]["successful_reviews"], 4);
    assert_eq!(outcome["reviews"].as_array().unwrap().len(), 4);
    assert_eq!(outcome["product"]["price"], "49.99");
    assert_eq!(outcome["summary"]["overall_sentiment"], "Positive");
}

#[test]
fn test_review_all_failures_still_reports() {
    mock_cmd()
        .arg("review")
        .arg("--product")
        .arg(fixture_path("product.json"))
        .args(["--set", "fail_all=true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Successful Reviews: 0"))
        .stdout(predicate::str::contains("No reviews available"));
}

#[test]
fn test_review_unknown_backend_exit_code() {
    mock_cmd()
        .arg("review")
        .arg("--product")
        .arg(fixture_path("product.json"))
        .args(["--backend", "claude"])
        .assert()
        .failure()
        .code(60)
        .stderr(predicate::str::contains("E601"));
}

#[test]
fn test_review_invalid_override() {
    mock_cmd()
        .arg("review")
        .arg("--product")
        .arg(fixture_path("product.json"))
        .args(["--set", "latency=fast"])
        .assert()
        .failure()
        .code(60)
        .stderr(predicate::str::contains("invalid override"));
}

#[test]
fn test_review_missing_product_file() {
    mock_cmd()
        .args(["review", "--product", "/nonexistent/product.json"])
        .assert()
        .failure()
        .code(20);
}

// ─────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_validate_fixture() {
    panel_cmd()
        .args(["config", "validate", "--config"])
        .arg(fixture_path("mock.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_config_validate_nonexistent_file() {
    panel_cmd()
        .args(["config", "validate", "--config", "/nonexistent/path/config.toml"])
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("E100"));
}

#[test]
fn test_config_init_writes_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("panel").join("config.toml");

    panel_cmd()
        .args(["config", "init", "--path"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written"));
    assert!(path.exists());

    panel_cmd()
        .args(["config", "init", "--path"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    panel_cmd()
        .args(["config", "validate", "--config"])
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn test_config_show_hides_api_key() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "[openai]\napi_key = \"sk-very-secret\"\n").unwrap();

    panel_cmd()
        .args(["config", "show", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("[summarizer]"))
        .stdout(predicate::str::contains("[openai]"))
        .stdout(predicate::str::contains("sk-very-secret").not());
}

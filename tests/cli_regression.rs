// Regression tests for the stepcheck binary: exit codes and output shape.
// Requires: assert_cmd, predicates crates in [dev-dependencies]

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

fn stepcheck() -> Command {
    Command::cargo_bin("stepcheck").unwrap()
}

#[test]
fn valid_file_exits_zero() {
    stepcheck()
        .args(["validate", "tests/fixtures/valid.yml"])
        .assert()
        .code(0)
        .stdout(contains("✓ Configuration is valid"));
}

#[test]
fn invalid_file_exits_two_with_flat_diagnostics() {
    stepcheck()
        .args(["validate", "--no-color", "tests/fixtures/invalid.yml"])
        .assert()
        .code(2)
        .stdout(
            contains("tests/fixtures/invalid.yml:12:5: Invalid file mode")
                .and(contains("tests/fixtures/invalid.yml:15:3: Invalid template syntax in shell: "))
                .and(contains("❌ Validation failed")),
        );
}

#[test]
fn verbose_output_has_source_context() {
    stepcheck()
        .args(["validate", "-v", "tests/fixtures/invalid.yml"])
        .assert()
        .code(2)
        .stdout(
            contains("Error: tests/fixtures/invalid.yml")
                .and(contains("(in step: bad mode)"))
                .and(contains("Found 4 error(s)")),
        );
}

#[test]
fn json_report() {
    let output = stepcheck()
        .args(["validate", "--format", "json", "tests/fixtures/invalid.yml"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["valid"], serde_json::Value::Bool(false));
    let diagnostics = report["diagnostics"].as_array().unwrap();
    assert_eq!(diagnostics.len(), 4);
    assert_eq!(diagnostics[2]["line"], 12);
    assert_eq!(diagnostics[2]["column"], 5);
    assert_eq!(diagnostics[2]["severity"], "error");
    assert_eq!(diagnostics[2]["file"], "tests/fixtures/invalid.yml");
}

#[test]
fn malformed_yaml_is_a_runtime_error() {
    stepcheck()
        .args(["validate", "tests/fixtures/malformed.yml"])
        .assert()
        .code(3)
        .stderr(contains("stepcheck::parse").or(contains("invalid YAML")));
}

#[test]
fn missing_path_is_a_runtime_error() {
    stepcheck()
        .args(["validate", "tests/fixtures/does-not-exist.yml"])
        .assert()
        .code(3)
        .stderr(contains("does-not-exist.yml"));
}

#[test]
fn runtime_error_does_not_hide_other_files() {
    stepcheck()
        .args([
            "validate",
            "tests/fixtures/malformed.yml",
            "tests/fixtures/invalid.yml",
        ])
        .assert()
        .code(3)
        .stdout(contains("invalid.yml:12:5:"));
}

#[test]
fn directory_is_walked_for_yaml_only() {
    stepcheck()
        .args(["validate", "tests/fixtures/tree"])
        .assert()
        .code(0)
        .stdout(contains("✓ Configuration is valid"));
}

#[test]
fn structured_layout_from_cli() {
    stepcheck()
        .args(["validate", "tests/fixtures/structured.yml"])
        .assert()
        .code(2)
        .stdout(contains(
            "tests/fixtures/structured.yml:9:5: Unknown field 'sudo'. Did you mean 'become'?",
        ));
}

#[test]
fn schema_subcommand_prints_json_schema() {
    let output = stepcheck().arg("schema").output().unwrap();
    assert!(output.status.success());
    let schema: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(schema["definitions"]["step"]["oneOf"].is_array());
    assert_eq!(schema["oneOf"].as_array().map(Vec::len), Some(2));
}

#[test]
fn validate_requires_a_path() {
    stepcheck().arg("validate").assert().failure();
}

//! End-to-end CLI tests using `assert_cmd`
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const INVENTORY: &str = r#"
[[providers]]
name = "rhv43"
type = "rhevm"
category = "infra"
iso_datastore = true

[providers.provisioning]
host = "rhv-host"
iso_kickstart = "rhel7-ks"

[[providers]]
name = "rhv43"
type = "rhevm"
category = "infra"
iso_datastore = true

[providers.provisioning]
host = "rhv-host-2"
iso_kickstart = "missing-ks"

[[providers]]
name = "vsphere65"
type = "virtualcenter"
category = "infra"
iso_datastore = ""

[[providers]]
name = "ec2-east"
type = "ec2"
category = "cloud"

[customization_templates.rhel7-ks]
type = "kickstart"
"#;

const SUITE: &str = r#"{
    "modules": [
        {
            "name": "test_iso_service_catalogs",
            "tests": ["test_rhev_iso_servicecatalog"],
            "required_fields": ["iso_datastore", ["provisioning", "host"]],
            "selector": {"categories": ["infra"]},
            "scope": "module"
        },
        {
            "name": "test_pxe_service_catalogs",
            "tests": ["test_pxe_servicecatalog"],
            "required_fields": ["pxe_server"]
        }
    ]
}"#;

/// Helper to get the binary or fail test
fn testgen(dir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_testgen"));
    command.current_dir(dir).env_remove("TESTGEN_INVENTORY").env_remove("TESTGEN_SUITE");
    command
}

/// Temp dir with the inventory and suite written into it
fn workspace() -> TempDir {
    let temp = TempDir::new().unwrap_or_else(|err| panic!("Failed to create temp dir: {err}"));
    fs::write(temp.path().join("inventory.toml"), INVENTORY).unwrap();
    fs::write(temp.path().join("suite.json"), SUITE).unwrap();
    temp
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).unwrap_or_else(|err| panic!("stdout is not JSON: {err}"))
}

#[test]
fn test_cli_help() {
    let temp = workspace();
    testgen(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage").and(predicate::str::contains("matrix")));
}

#[test]
fn test_matrix_json_triple() {
    let temp = workspace();
    let assert = testgen(temp.path())
        .args(["matrix", "-i", "inventory.toml", "-r", "iso_datastore", "-r", "provisioning.host"])
        .args(["--test", "test_rhev_iso_servicecatalog", "--scope", "module"])
        .assert()
        .success();

    let json = stdout_json(&assert.get_output().stdout);
    assert_eq!(json["test"], "test_rhev_iso_servicecatalog");
    assert_eq!(json["argnames"], serde_json::json!(["provider"]));
    assert_eq!(json["ids"], serde_json::json!(["rhv43", "rhv43-1"]));
    assert_eq!(json["scope"], "module");
    assert_eq!(json["argvalues"][1][0]["provisioning"]["host"], "rhv-host-2");

    let excluded = json["excluded"].as_array().unwrap();
    assert_eq!(excluded.len(), 2);
    assert_eq!(excluded[0]["provider"], "vsphere65");
}

#[test]
fn test_matrix_text_with_template_filter() {
    let temp = workspace();
    testgen(temp.path())
        .args(["matrix", "-i", "inventory.toml", "--category", "infra"])
        .args(["--template-path", "provisioning.iso_kickstart", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("test[rhv43]\n"))
        .stdout(predicate::str::contains("test[rhv43-1]").not())
        .stdout(predicate::str::contains("excluded ec2-east: provider class not selected"))
        .stdout(predicate::str::contains(
            "excluded rhv43: template at provisioning.iso_kickstart is not registered in \
             'customization_templates'",
        ));
}

#[test]
fn test_matrix_exclude_and_params() {
    let temp = workspace();
    let assert = testgen(temp.path())
        .args(["matrix", "-i", "inventory.toml", "--type", "EC2", "--type", "rhevm"])
        .args(["--exclude", "ec2-east", "--param", "provisioning"])
        .assert()
        .success();

    let json = stdout_json(&assert.get_output().stdout);
    assert_eq!(json["ids"], serde_json::json!(["rhv43", "rhv43-1"]));
    assert_eq!(json["argnames"], serde_json::json!(["provider", "provisioning"]));
    assert_eq!(json["argvalues"][0][1]["host"], "rhv-host");

    let excluded = json["excluded"].as_array().unwrap();
    assert_eq!(excluded.len(), 2);
    assert_eq!(excluded[0]["provider"], "vsphere65");
    assert_eq!(excluded[1]["provider"], "ec2-east");
    assert_eq!(excluded[1]["reason"], "excluded by name");
}

#[test]
fn test_empty_matrix_is_success() {
    let temp = workspace();
    testgen(temp.path())
        .args(["matrix", "-i", "inventory.toml", "-r", "pxe_server", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("test[").not());
}

#[test]
fn test_unsupported_inventory_format_fails() {
    let temp = workspace();
    fs::write(temp.path().join("inventory.yaml"), "providers: []").unwrap();
    testgen(temp.path())
        .args(["matrix", "-i", "inventory.yaml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unsupported document format"));
}

#[test]
fn test_missing_inventory_fails() {
    let temp = workspace();
    testgen(temp.path())
        .arg("matrix")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No inventory given"));
}

#[test]
fn test_inventory_from_config_file() {
    let temp = workspace();
    fs::write(
        temp.path().join("testgen.toml"),
        "inventory = \"inventory.toml\"\ndefault_scope = \"module\"\n",
    )
    .unwrap();

    let assert = testgen(temp.path())
        .args(["matrix", "--type", "ec2"])
        .assert()
        .success();
    let json = stdout_json(&assert.get_output().stdout);
    assert_eq!(json["ids"], serde_json::json!(["ec2-east"]));
    assert_eq!(json["scope"], "module");
}

#[test]
fn test_inventory_from_environment() {
    let temp = workspace();
    testgen(temp.path())
        .env("TESTGEN_INVENTORY", "inventory.toml")
        .args(["matrix", "--type", "virtualcenter", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("test[vsphere65]"));
}

#[test]
fn test_collect_reports_empty_module() {
    let temp = workspace();
    testgen(temp.path())
        .args(["collect", "-i", "inventory.toml", "-s", "suite.json", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("test_iso_service_catalogs: 2 cases"))
        .stdout(predicate::str::contains(
            "  test_rhev_iso_servicecatalog[rhv43-1]",
        ))
        .stdout(predicate::str::contains("test_pxe_service_catalogs: empty"));
}

#[test]
fn test_collect_json_summaries() {
    let temp = workspace();
    let assert = testgen(temp.path())
        .args(["collect", "-i", "inventory.toml", "-s", "suite.json"])
        .assert()
        .success();

    let json = stdout_json(&assert.get_output().stdout);
    let modules = json.as_array().unwrap();
    assert_eq!(modules.len(), 2);
    assert_eq!(modules[0]["status"], "collected");
    assert_eq!(modules[0]["cases"], 2);
    assert_eq!(modules[1]["status"], "empty");
}

#[test]
fn test_collect_failed_module_exits_two() {
    let temp = workspace();
    fs::write(
        temp.path().join("broken.json"),
        r#"{"modules": [
            {"name": "no_tests", "tests": []},
            {"name": "fine", "tests": ["test_any"]}
        ]}"#,
    )
    .unwrap();

    testgen(temp.path())
        .args(["collect", "-i", "inventory.toml", "-s", "broken.json", "--format", "text"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("no_tests: FAILED (module declares no tests)"))
        .stdout(predicate::str::contains("fine: 4 cases"));
}

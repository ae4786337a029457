//! Integration tests for the qty binary.
//!
//! These tests verify end-to-end behavior including:
//! - Unit conversion with uncertainties
//! - Expansion and listing of the default catalog
//! - PDG rounding and statistical comparison
//! - Custom units loaded from a config file

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create an isolated config directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the CLI binary, isolated from the user's config
fn cli(config_home: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("qty"));
    cmd.env("XDG_CONFIG_HOME", config_home.path());
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, contents).expect("Failed to write config");
    path
}

#[test]
fn test_cli_help() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Physical quantities with units and uncertainties",
        ));
}

#[test]
fn test_convert_exact() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args(["convert", "1", "km", "m"])
        .assert()
        .success()
        .stdout("1000 m\n");
}

#[test]
fn test_convert_rounds_uncertain_result() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args(["convert", "3.5", "km hr^-1", "m s^-1", "--error", "0.1"])
        .assert()
        .success()
        .stdout("0.972 ± 0.028 m / s\n");
}

#[test]
fn test_convert_raw() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args(["convert", "2", "km", "m", "-e", "0.5", "--raw"])
        .assert()
        .success()
        .stdout("2000 ± 500 m\n");
}

#[test]
fn test_convert_negative_value() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args(["convert", "-3", "km", "m"])
        .assert()
        .success()
        .stdout("-3000 m\n");
}

#[test]
fn test_convert_incompatible_units_fails() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args(["convert", "1", "m", "s"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("UnitConversion"));
}

#[test]
fn test_convert_unknown_unit_fails() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args(["convert", "1", "furlong", "m"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("UnknownUnit"));
}

#[test]
fn test_convert_json() {
    let temp_dir = setup_test_dir();
    let output = cli(&temp_dir)
        .args(["--json", "convert", "1", "kPa", "Pa", "--error", "0.01"])
        .output()
        .expect("Failed to run qty");
    assert!(output.status.success());

    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Output is not JSON");
    assert_eq!(parsed["value"], 1000.0);
    assert_eq!(parsed["error"], 10.0);
    assert_eq!(parsed["unit"], "Pa");
    assert_eq!(parsed["factors"][0]["name"], "Pa");
}

#[test]
fn test_expand() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args(["expand", "kW hr"])
        .assert()
        .success()
        .stdout(predicate::str::contains("exact factor: 3600000000"))
        .stdout(predicate::str::contains("gram metre ^ 2 / second ^ 2"));
}

#[test]
fn test_units_listing() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .arg("units")
        .assert()
        .success()
        .stdout(predicate::str::contains("metre (m, meter)"))
        .stdout(predicate::str::contains("kilometre (km, kilometer)"));

    cli(&temp_dir)
        .args(["units", "--prefixes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kilo"))
        .stdout(predicate::str::contains("10^-24"));
}

#[test]
fn test_round() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args(["round", "0.827", "0.119"])
        .assert()
        .success()
        .stdout("0.83 ± 0.12\n");

    cli(&temp_dir)
        .args(["round", "0.827", "0.367"])
        .assert()
        .success()
        .stdout("0.8 ± 0.4\n");

    cli(&temp_dir)
        .args(["round", "0.827", "0.119", "--place", "-3", "--unit", "m"])
        .assert()
        .success()
        .stdout("0.827 ± 0.119 m\n");
}

#[test]
fn test_round_json() {
    let temp_dir = setup_test_dir();
    let output = cli(&temp_dir)
        .args(["--json", "round", "1.2345", "0.0962"])
        .output()
        .expect("Failed to run qty");
    assert!(output.status.success());

    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Output is not JSON");
    assert_eq!(parsed["digits"], 2);
    assert_eq!(parsed["place"], -2);
    assert_eq!(parsed["display"], "1.23 ± 0.10");
}

#[test]
fn test_compare() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args(["compare", "eq", "10", "10.5", "--x-error", "1"])
        .assert()
        .success()
        .stdout("true\n");

    cli(&temp_dir)
        .args(["compare", "eq", "10", "13", "--x-error", "1"])
        .assert()
        .success()
        .stdout("false\n");

    cli(&temp_dir)
        .args(["compare", "lt", "1", "1100", "--x-unit", "km", "--y-unit", "m"])
        .assert()
        .success()
        .stdout("true\n");
}

#[test]
fn test_compare_rejects_bad_confidence() {
    let temp_dir = setup_test_dir();
    cli(&temp_dir)
        .args(["compare", "eq", "1", "1", "--confidence", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("InvalidArgument"));
}

#[test]
fn test_custom_units_from_config() {
    let temp_dir = setup_test_dir();
    let config = write_config(
        &temp_dir,
        r#"
[[units.custom]]
name = "foot"
factor = 0.3048
base = [{ name = "metre", power = 1 }]
aliases = ["feet"]
abbreviations = ["ft"]
"#,
    );

    cli(&temp_dir)
        .arg("--config")
        .arg(&config)
        .args(["convert", "1", "ft", "m"])
        .assert()
        .success()
        .stdout("0.3048 m\n");
}

#[test]
fn test_config_from_default_location() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path().join("metrology");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), "[rounding]\npdg = false\n").unwrap();

    cli(&temp_dir)
        .args(["convert", "3.5", "km hr^-1", "m s^-1", "--error", "0.1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.972").and(predicate::str::contains("0.028").not()));
}

#[test]
fn test_invalid_config_fails() {
    let temp_dir = setup_test_dir();
    let config = write_config(&temp_dir, "[comparison]\nconfidence = 2.0\n");

    cli(&temp_dir)
        .arg("--config")
        .arg(&config)
        .args(["units"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("confidence"));
}

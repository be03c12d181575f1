use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

// Nothing listens on the discard port, so every fetch fails fast.
const DEAD_BACKEND: &str = "http://127.0.0.1:9";

#[test]
fn cli_shows_help() {
    let mut cmd = Command::cargo_bin("metro").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("metro"))
        .stdout(predicate::str::contains("housing"));
}

#[test]
fn failed_fetch_prints_banner_and_exits_cleanly() {
    let mut cmd = Command::cargo_bin("metro").unwrap();
    cmd.env_remove("METRO_SYNTHETIC_FALLBACK")
        .args(["--base-url", DEAD_BACKEND, "--timeout-secs", "2", "housing"]);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Could not load data"))
        .stdout(predicate::str::contains("Month\tToronto\tHamilton"))
        .stdout(predicate::str::contains("(no starts data)"));
}

#[test]
fn synthetic_fallback_fills_the_table() {
    let mut cmd = Command::cargo_bin("metro").unwrap();
    cmd.args([
        "--base-url",
        DEAD_BACKEND,
        "--synthetic-fallback",
        "housing",
        "--cities",
        "Toronto;Vancouver",
        "--month",
        "3",
        "--stats",
    ]);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("synthetic"))
        .stdout(predicate::str::contains("Mar\t"))
        .stdout(predicate::str::contains("Jan\t").not());
}

#[test]
fn employment_by_province_with_synthetic_data() {
    let mut cmd = Command::cargo_bin("metro").unwrap();
    cmd.args([
        "--base-url",
        DEAD_BACKEND,
        "--synthetic-fallback",
        "employment",
        "--by",
        "province",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Ontario"))
        .stdout(predicate::str::contains("Employment %"));
}

#[test]
fn employment_plot_draws_lines() {
    let dir = tempfile::tempdir().unwrap();
    let plot = dir.path().join("employment.svg");
    let mut cmd = Command::cargo_bin("metro").unwrap();
    cmd.args(["--base-url", DEAD_BACKEND, "--synthetic-fallback", "employment", "--plot"])
        .arg(&plot);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Wrote plot"));
    let svg = std::fs::read_to_string(&plot).unwrap();
    assert!(svg.contains("<polyline"), "expected line paths");
    assert!(svg.contains("High School"));
}

#[test]
fn labour_housing_compares_per_province() {
    let dir = tempfile::tempdir().unwrap();
    let plot = dir.path().join("labour_housing.svg");
    let mut cmd = Command::cargo_bin("metro").unwrap();
    cmd.args([
        "--base-url",
        DEAD_BACKEND,
        "--synthetic-fallback",
        "labour-housing",
        "--metric",
        "unemployment",
        "--housing",
        "multi",
        "--plot",
    ])
    .arg(&plot);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("synthetic"))
        .stdout(predicate::str::contains("Province\tUnemployment rate %\tMulti-unit starts"))
        .stdout(predicate::str::contains("Ontario\t"))
        .stdout(predicate::str::contains("Alberta\t"));
    assert!(std::fs::read_to_string(&plot).unwrap().contains("<svg"));
}

#[test]
fn labour_housing_without_backend_is_empty() {
    let mut cmd = Command::cargo_bin("metro").unwrap();
    cmd.env_remove("METRO_SYNTHETIC_FALLBACK")
        .args(["--base-url", DEAD_BACKEND, "--timeout-secs", "2", "labour-housing"]);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Could not load data"))
        .stdout(predicate::str::contains("(no labour/housing data)"));
}

#[test]
fn invalid_base_url_is_rejected() {
    let mut cmd = Command::cargo_bin("metro").unwrap();
    cmd.args(["--base-url", "ftp://nope", "types"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

// Live test (opt-in): METRO_BASE_URL=... cargo test --features online
#[cfg(feature = "online")]
#[test]
fn housing_online() {
    let mut cmd = Command::cargo_bin("metro").unwrap();
    cmd.args(["housing", "--stats"]);
    cmd.assert().success().stderr(predicate::str::contains("Could not load data").not());
}

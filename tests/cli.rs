use std::process::Output;

fn zssn() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("zssn");
    for var in ["PTS_WATER", "PTS_FOOD", "PTS_MEDS", "PTS_AMMO"] {
        cmd.env_remove(var);
    }
    cmd
}

fn data_file(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn help_lists_options() {
    let output = zssn().arg("--help").assert().success().get_output().clone();
    let stdout = String::from_utf8_lossy(&output.stdout);
    for option in ["--config", "--port", "--bind", "--output-dir", "--log-level"] {
        assert!(stdout.contains(option), "{option} missing from:\n{stdout}");
    }
}

#[test]
fn missing_weights_fail_start_up() {
    let output = zssn().assert().failure().code(1).get_output().clone();
    assert!(stderr(&output).contains("PTS_WATER is not set"));
}

#[test]
fn non_numeric_env_weight_fails_start_up() {
    let output = zssn()
        .env("PTS_WATER", "4")
        .env("PTS_FOOD", "three")
        .env("PTS_MEDS", "2")
        .env("PTS_AMMO", "1")
        .assert()
        .failure()
        .get_output()
        .clone();
    assert!(stderr(&output).contains("PTS_FOOD must be a positive integer"));
}

#[test]
fn zero_weight_in_config_fails_start_up() {
    let output = zssn()
        .args(["--config", &data_file("bad_config.json")])
        .assert()
        .failure()
        .get_output()
        .clone();
    assert!(stderr(&output).contains("the water weight must be positive"));
}

#[test]
fn missing_config_file_fails_start_up() {
    let output = zssn()
        .args(["--config", &data_file("missing.json")])
        .assert()
        .failure()
        .get_output()
        .clone();
    assert!(stderr(&output).contains("I/O error"));
}

#[test]
fn invalid_log_level_is_rejected() {
    let output = zssn()
        .args(["--config", &data_file("config.json"), "--log-level", "loud"])
        .assert()
        .failure()
        .get_output()
        .clone();
    assert!(stderr(&output).contains("--log-level"));
}

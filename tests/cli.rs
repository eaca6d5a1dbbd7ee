use assert_cmd::Command;
use serde_json::{json, Value};
use std::fs;
use tempfile::tempdir;

fn write_config(dir: &std::path::Path, runs: i64, error_data: Option<Value>) -> std::path::PathBuf {
    let mut doc = json!({
        "flow_data": {"t0": 0.0, "T": 1.5, "dt0": 0.1, "flow_str": "bickley_jet", "grid_shape": [12, 8], "integration_steps": 8},
        "output_json_path": dir.join("out/result.json"),
        "iterates_per_run": 2,
        "num_benchmark_runs": runs,
        "metadata": {"package_name": "builtin", "case_description": "bickley jet 12x8"}
    });
    if let Some(e) = error_data {
        doc["error_data"] = e;
    }
    let path = dir.join("config.json");
    fs::write(&path, doc.to_string()).unwrap();
    path
}

#[test]
fn run_builtin_writes_result_document() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), 2, None);

    Command::new(env!("CARGO_BIN_EXE_ftle-bench"))
        .args(["run", "--config"])
        .arg(&config)
        .assert()
        .success();

    let doc: Value = serde_json::from_str(&fs::read_to_string(dir.path().join("out/result.json")).unwrap()).unwrap();
    assert_eq!(doc["benchmark_script"], json!("builtin_ftle.bickley_jet"));
    assert_eq!(doc["timings"]["loop_times"].as_array().unwrap().len(), 2);
    assert_eq!(doc["metadata"]["case_description"], json!("bickley jet 12x8"));
}

#[test]
fn zero_runs_fails_without_output() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), 0, None);

    Command::new(env!("CARGO_BIN_EXE_ftle-bench"))
        .args(["run", "--config"])
        .arg(&config)
        .assert()
        .failure();

    assert!(!dir.path().join("out/result.json").exists());
}

#[test]
fn command_solver_without_toolkit_is_an_environment_failure() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), 1, None);

    let output = Command::new(env!("CARGO_BIN_EXE_ftle-bench"))
        .env_remove("FTLE_TOOLKIT_PATH")
        .args(["run", "--solver", "command", "--config"])
        .arg(&config)
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("EnvironmentError"));
    assert!(!dir.path().join("out/result.json").exists());
}

#[test]
fn reference_then_validated_run_reports_zero_error() {
    let dir = tempdir().unwrap();
    let reference = dir.path().join("reference.bin");
    let config = write_config(
        dir.path(),
        1,
        Some(json!({"path": reference, "t0": 0.0, "error_params": {"source": "builtin"}})),
    );

    Command::new(env!("CARGO_BIN_EXE_ftle-bench"))
        .args(["reference", "--config"])
        .arg(&config)
        .arg("--out")
        .arg(&reference)
        .assert()
        .success();
    assert!(reference.exists());

    Command::new(env!("CARGO_BIN_EXE_ftle-bench"))
        .args(["run", "--config"])
        .arg(&config)
        .assert()
        .success();

    let doc: Value = serde_json::from_str(&fs::read_to_string(dir.path().join("out/result.json")).unwrap()).unwrap();
    assert_eq!(doc["error"]["mae"], json!(0.0));
    assert_eq!(doc["timings"]["std_loop_times"], json!(0.0));
    assert!(doc["timings"]["loop_time"].as_f64().unwrap() > 0.0);
}

#[test]
fn inline_config_json_is_accepted() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), 1, None);
    let inline = fs::read_to_string(&config).unwrap();

    Command::new(env!("CARGO_BIN_EXE_ftle-bench"))
        .args(["run", "--config-json", inline.as_str()])
        .assert()
        .success();

    assert!(dir.path().join("out/result.json").exists());
}

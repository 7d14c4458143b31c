//! Integration tests for mode selection and effective configuration output.

use std::io::Write;
use std::process::{Command, Output};

fn binary_path() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_BIN_EXE_herakles-mesos-exporter"))
}

fn run(args: &[&str]) -> Output {
    Command::new(binary_path())
        .env_remove("MESOS_EXPORTER_USERNAME")
        .env_remove("MESOS_EXPORTER_PASSWORD")
        .env_remove("MESOS_EXPORTER_PRIVATE_KEY")
        .env_remove("CADVISOR_PORT")
        .env_remove("LABELS")
        .arg("--no-config")
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn combined(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

#[test]
fn test_master_and_slave_are_exclusive() {
    let output = run(&[
        "--master",
        "http://10.0.0.1:5050",
        "--slave",
        "http://10.0.0.2:5051",
        "--check-config",
    ]);
    assert!(!output.status.success());
    assert!(combined(&output).contains("Only --master or --slave can be given at a time"));
}

#[test]
fn test_one_mode_is_required() {
    let output = run(&["--check-config"]);
    assert!(!output.status.success());
    assert!(combined(&output).contains("Either --master or --slave is required"));
}

#[test]
fn test_agent_mode_is_valid() {
    let output = run(&["--agent", "http://127.0.0.1:5051", "--check-config"]);
    assert!(output.status.success(), "{}", combined(&output));
}

#[test]
fn test_invalid_timeout_fails_at_parse_time() {
    let output = run(&["--master", "http://10.0.0.1:5050", "--timeout", "fast"]);
    assert!(!output.status.success());
}

#[test]
fn test_missing_trusted_cert_is_rejected() {
    let output = run(&[
        "--master",
        "http://10.0.0.1:5050",
        "--trusted-certs",
        "/nonexistent/ca.pem",
        "--check-config",
    ]);
    assert!(!output.status.success());
    assert!(combined(&output).contains("Trusted certificate file not found"));
}

#[test]
fn test_show_config_merges_environment_and_hides_secrets() {
    let output = Command::new(binary_path())
        .env("MESOS_EXPORTER_USERNAME", "exporter")
        .env("MESOS_EXPORTER_PASSWORD", "hunter2")
        .env("LABELS", "env=prod,team=infra")
        .env("CADVISOR_PORT", "9100")
        .args([
            "--no-config",
            "--master",
            "http://10.0.0.1:5050",
            "--show-config",
            "--config-format",
            "json",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "{}", combined(&output));
    let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["username"], "exporter");
    assert_eq!(config["sd_port"], 9100);
    assert_eq!(config["sd_labels"]["team"], "infra");
    assert!(config.get("password").is_none());
    assert!(!combined(&output).contains("hunter2"));
}

#[test]
fn test_config_file_is_loaded() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    writeln!(
        file,
        "slave = \"http://127.0.0.1:5051\"\ntimeout = \"2s\"\nexported_task_labels = [\"team\"]"
    )
    .unwrap();

    let output = Command::new(binary_path())
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "--show-config",
            "--config-format",
            "json",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "{}", combined(&output));
    let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["slave"], "http://127.0.0.1:5051");
    assert_eq!(config["timeout"], "2s");
    assert_eq!(config["exported_task_labels"][0], "team");
}

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::tempdir;

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_request-log-analyzer")
}

fn write_file(path: &Path, content: &str) {
    fs::write(path, content).expect("failed to write test file");
}

const LOG: &str = r#"Started GET "/items/7" for 127.0.0.1 at 2015-02-02 14:01:00 -0500
Processing by ItemsController#show as HTML
Completed 200 OK in 1500ms (Views: 1200.0ms | ActiveRecord: 250.5ms)
Started GET "/" for 127.0.0.1 at 2015-02-02 14:02:00 -0500
Processing by HomeController#index as HTML
Completed 200 OK in 12ms (Views: 10.0ms | ActiveRecord: 1.0ms)
"#;

#[test]
fn test_json_format_written_to_output_file_is_json() {
    let dir = tempdir().expect("temp dir");
    let log = dir.path().join("production.log");
    let out = dir.path().join("out.json");
    write_file(&log, LOG);

    let output = Command::new(bin())
        .args([
            "-F",
            "json",
            "-o",
            out.to_str().expect("utf8 path"),
            "analyze",
            log.to_str().expect("utf8 path"),
        ])
        .output()
        .expect("command should run");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let file_content = fs::read_to_string(&out).expect("output file should exist");
    let json: serde_json::Value =
        serde_json::from_str(&file_content).expect("output file should hold JSON");
    assert_eq!(json["summary"]["totals"]["completed"], 2);
    assert!(json["reports"].as_array().is_some_and(|r| !r.is_empty()));
}

#[test]
fn test_text_report_lists_reports_and_truncates() {
    let dir = tempdir().expect("temp dir");
    let log = dir.path().join("production.log");
    write_file(&log, LOG);

    let output = Command::new(bin())
        .args([
            "--color",
            "never",
            "-q",
            "analyze",
            "--top",
            "1",
            log.to_str().expect("utf8 path"),
        ])
        .output()
        .expect("command should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("REQUEST LOG ANALYSIS"));
    assert!(stdout.contains("Most requested"));
    assert!(stdout.contains("ItemsController#show.HTML"));
    assert!(stdout.contains("... and 1 more"));
    assert!(!stdout.contains('\u{1b}'), "colors should be disabled");
}

#[test]
fn test_standard_input_is_read_for_dash() {
    let mut child = Command::new(bin())
        .args(["-F", "json", "--profile", "rails3", "analyze", "-"])
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .spawn()
        .expect("command should start");

    {
        use std::io::Write;
        let mut stdin = child.stdin.take().expect("stdin");
        stdin.write_all(LOG.as_bytes()).expect("write stdin");
    }
    let output = child.wait_with_output().expect("command should finish");

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json stdout");
    assert_eq!(json["summary"]["totals"]["lines"], 6);
}

#[test]
fn test_missing_input_fails_but_still_reports_others() {
    let dir = tempdir().expect("temp dir");
    let log = dir.path().join("production.log");
    let missing = dir.path().join("missing.log");
    write_file(&log, LOG);

    let output = Command::new(bin())
        .args([
            "-F",
            "json",
            "analyze",
            log.to_str().expect("utf8 path"),
            missing.to_str().expect("utf8 path"),
        ])
        .output()
        .expect("command should run");

    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json stdout");
    assert_eq!(json["summary"]["totals"]["completed"], 2);
    assert!(json["summary"]["sources"][1]["error"].is_string());
}

#[test]
fn test_check_rejects_broken_profile() {
    let dir = tempdir().expect("temp dir");
    let profile = dir.path().join("broken.toml");
    write_file(
        &profile,
        r#"
[format]
name = "broken"

[[format.lines]]
name = "pair"
regexp = '(\w+)=(\w+)'
captures = [{ name = "key" }]
"#,
    );

    let output = Command::new(bin())
        .args(["-c", profile.to_str().expect("utf8 path"), "check"])
        .output()
        .expect("command should run");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("pair"), "stderr: {stderr}");
}

#[test]
fn test_check_describes_builtin_profile() {
    let output = Command::new(bin())
        .args(["--color", "never", "-p", "lograge", "check"])
        .output()
        .expect("command should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Profile is valid: lograge"));
    assert!(stdout.contains("log_line"));
    assert!(stdout.contains("Process blockers"));
}

#[test]
fn test_profiles_lists_builtins() {
    let output = Command::new(bin())
        .arg("profiles")
        .output()
        .expect("command should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().collect::<Vec<_>>(), vec!["rails3", "lograge"]);
}

#[test]
fn test_unknown_profile_is_an_error() {
    let output = Command::new(bin())
        .args(["-p", "apache", "check"])
        .output()
        .expect("command should run");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("apache"), "stderr: {stderr}");
}

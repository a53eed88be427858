//! CLI integration tests

use std::io::{Read, Write};
use std::process::{Command, Output, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

fn sweep(args: &[&str]) -> Output {
    let mut full = vec!["run", "-q", "-p", "sweep-cli", "--"];
    full.extend_from_slice(args);
    Command::new("cargo")
        .args(&full)
        .env_remove("SWEEP_PROFILE")
        .output()
        .expect("Failed to execute command")
}

fn account_document() -> tempfile::NamedTempFile {
    let document = r#"{
        "account_id": "123456789012",
        "candidate_regions": ["us-east-1", "eu-west-1"],
        "regions": {
            "us-east-1": {
                "resources": {
                    "cache-cluster": [
                        {
                            "id": "tmp-cache-1",
                            "created_at": "2024-01-01T00:00:00Z",
                            "shape": {
                                "attributes": {
                                    "shape_tag": "cache.t3.micro",
                                    "variant": "redis"
                                }
                            }
                        }
                    ]
                }
            }
        }
    }"#;
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(document.as_bytes())
        .expect("Failed to write account document");
    file
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = sweep(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Find and remove idle cloud resources"),
        "Should show about text"
    );
    assert!(stdout.contains("scan"), "Should show scan command");
    assert!(stdout.contains("clean"), "Should show clean command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = sweep(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("sweep"), "Should show binary name");
}

/// Test clean command help
#[test]
fn test_clean_help() {
    let output = sweep(&["clean", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Clean help should succeed");
    assert!(stdout.contains("--dry-run"), "Should show dry-run option");
    assert!(stdout.contains("--select"), "Should show select option");
    assert!(stdout.contains("--yes"), "Should show yes option");
    assert!(
        stdout.contains("--skip-final-snapshot"),
        "Should show skip-final-snapshot option"
    );
}

/// Test format option
#[test]
fn test_format_option() {
    let output = sweep(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("table"), "Should show table format");
    assert!(stdout.contains("json"), "Should show json format");
}

/// Test profile option
#[test]
fn test_profile_option() {
    let output = sweep(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--profile"), "Should show profile option");
    assert!(stdout.contains("SWEEP_PROFILE"), "Should show env var");
}

/// Test invalid command error handling
#[test]
fn test_invalid_command() {
    let output = sweep(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error") || stderr.contains("invalid"),
        "Should show error message"
    );
}

/// Test that an unknown kind is rejected by argument parsing
#[test]
fn test_invalid_kind() {
    let output = sweep(&["--kind", "queue", "scan"]);

    assert!(!output.status.success(), "Unknown kind should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("queue"), "Should name the bad value");
}

/// Test that a missing account document is fatal
#[test]
fn test_missing_account_document() {
    let output = sweep(&["--account-file", "/nonexistent/account.json", "scan"]);

    assert!(!output.status.success(), "Missing document should fail");
}

/// Test a JSON scan against a small account document
#[test]
fn test_scan_json() {
    let document = account_document();
    let path = document.path().to_string_lossy().to_string();
    let output = sweep(&["--account-file", &path, "--format", "json", "scan"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Scan should succeed");
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("Should print JSON");
    assert_eq!(report["account_id"], "123456789012");
    assert_eq!(report["summary"]["total"], 1);
}

/// Test a non-interactive dry run that selects everything
#[test]
fn test_clean_dry_run_select_all() {
    let document = account_document();
    let path = document.path().to_string_lossy().to_string();
    let output = sweep(&[
        "--account-file",
        &path,
        "--format",
        "json",
        "clean",
        "--dry-run",
        "--select",
        "all",
        "--yes",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Dry run should succeed");
    assert!(stdout.contains("\"dry_run\": true"), "Should report dry run");
    assert!(stdout.contains("tmp-cache-1"), "Should list the target");
}

/// Test that an unusable --select value fails the run
#[test]
fn test_clean_invalid_selection() {
    let document = account_document();
    let path = document.path().to_string_lossy().to_string();
    let output = sweep(&[
        "--account-file",
        &path,
        "clean",
        "--dry-run",
        "--select",
        "9",
        "--yes",
    ]);

    assert!(!output.status.success(), "Out-of-range selection should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid selection"), "Should explain why");
}

/// Test that interactive prompts keep stdout parseable with JSON output
#[test]
fn test_interactive_json_clean_keeps_stdout_clean() {
    let document = account_document();
    let mut child = Command::new(env!("CARGO_BIN_EXE_sweep"))
        .args(["--account-file"])
        .arg(document.path())
        .args(["--format", "json", "clean", "--dry-run"])
        .env_remove("SWEEP_PROFILE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start sweep");

    // proceed, select everything, confirm
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(b"y\nall\ny\n")
        .expect("Failed to answer prompts");
    let output = child.wait_with_output().expect("Failed to wait for sweep");

    assert!(output.status.success(), "Interactive dry run should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("stdout should be JSON only");
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["removed_count"], 1);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("(y/n)"), "Prompts should go to stderr");
}

/// Test that Ctrl-C at a prompt ends the run while stdin stays open
#[cfg(unix)]
#[test]
fn test_interrupt_at_prompt_exits_cleanly() {
    let document = account_document();
    let mut child = Command::new(env!("CARGO_BIN_EXE_sweep"))
        .args(["--account-file"])
        .arg(document.path())
        .args(["clean", "--dry-run"])
        .env_remove("SWEEP_PROFILE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to start sweep");
    let _stdin = child.stdin.take();

    let mut stdout = child.stdout.take().expect("stdout is piped");
    let (prompted_tx, prompted_rx) = mpsc::channel();
    thread::spawn(move || {
        let mut seen = Vec::new();
        let mut buf = [0u8; 256];
        let mut sent = false;
        while let Ok(read) = stdout.read(&mut buf) {
            if read == 0 {
                break;
            }
            seen.extend_from_slice(&buf[..read]);
            if !sent && String::from_utf8_lossy(&seen).contains("(y/n)") {
                let _ = prompted_tx.send(());
                sent = true;
            }
        }
    });

    prompted_rx
        .recv_timeout(Duration::from_secs(60))
        .expect("First prompt should appear");
    // let the prompt start listening for the signal
    thread::sleep(Duration::from_millis(500));

    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("Failed to send SIGINT");
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(10);
    let exit = loop {
        if let Some(exit) = child.try_wait().expect("Failed to poll sweep") {
            break exit;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("sweep still running after SIGINT at the prompt");
        }
        thread::sleep(Duration::from_millis(50));
    };

    assert_eq!(exit.code(), Some(0), "Interrupt at a prompt should exit 0");
}

// guardstream/tests/cli_integration_tests.rs
//! Command-line integration tests for the `guardstream` binary.
//!
//! Each test runs the real executable with `assert_cmd`, feeding stdin and checking
//! stdout (sanitized content), stderr (audit lines and messages) and the exit code.
//! `HOME` and `XDG_CONFIG_HOME` point at a temporary directory so a developer's own
//! configuration never leaks into a test.

use anyhow::Result;
#[allow(unused_imports)]
use assert_cmd::prelude::*;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

use strip_ansi_escapes::strip as strip_ansi_escapes_fn;

fn guardstream(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("guardstream").unwrap();
    cmd.env("HOME", home.path());
    cmd.env("XDG_CONFIG_HOME", home.path().join(".config"));
    cmd.env_remove("GUARDSTREAM_ALLOW_DEBUG_PII");
    cmd.env("RUST_LOG", "warn");
    cmd
}

fn run_guardstream(input: &str, args: &[&str]) -> assert_cmd::assert::Assert {
    let home = TempDir::new().unwrap();
    let mut cmd = guardstream(&home);
    cmd.args(args);
    cmd.write_stdin(input.as_bytes());
    cmd.assert()
}

fn write_config(yaml: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(yaml.as_bytes())?;
    Ok(file)
}

fn strip_ansi(s: &str) -> String {
    let cleaned = strip_ansi_escapes_fn(s);
    String::from_utf8_lossy(&cleaned).to_string()
}

#[test]
fn test_stream_redacts_stdin() {
    let input = "Contact jane@example.com or 555-867-5309 today.\n";
    let assert = run_guardstream(input, &["stream"]).success();
    let output = assert.get_output();
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "Contact [REDACTED:EMAIL] or [REDACTED:PHONE] today.\n"
    );
    let stderr = strip_ansi(&String::from_utf8_lossy(&output.stderr));
    assert!(stderr.contains("Checking 48 chars..."), "stderr: {stderr}");
    assert!(stderr.contains("Found 2 item(s): email, phone"));
    assert!(stderr.contains("Guardrail check complete"));
}

#[test]
fn test_clean_text_is_byte_identical() {
    let input = "Tide pools form where rock holds sea water at low tide";
    run_guardstream(input, &["stream", "--threshold", "8", "--overlap", "5", "--chunk-size", "3"])
        .success()
        .stdout(predicate::eq(input))
        .stderr(predicate::str::contains("No sensitive info found"));
}

#[test]
fn test_debug_logging_masks_values() {
    let input = "write to jane@example.com\n";
    run_guardstream(input, &["--debug", "stream"])
        .success()
        .stdout(predicate::str::contains("[REDACTED:EMAIL]"))
        .stderr(predicate::str::contains("Detected span").and(predicate::str::contains("jane@example.com").not()));
}

#[test]
fn test_output_and_audit_files() -> Result<()> {
    let dir = TempDir::new()?;
    let out = dir.path().join("out.txt");
    let audit = dir.path().join("audit.log");
    run_guardstream(
        "ssn 123-45-6789\n",
        &[
            "stream",
            "--output",
            out.to_str().unwrap(),
            "--audit-file",
            audit.to_str().unwrap(),
        ],
    )
    .success()
    .stdout(predicate::str::is_empty());

    assert_eq!(fs::read_to_string(&out)?, "ssn [REDACTED:SSN]\n");
    let audit = fs::read_to_string(&audit)?;
    assert!(audit.lines().next().unwrap().starts_with("Guardrail check started: session "));
    assert!(audit.contains("Found 1 item(s): ssn\n"));
    assert!(audit.ends_with('\n'));
    Ok(())
}

#[test]
fn test_unwritable_audit_file_fails_before_streaming() -> Result<()> {
    let dir = TempDir::new()?;
    let out = dir.path().join("out.txt");
    let audit = dir.path().join("no-such-dir").join("audit.log");
    run_guardstream(
        "ssn 123-45-6789\n",
        &[
            "stream",
            "--output",
            out.to_str().unwrap(),
            "--audit-file",
            audit.to_str().unwrap(),
        ],
    )
    .failure()
    .code(1)
    .stderr(predicate::str::contains("Failed to create audit file"));

    assert!(!out.exists(), "no output is created once setup has failed");
    Ok(())
}

#[test]
fn test_keyword_backend_from_config_file() -> Result<()> {
    let config = write_config(
        r#"
detector:
  policy: confidential
  backend: keyword
  keywords:
    product: ["Project Falcon"]
    financial: ["Q3 revenue"]
"#,
    )?;
    let input = "The project falcon launch beats Q3 revenue targets.";
    run_guardstream(input, &["stream", "--config", config.path().to_str().unwrap()])
        .success()
        .stdout(predicate::eq("The [REDACTED:PRODUCT] launch beats [REDACTED:FINANCIAL] targets."));
    Ok(())
}

#[test]
fn test_invalid_config_fails_before_streaming() -> Result<()> {
    let config = write_config("overlap_chars: 0\n")?;
    run_guardstream("text", &["stream", "--config", config.path().to_str().unwrap()])
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Error:").and(predicate::str::contains("overlap_chars")));
    Ok(())
}

#[test]
fn test_unreachable_remote_detector_fails_open() -> Result<()> {
    let config = write_config(
        r#"
detector:
  backend: remote
  remote:
    endpoint: "http://127.0.0.1:9/detect"
    timeout_ms: 500
"#,
    )?;
    let input = "mail jane@example.com";
    run_guardstream(input, &["stream", "--config", config.path().to_str().unwrap()])
        .success()
        .stdout(predicate::eq(input))
        .stderr(
            predicate::str::contains("Detector unavailable")
                .and(predicate::str::contains("Found").not())
                .and(predicate::str::contains("Warning:")),
        );
    Ok(())
}

#[test]
fn test_line_buffered_catches_span_split_across_lines() {
    let input = "Mail me at\njane@example.com\nthanks\n";
    run_guardstream(input, &["stream", "--line-buffered", "--threshold", "10", "--overlap", "30"])
        .success()
        .stdout(predicate::eq("Mail me at\n[REDACTED:EMAIL]\nthanks\n"));
}

#[test]
fn test_strip_ansi_before_detection() {
    let input = "\x1b[31mjane@example.com\x1b[0m\n";
    run_guardstream(input, &["stream", "--line-buffered", "--strip-ansi"])
        .success()
        .stdout(predicate::eq("[REDACTED:EMAIL]\n"));
}

#[test]
fn test_missing_input_file_is_an_error() {
    run_guardstream("", &["stream", "--input", "/definitely/not/here.txt"])
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to open input file"));
}

#[test]
fn test_detect_json_report() -> Result<()> {
    let input = "Contact jane@example.com or 555-867-5309 today.";
    let assert = run_guardstream(input, &["detect", "--json"]).success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(!stdout.contains("jane@example.com"));

    let report: serde_json::Value = serde_json::from_str(&stdout)?;
    assert_eq!(report["detector"], "pattern");
    assert_eq!(report["policy"], "pii");
    assert_eq!(report["total"], 2);
    assert_eq!(report["by_kind"]["email"], 1);
    assert_eq!(report["by_kind"]["phone"], 1);
    assert_eq!(report["items"][0]["kind"], "email");
    Ok(())
}

#[test]
fn test_detect_text_report() {
    run_guardstream("nothing to see here", &["detect"])
        .success()
        .stdout(predicate::str::contains("0 item(s) found"));
}

//! Startup behavior of the built binary.

use std::process::{Command, Stdio};

fn bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_docstore-mcp"));
    // Keep a developer's .env out of the picture
    cmd.current_dir(std::env::temp_dir())
        .env_remove("DOCSTORE_API_KEY")
        .env_remove("MCP_TRANSPORT")
        .stdin(Stdio::null());
    cmd
}

#[test]
fn test_help_flag() {
    let output = bin().arg("--help").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--transport"), "Expected flags in --help output");
}

#[test]
fn test_missing_api_key_exits_nonzero() {
    let output = bin().output().expect("failed to run");
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("DOCSTORE_API_KEY"),
        "Expected a directive naming DOCSTORE_API_KEY, got: {}",
        stderr
    );
    assert!(output.stdout.is_empty(), "No protocol output expected");
}

#[test]
fn test_missing_api_key_never_binds_http() {
    let output = bin()
        .args(["--transport", "http", "--port", "0"])
        .output()
        .expect("failed to run");
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("listening"), "listener must not start: {}", stderr);
}

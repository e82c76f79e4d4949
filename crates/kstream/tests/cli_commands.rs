#![cfg(feature = "cli")]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn kstream(args: &[&str], stdin: &[u8]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_kstream"))
        .args(["--log-level", "error"])
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("kstream should start");

    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(stdin)
        .expect("stdin should be writable");

    child.wait_with_output().expect("kstream should finish")
}

fn temp_file(tag: &str, contents: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "kstream-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::write(&path, contents).expect("temp file should be writable");
    path
}

#[test]
fn encode_base64_frame_as_raw_text() {
    let output = kstream(&["--format", "raw", "encode", "--channel", "1", "--data", "hi"], b"");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "1aGk=\n");
}

#[test]
fn decode_reports_channel_and_payload() {
    let output = kstream(&["--format", "json", "decode"], b"2b29wcw==\n");

    assert!(output.status.success());
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("decode should emit json");
    assert_eq!(payload["channel"], 2);
    assert_eq!(payload["channel_name"], "STDERR");
    assert_eq!(payload["payload"], "oops");
    assert_eq!(payload["protocol"], "base64.channel.k8s.io");
}

#[test]
fn decode_binary_frame_from_stdin() {
    let output = kstream(
        &["--format", "raw", "decode", "--protocol", "channel.k8s.io"],
        b"\x01hello",
    );

    assert!(output.status.success());
    assert_eq!(output.stdout, b"hello");
}

#[test]
fn decode_rejects_bad_channel_prefix() {
    let output = kstream(&["decode"], b"!aGk=");

    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("decode failed"));
}

#[test]
fn watch_prints_events_and_survives_bad_lines() {
    let body = concat!(
        "{\"type\":\"ADDED\",\"object\":{\"kind\":\"Pod\",\"metadata\":{\"name\":\"web-0\"}}}\n",
        "not json\n",
        "\n",
        "{\"type\":\"DELETED\",\"object\":{\"kind\":\"Pod\",\"metadata\":{\"name\":\"web-0\"}}}\r\n",
    );
    let output = kstream(&["--format", "json", "watch"], body.as_bytes());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each event should be json"))
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["type"], "ADDED");
    assert_eq!(events[1]["type"], "DELETED");
    assert_eq!(events[1]["object"]["metadata"]["name"], "web-0");
}

#[test]
fn watch_count_stops_early() {
    let line = "{\"type\":\"MODIFIED\",\"object\":{\"name\":\"n\"}}\n";
    let path = temp_file("watch", line.repeat(5).as_bytes());

    let output = Command::new(env!("CARGO_BIN_EXE_kstream"))
        .args(["--format", "raw", "watch", "--count", "2"])
        .arg(&path)
        .output()
        .expect("watch should run");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).lines().count(), 2);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn watch_missing_file_is_usage_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_kstream"))
        .args(["watch", "/nonexistent/kstream/watch.ndjson"])
        .output()
        .expect("watch should run");

    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn replay_propagates_remote_exit_code() {
    let recording = concat!(
        "1aGVsbG8K\n",
        "2d2Fybgo=\n",
        "3eyJzdGF0dXMiOiJGYWlsdXJlIiwicmVhc29uIjoiTm9uWmVyb0V4aXRDb2RlIiwiZGV0YWlscyI6eyJjYXVzZXMiOlt7InJlYXNvbiI6IkV4aXRDb2RlIiwibWVzc2FnZSI6IjQifV19fQ==\n",
    );
    let output = kstream(&["--format", "json", "replay"], recording.as_bytes());

    assert_eq!(output.status.code(), Some(4));
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("replay should emit json");
    assert_eq!(payload["stdout"], "hello\n");
    assert_eq!(payload["stderr"], "warn\n");
    assert_eq!(payload["exit_code"], 4);
}

#[test]
fn replay_without_status_succeeds() {
    let output = kstream(&["--format", "raw", "replay"], b"1b2sK\n");

    assert!(output.status.success());
    assert_eq!(output.stdout, b"ok\n");
}

#[test]
fn version_reports_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_kstream"))
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("kstream {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn extended_version_lists_protocols() {
    let output = Command::new(env!("CARGO_BIN_EXE_kstream"))
        .args(["version", "--extended"])
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("base64.channel.k8s.io"));
    assert!(stdout.contains("v4.channel.k8s.io"));
}

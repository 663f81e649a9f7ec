// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios driven against the compiled `ckd` binary over its
//! stdio wire protocol. Breaker timing, shutdown deadlines, and session
//! quota enforcement are exercised at the unit level (`ck-engine`'s
//! `breaker_tests`, `ck-daemon`'s `shutdown_tests`/`session_tests`) against
//! a `FakeClock`, since those properties depend on controlling time
//! precisely; this file covers what a real client actually observes
//! talking to a real process over real pipes.

use assert_cmd::cargo::CommandCargoExt;
use serde_json::{json, Value};
use serial_test::serial;
use similar_asserts::assert_eq as similar_assert_eq;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;

struct Daemon {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    _workspace: TempDir,
    _store: TempDir,
}

impl Daemon {
    fn spawn(extra_env: &[(&str, &str)]) -> Self {
        let workspace = TempDir::new().expect("create workspace tempdir");
        let store = TempDir::new().expect("create store tempdir");

        let mut cmd = Command::cargo_bin("ckd").expect("ckd binary is built");
        cmd.env("CK_WORKSPACE_DIR", workspace.path())
            .env("CK_STORE_PATH", store.path().join("db"))
            .env("CK_TRANSPORT_TYPE", "stdio")
            .env("CK_LOG_LEVEL", "error")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        for (key, value) in extra_env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().expect("spawn ckd");
        let stdin = child.stdin.take().expect("child stdin");
        let stdout = BufReader::new(child.stdout.take().expect("child stdout"));
        Self { child, stdin, stdout, _workspace: workspace, _store: store }
    }

    fn send(&mut self, value: &Value) {
        let mut line = serde_json::to_string(value).expect("serialize request");
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).expect("write request");
        self.stdin.flush().expect("flush request");
    }

    fn recv(&mut self) -> Value {
        let mut line = String::new();
        self.stdout.read_line(&mut line).expect("read response line");
        assert!(!line.is_empty(), "daemon closed stdout before responding");
        serde_json::from_str(line.trim()).expect("response line is valid json")
    }

    /// Closes stdin (the transport's EOF signal) and waits for the process
    /// to run its shutdown sequence and exit on its own.
    fn close_and_wait(mut self) -> std::process::ExitStatus {
        drop(self.stdin);
        self.child.wait().expect("ckd exits after stdin closes")
    }
}

fn initialize(daemon: &mut Daemon) {
    daemon.send(&json!({
        "id": 1,
        "method": "initialize",
        "params": { "protocolVersion": "2024-11-05", "clientInfo": { "name": "t", "version": "1" } },
    }));
    let response = daemon.recv();
    assert_eq!(response["id"], 1);
    assert!(response.get("error").is_none(), "initialize failed: {response}");

    // `initialized` is a notification: no `id`, no response.
    daemon.send(&json!({ "method": "initialized" }));
}

/// Scenario 1: a fresh tool call with no prior session mints one, and the
/// response reports the updated session count.
#[test]
#[serial]
fn fresh_session_and_tool_call() {
    let mut daemon = Daemon::spawn(&[]);
    initialize(&mut daemon);

    daemon.send(&json!({ "id": 2, "method": "tools/list" }));
    let list = daemon.recv();
    let tools = list["result"]["tools"].as_array().expect("tools array");

    let mut names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().expect("tool name is a string")).collect();
    names.sort_unstable();
    let expected = vec![
        "analyze_repository",
        "build_image",
        "deploy_k8s",
        "generate_dockerfile",
        "generate_k8s_manifests",
        "pull_image",
        "push_image",
        "scan_image",
        "tag_image",
    ];
    similar_assert_eq!(names, expected);

    daemon.send(&json!({
        "id": 3,
        "method": "tools/call",
        "params": { "name": "generate_dockerfile", "arguments": { "session_id": "", "template": "go" } },
    }));
    let call = daemon.recv();
    assert_eq!(call["id"], 3);
    let result = call.get("result").unwrap_or_else(|| panic!("tools/call 3 failed: {call}"));
    assert_eq!(result["success"], true);
    let session_id = result["session_id"].as_str().expect("session_id present");
    assert!(!session_id.is_empty(), "session_id should have been minted");
    assert_eq!(result["stats"]["total_sessions"], 1);

    let status = daemon.close_and_wait();
    assert!(status.success(), "daemon should exit cleanly on stdin EOF: {status:?}");
}

/// Scenario 6: every tool in `tools/list` carries a conformant schema —
/// root `object` type, no `$ref`/`definitions`, serialized size within the
/// 8 KiB ceiling.
#[test]
#[serial]
fn schema_regression() {
    let mut daemon = Daemon::spawn(&[]);
    initialize(&mut daemon);

    daemon.send(&json!({ "id": 2, "method": "tools/list" }));
    let list = daemon.recv();
    let tools = list["result"]["tools"].as_array().expect("tools array");
    assert!(!tools.is_empty(), "registry should expose at least one tool");

    for tool in tools {
        let schema = &tool["inputSchema"];
        assert_eq!(schema["type"], "object", "tool {} root type must be object", tool["name"]);

        let serialized = serde_json::to_string(schema).expect("serialize schema");
        assert!(!serialized.contains("$ref"), "tool {} schema contains $ref", tool["name"]);
        assert!(!serialized.contains("definitions"), "tool {} schema contains definitions", tool["name"]);
        assert!(serialized.len() <= 8192, "tool {} schema exceeds 8 KiB ({} bytes)", tool["name"], serialized.len());
    }

    daemon.close_and_wait();
}

/// An unknown method gets the reserved JSON-RPC "method not found" code,
/// not an application error.
#[test]
#[serial]
fn unknown_method_returns_reserved_error_code() {
    let mut daemon = Daemon::spawn(&[]);
    initialize(&mut daemon);

    daemon.send(&json!({ "id": 2, "method": "tools/frobnicate" }));
    let response = daemon.recv();
    assert_eq!(response["error"]["code"], -32601);

    daemon.close_and_wait();
}

/// A malformed `tools/call` (missing the required `name` field) is
/// rejected with invalid-params, not dispatched to any tool.
#[test]
#[serial]
fn malformed_tools_call_is_rejected() {
    let mut daemon = Daemon::spawn(&[]);
    initialize(&mut daemon);

    daemon.send(&json!({
        "id": 2,
        "method": "tools/call",
        "params": { "arguments": { "session_id": "" } },
    }));
    let response = daemon.recv();
    assert_eq!(response["error"]["code"], -32602);

    daemon.close_and_wait();
}

/// Requesting a tool the registry doesn't know about surfaces a
/// `not-found` application error rather than crashing the connection.
#[test]
#[serial]
fn unknown_tool_name_is_not_found() {
    let mut daemon = Daemon::spawn(&[]);
    initialize(&mut daemon);

    daemon.send(&json!({
        "id": 2,
        "method": "tools/call",
        "params": { "name": "definitely_not_a_real_tool", "arguments": { "session_id": "" } },
    }));
    let response = daemon.recv();
    assert_eq!(response["error"]["code"], -32000);
    assert_eq!(response["error"]["data"]["kind"], "not-found");

    daemon.close_and_wait();
}

/// Repeated `tools/call` invocations with `session_id: ""` each mint a
/// distinct session, and `tools/list` round-trips the same catalog shape
/// regardless of how many sessions are open.
#[test]
#[serial]
fn distinct_empty_session_ids_mint_distinct_sessions() {
    let mut daemon = Daemon::spawn(&[("CK_MAX_SESSIONS", "10")]);
    initialize(&mut daemon);

    let mut seen = std::collections::HashSet::new();
    for i in 0..3 {
        daemon.send(&json!({
            "id": 10 + i,
            "method": "tools/call",
            "params": { "name": "generate_dockerfile", "arguments": { "session_id": "", "template": "rust" } },
        }));
        let call = daemon.recv();
        let result = call.get("result").unwrap_or_else(|| panic!("tools/call {} failed: {call}", 10 + i));
        let session_id = result["session_id"].as_str().expect("session_id present").to_string();
        assert!(seen.insert(session_id), "expected a fresh session id each call");
        assert_eq!(result["stats"]["total_sessions"], (i + 1) as i64);
    }

    daemon.close_and_wait();
}

/// A graceful shutdown triggered by stdin EOF happens within a generous
/// wall-clock budget even with no in-flight work, confirming the daemon
/// doesn't hang waiting on anything once the transport closes.
#[test]
#[serial]
fn clean_shutdown_on_stdin_close_is_prompt() {
    let mut daemon = Daemon::spawn(&[]);
    initialize(&mut daemon);

    let start = std::time::Instant::now();
    let status = daemon.close_and_wait();
    assert!(status.success());
    assert!(start.elapsed() < Duration::from_secs(10), "shutdown took unexpectedly long");
}

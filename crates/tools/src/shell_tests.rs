// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ck_core::ErrorKind;

#[tokio::test]
async fn successful_command_captures_stdout() {
    let out = run("echo", &["hello"]).await.unwrap();
    assert_eq!(out.stdout.trim(), "hello");
}

#[tokio::test]
async fn nonzero_exit_is_transient() {
    let err = run("sh", &["-c", "exit 7"]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Transient);
}

#[tokio::test]
async fn missing_binary_is_internal() {
    let err = run("ck-tools-definitely-not-a-real-binary", &[]).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Internal);
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin wrapper around shelling out to external binaries (docker, trivy)
//! rather than linking a Docker client library.

use ck_core::{ErrorKind, TaggedError};
use tokio::process::Command;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs `program` with `args`, returning stdout/stderr on success.
/// A nonzero exit is *transient* (the orchestrator may retry); a failure
/// to spawn the binary at all is *internal* (the binary is missing or
/// unusable, retrying won't help).
pub async fn run(program: &str, args: &[&str]) -> Result<CommandOutput, TaggedError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| TaggedError::new(ErrorKind::Internal, format!("failed to spawn {program}: {e}")))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(TaggedError::new(
            ErrorKind::Transient,
            format!("{program} {} exited with {}: {stderr}", args.join(" "), output.status),
        ));
    }

    Ok(CommandOutput { stdout, stderr })
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;

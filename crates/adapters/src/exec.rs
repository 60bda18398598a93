// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin wrapper over [`tokio::process`] for the external binaries the
//! daemon drives (nft, journalctl, systemctl, ssh, scp).

use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("i/o talking to `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured result of one external invocation.
#[derive(Debug, Clone)]
pub struct Output {
    pub rc: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Output {
    pub fn success(&self) -> bool {
        self.rc == 0
    }
}

/// Run a command to completion, optionally feeding stdin, bounded by a
/// timeout. A killed-by-signal exit reports rc -1.
pub async fn run(
    program: &str,
    args: &[&str],
    stdin: Option<&str>,
    timeout: Duration,
) -> Result<Output, ExecError> {
    let label = || format!("{program} {}", args.join(" "));

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|source| ExecError::Spawn { command: label(), source })?;

    if let (Some(mut handle), Some(input)) = (child.stdin.take(), stdin) {
        handle
            .write_all(input.as_bytes())
            .await
            .map_err(|source| ExecError::Io { command: label(), source })?;
        drop(handle);
    }

    let waited = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| ExecError::Timeout { command: label(), timeout })?
        .map_err(|source| ExecError::Io { command: label(), source })?;

    Ok(Output {
        rc: waited.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&waited.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&waited.stderr).into_owned(),
    })
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;

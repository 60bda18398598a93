// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! journalctl-backed source reading.
//!
//! Output lines follow the classic syslog shape:
//! `Aug  1 12:34:56 host sshd[1234]: Failed password ...`
//! The first five whitespace tokens are metadata; the fifth (`sshd[1234]`)
//! is a best-effort process identity used as the conversation key, so the
//! lines of one session concatenate into one searchable message.

use crate::exec;
use crate::source::{ConversationMap, ReadError};
use std::time::Duration;

const JOURNAL_TIMEOUT: Duration = Duration::from_secs(30);
const SSH_CONNECT_TIMEOUT_SECS: u32 = 10;

/// Delimiter between messages of one conversation.
pub const MESSAGE_JOIN: &str = "|";

/// Which journal to ask, and how.
#[derive(Debug, Clone)]
pub struct JournalSpec {
    pub unit: String,
    pub remote: Option<RemoteEnd>,
}

#[derive(Debug, Clone)]
pub struct RemoteEnd {
    pub host: String,
    pub user: Option<String>,
    pub port: Option<u16>,
}

impl JournalSpec {
    pub fn local(unit: &str) -> Self {
        Self { unit: unit.to_string(), remote: None }
    }

    pub fn remote(unit: &str, host: &str, user: Option<&str>, port: Option<u16>) -> Self {
        Self {
            unit: unit.to_string(),
            remote: Some(RemoteEnd {
                host: host.to_string(),
                user: user.map(str::to_string),
                port,
            }),
        }
    }
}

/// Pull entries for the unit within the lookback window and group them.
pub async fn read(spec: &JournalSpec, lookback: Duration) -> Result<ConversationMap, ReadError> {
    let since = format!("--since=-{}s", lookback.as_secs().max(1));
    let journal_args = ["-u", spec.unit.as_str(), since.as_str(), "--no-pager", "-q"];

    let output = match &spec.remote {
        None => exec::run("journalctl", &journal_args, None, JOURNAL_TIMEOUT).await,
        Some(end) => {
            let target = match &end.user {
                Some(user) => format!("{user}@{}", end.host),
                None => end.host.clone(),
            };
            let connect = format!("ConnectTimeout={SSH_CONNECT_TIMEOUT_SECS}");
            let port;
            let mut args = vec!["-o", "BatchMode=yes", "-o", connect.as_str()];
            if let Some(p) = end.port {
                port = p.to_string();
                args.push("-p");
                args.push(port.as_str());
            }
            args.push(target.as_str());
            args.push("journalctl");
            args.extend_from_slice(&journal_args);
            exec::run("ssh", &args, None, JOURNAL_TIMEOUT).await
        }
    }
    .map_err(|e| ReadError::Journal { unit: spec.unit.clone(), detail: e.to_string() })?;

    if !output.success() {
        return Err(ReadError::Journal {
            unit: spec.unit.clone(),
            detail: format!("rc {}: {}", output.rc, output.stderr.trim()),
        });
    }

    Ok(group_lines(&output.stdout))
}

/// Group raw journal lines into conversations keyed by the fifth token.
pub fn group_lines(raw: &str) -> ConversationMap {
    let mut conversations = ConversationMap::new();
    for line in raw.lines() {
        let mut tokens = line.split_whitespace();
        let Some(key) = tokens.nth(4) else { continue };
        let message = tokens.collect::<Vec<_>>().join(" ");
        if message.is_empty() {
            continue;
        }
        conversations
            .entry(key.to_string())
            .and_modify(|existing| {
                existing.push_str(MESSAGE_JOIN);
                existing.push_str(&message);
            })
            .or_insert(message);
    }
    conversations
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;

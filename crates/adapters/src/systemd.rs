// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Which units are actually running, locally and (best-effort) remotely.

use crate::exec;
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("systemctl probe failed: {0}")]
    Local(String),

    #[error("remote probe of `{host}` failed: {detail}")]
    Remote { host: String, detail: String },
}

/// Asks the host which service units are running.
#[async_trait]
pub trait UnitProbe: Send + Sync {
    async fn running_units(&self) -> Result<HashSet<String>, ProbeError>;

    /// Best-effort remote probe; callers treat failure as "no units".
    async fn remote_running_units(
        &self,
        host: &str,
        user: Option<&str>,
        port: Option<u16>,
    ) -> Result<HashSet<String>, ProbeError>;
}

/// systemctl-backed probe.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemdProbe;

const LIST_ARGS: &[&str] =
    &["list-units", "--type=service", "--state=running", "--no-legend", "--plain"];

#[async_trait]
impl UnitProbe for SystemdProbe {
    async fn running_units(&self) -> Result<HashSet<String>, ProbeError> {
        let out = exec::run("systemctl", LIST_ARGS, None, PROBE_TIMEOUT)
            .await
            .map_err(|e| ProbeError::Local(e.to_string()))?;
        if !out.success() {
            return Err(ProbeError::Local(format!("rc {}: {}", out.rc, out.stderr.trim())));
        }
        Ok(parse_unit_list(&out.stdout))
    }

    async fn remote_running_units(
        &self,
        host: &str,
        user: Option<&str>,
        port: Option<u16>,
    ) -> Result<HashSet<String>, ProbeError> {
        let target = match user {
            Some(user) => format!("{user}@{host}"),
            None => host.to_string(),
        };
        let port_value;
        let mut args: Vec<&str> = vec!["-o", "BatchMode=yes", "-o", "ConnectTimeout=10"];
        if let Some(p) = port {
            port_value = p.to_string();
            args.push("-p");
            args.push(port_value.as_str());
        }
        args.push(target.as_str());
        args.push("systemctl");
        args.extend_from_slice(LIST_ARGS);

        let out = exec::run("ssh", &args, None, PROBE_TIMEOUT)
            .await
            .map_err(|e| ProbeError::Remote { host: host.to_string(), detail: e.to_string() })?;
        if !out.success() {
            return Err(ProbeError::Remote {
                host: host.to_string(),
                detail: format!("rc {}: {}", out.rc, out.stderr.trim()),
            });
        }
        Ok(parse_unit_list(&out.stdout))
    }
}

/// First column of `systemctl list-units --no-legend --plain`.
pub fn parse_unit_list(raw: &str) -> HashSet<String> {
    raw.lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "systemd_tests.rs"]
mod tests;

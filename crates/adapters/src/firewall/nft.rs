// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! nftables backend driving the `nft` binary.
//!
//! The table and all six sets are provisioned out-of-band; this module
//! only mutates elements. Dynamic sets must be declared with `timeout`
//! (and typically `flags interval`), which is why an insert of an already
//! present element reports an interval overlap rather than succeeding —
//! that rc is classified benign below.

use super::{BlockOutcome, FirewallBackend, FirewallError};
use crate::exec;
use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use ipnetwork::IpNetwork;
use serde_json::Value;
use std::time::Duration;
use warden_config::FirewallIds;
use warden_core::{canonical, Clock, EnforcedEntry};

const NFT_TIMEOUT: Duration = Duration::from_secs(15);

/// Non-zero `nft` exits whose stderr marks an acceptable condition.
/// Everything not in this table is a hard failure.
///
/// | rc | stderr fragment        | meaning                         |
/// |----|------------------------|---------------------------------|
/// | 1  | `interval overlaps`    | element already in interval set |
/// | 1  | `File exists`          | element already present         |
const BENIGN: &[(i32, &str)] = &[(1, "interval overlaps"), (1, "File exists")];

fn is_benign(rc: i32, stderr: &str) -> bool {
    BENIGN.iter().any(|(code, needle)| *code == rc && stderr.contains(needle))
}

pub struct NftFirewall<C: Clock> {
    ids: FirewallIds,
    clock: C,
}

impl<C: Clock> NftFirewall<C> {
    pub fn new(ids: FirewallIds, clock: C) -> Self {
        Self { ids, clock }
    }

    fn dynamic_set(&self, ip: &IpNetwork) -> &str {
        match ip {
            IpNetwork::V4(_) => &self.ids.set_v4,
            IpNetwork::V6(_) => &self.ids.set_v6,
        }
    }

    /// `10.1.2.3/32` renders as the bare address; real prefixes keep the
    /// `/len` suffix.
    fn render(net: &IpNetwork) -> String {
        let host_prefix = match net {
            IpNetwork::V4(_) => 32,
            IpNetwork::V6(_) => 128,
        };
        if net.prefix() == host_prefix {
            net.ip().to_string()
        } else {
            net.to_string()
        }
    }

    async fn list_set(&self, set: &str, now: chrono::DateTime<chrono::Utc>) -> Result<Vec<EnforcedEntry>, FirewallError> {
        let out = exec::run(
            "nft",
            &["-j", "list", "set", &self.ids.table_family, &self.ids.table_name, set],
            None,
            NFT_TIMEOUT,
        )
        .await
        .map_err(|e| FirewallError::Exec(e.to_string()))?;

        if !out.success() {
            return Err(FirewallError::Exec(format!(
                "nft list set {set} rc {}: {}",
                out.rc,
                out.stderr.trim()
            )));
        }

        parse_set_elements(&out.stdout, now)
    }
}

#[async_trait]
impl<C: Clock> FirewallBackend for NftFirewall<C> {
    async fn block(&self, ip: IpNetwork, ttl: Duration) -> Result<BlockOutcome, FirewallError> {
        let element = format!("{{ {} timeout {}s }}", Self::render(&ip), ttl.as_secs().max(1));
        let out = exec::run(
            "nft",
            &[
                "add",
                "element",
                &self.ids.table_family,
                &self.ids.table_name,
                self.dynamic_set(&ip),
                &element,
            ],
            None,
            NFT_TIMEOUT,
        )
        .await
        .map_err(|e| FirewallError::Exec(e.to_string()))?;

        let expires_at = self.clock.now() + ChronoDuration::seconds(ttl.as_secs().max(1) as i64);

        if out.success() {
            return Ok(BlockOutcome::Applied { expires_at });
        }
        if is_benign(out.rc, &out.stderr) {
            tracing::debug!(ip = %ip, rc = out.rc, "element already present, treating as applied");
            return Ok(BlockOutcome::Applied { expires_at });
        }
        Ok(BlockOutcome::Rejected { reason: out.stderr.trim().to_string(), rc: out.rc })
    }

    async fn refresh_static(
        &self,
        never_v4: &[IpNetwork],
        never_v6: &[IpNetwork],
        always_v4: &[IpNetwork],
        always_v6: &[IpNetwork],
    ) -> Result<(), FirewallError> {
        let script = build_refresh_script(&self.ids, never_v4, never_v6, always_v4, always_v6);
        let out = exec::run("nft", &["-f", "-"], Some(&script), NFT_TIMEOUT)
            .await
            .map_err(|e| FirewallError::Exec(e.to_string()))?;
        if !out.success() {
            return Err(FirewallError::Exec(format!(
                "static refresh rc {}: {}",
                out.rc,
                out.stderr.trim()
            )));
        }
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<EnforcedEntry>, FirewallError> {
        let now = self.clock.now();
        let mut entries = self.list_set(&self.ids.set_v4, now).await?;
        entries.extend(self.list_set(&self.ids.set_v6, now).await?);
        Ok(entries)
    }
}

/// One `nft -f -` script flushing and repopulating the four static sets.
pub fn build_refresh_script(
    ids: &FirewallIds,
    never_v4: &[IpNetwork],
    never_v6: &[IpNetwork],
    always_v4: &[IpNetwork],
    always_v6: &[IpNetwork],
) -> String {
    let mut script = String::new();
    let sets: [(&str, &[IpNetwork]); 4] = [
        (&ids.never_set_v4, never_v4),
        (&ids.never_set_v6, never_v6),
        (&ids.always_set_v4, always_v4),
        (&ids.always_set_v6, always_v6),
    ];
    for (set, nets) in sets {
        script.push_str(&format!("flush set {} {} {}\n", ids.table_family, ids.table_name, set));
        if !nets.is_empty() {
            let elements =
                nets.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(", ");
            script.push_str(&format!(
                "add element {} {} {} {{ {} }}\n",
                ids.table_family, ids.table_name, set, elements
            ));
        }
    }
    script
}

/// Extract `(element, residual ttl)` pairs from `nft -j list set` output.
///
/// Elements appear either as bare values (no timeout) or as
/// `{"elem": {"val": ..., "expires": <secs>}}`; values are plain address
/// strings or `{"prefix": {"addr": ..., "len": ...}}`. Entries without a
/// residual ttl are skipped: a dynamic set only holds timed elements, so
/// anything else is foreign.
pub fn parse_set_elements(
    json: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<Vec<EnforcedEntry>, FirewallError> {
    let doc: Value =
        serde_json::from_str(json).map_err(|e| FirewallError::BadJson(e.to_string()))?;
    let mut entries = Vec::new();

    let objects = doc
        .get("nftables")
        .and_then(Value::as_array)
        .ok_or_else(|| FirewallError::BadJson("missing `nftables` array".into()))?;

    for object in objects {
        let Some(elems) = object.pointer("/set/elem").and_then(Value::as_array) else {
            continue;
        };
        for elem in elems {
            let Some(inner) = elem.get("elem") else { continue };
            let Some(expires) = inner.get("expires").and_then(Value::as_u64) else { continue };
            let Some(net) = parse_element_value(inner.get("val")) else { continue };
            entries.push(EnforcedEntry {
                ip: net,
                expires_at: now + ChronoDuration::seconds(expires as i64),
            });
        }
    }

    Ok(entries)
}

fn parse_element_value(val: Option<&Value>) -> Option<IpNetwork> {
    match val? {
        Value::String(addr) => addr.parse().ok().map(|ip: std::net::IpAddr| canonical(ip)),
        Value::Object(map) => {
            let prefix = map.get("prefix")?;
            let addr = prefix.get("addr")?.as_str()?;
            let len = prefix.get("len")?.as_u64()?;
            format!("{addr}/{len}").parse().ok()
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "nft_tests.rs"]
mod tests;

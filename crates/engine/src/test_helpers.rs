// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fakes for exercising the pipeline without journald, nft, or Postgres.

#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use warden_adapters::{
    BlockOutcome, ConversationMap, FirewallBackend, FirewallError, ProbeError, ReadError, Source,
    SourceReader, UnitProbe,
};
use warden_core::EnforcedEntry;

/// Reader serving canned conversations per source key.
#[derive(Default)]
pub struct FakeReader {
    pub conversations: Mutex<HashMap<String, ConversationMap>>,
    pub failing: Mutex<HashSet<String>>,
}

impl FakeReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, source_key: &str, conv_key: &str, message: &str) {
        self.conversations
            .lock()
            .entry(source_key.to_string())
            .or_default()
            .insert(conv_key.to_string(), message.to_string());
    }

    pub fn fail(&self, source_key: &str) {
        self.failing.lock().insert(source_key.to_string());
    }

    pub fn clear(&self) {
        self.conversations.lock().clear();
    }
}

#[async_trait]
impl SourceReader for FakeReader {
    async fn read(
        &self,
        source: &Source,
        _lookback: Duration,
        _max_file_lines: usize,
    ) -> Result<ConversationMap, ReadError> {
        let key = source.key();
        if self.failing.lock().contains(&key) {
            return Err(ReadError::Journal { unit: key, detail: "injected failure".into() });
        }
        Ok(self.conversations.lock().get(&key).cloned().unwrap_or_default())
    }
}

/// Firewall recording every call, with scriptable outcomes.
#[derive(Default)]
pub struct FakeFirewall {
    pub blocks: Mutex<Vec<(IpNetwork, Duration)>>,
    pub refreshes: Mutex<Vec<(usize, usize, usize, usize)>>,
    pub kernel: Mutex<Vec<EnforcedEntry>>,
    pub reject_with: Mutex<Option<(String, i32)>>,
    pub now: Mutex<DateTime<Utc>>,
}

impl FakeFirewall {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now), ..Self::default() }
    }

    pub fn set_now(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    /// Script the kernel snapshot returned by `snapshot()`.
    pub fn set_kernel(&self, entries: Vec<EnforcedEntry>) {
        *self.kernel.lock() = entries;
    }

    pub fn reject_with(&self, reason: &str, rc: i32) {
        *self.reject_with.lock() = Some((reason.to_string(), rc));
    }

    pub fn block_count(&self) -> usize {
        self.blocks.lock().len()
    }
}

#[async_trait]
impl FirewallBackend for FakeFirewall {
    async fn block(&self, ip: IpNetwork, ttl: Duration) -> Result<BlockOutcome, FirewallError> {
        self.blocks.lock().push((ip, ttl));
        if let Some((reason, rc)) = self.reject_with.lock().clone() {
            return Ok(BlockOutcome::Rejected { reason, rc });
        }
        let expires_at = *self.now.lock() + chrono::Duration::seconds(ttl.as_secs() as i64);
        self.kernel.lock().push(EnforcedEntry { ip, expires_at });
        Ok(BlockOutcome::Applied { expires_at })
    }

    async fn refresh_static(
        &self,
        never_v4: &[IpNetwork],
        never_v6: &[IpNetwork],
        always_v4: &[IpNetwork],
        always_v6: &[IpNetwork],
    ) -> Result<(), FirewallError> {
        self.refreshes.lock().push((
            never_v4.len(),
            never_v6.len(),
            always_v4.len(),
            always_v6.len(),
        ));
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<EnforcedEntry>, FirewallError> {
        Ok(self.kernel.lock().clone())
    }
}

/// Unit probe with a scripted set of running units.
#[derive(Default)]
pub struct FakeProbe {
    pub local: Mutex<Option<HashSet<String>>>,
    pub remote: Mutex<HashMap<String, HashSet<String>>>,
}

impl FakeProbe {
    pub fn running(units: &[&str]) -> Self {
        let probe = Self::default();
        *probe.local.lock() = Some(units.iter().map(|s| s.to_string()).collect());
        probe
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn set_remote(&self, host: &str, units: &[&str]) {
        self.remote
            .lock()
            .insert(host.to_string(), units.iter().map(|s| s.to_string()).collect());
    }
}

#[async_trait]
impl UnitProbe for FakeProbe {
    async fn running_units(&self) -> Result<HashSet<String>, ProbeError> {
        self.local
            .lock()
            .clone()
            .ok_or_else(|| ProbeError::Local("injected probe failure".into()))
    }

    async fn remote_running_units(
        &self,
        host: &str,
        _user: Option<&str>,
        _port: Option<u16>,
    ) -> Result<HashSet<String>, ProbeError> {
        self.remote.lock().get(host).cloned().ok_or_else(|| ProbeError::Remote {
            host: host.to_string(),
            detail: "injected probe failure".into(),
        })
    }
}

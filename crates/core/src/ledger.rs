// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory mirror of the blocks currently enforced on this host.
//!
//! The kernel ruleset is the source of truth; the ledger exists so the
//! filter can short-circuit already-enforced addresses between heartbeat
//! reconciliations. It is owned exclusively by the supervisor loop and is
//! deliberately not persisted.

use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One enforced block with its absolute expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcedEntry {
    pub ip: IpNetwork,
    pub expires_at: DateTime<Utc>,
}

/// `ip → expires_at` for every block believed to be in the kernel.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: HashMap<IpNetwork, DateTime<Utc>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an applied block. A re-insert overwrites the expiry, which
    /// keeps a repeated `block(ip, ttl)` indistinguishable from a single
    /// call.
    pub fn insert(&mut self, ip: IpNetwork, expires_at: DateTime<Utc>) {
        self.entries.insert(ip, expires_at);
    }

    /// Is `ip` enforced and unexpired as of `now`?
    pub fn contains_active(&self, ip: &IpNetwork, now: DateTime<Utc>) -> bool {
        self.entries.get(ip).is_some_and(|expires| *expires > now)
    }

    /// Drop entries whose expiry has passed. Returns how many were pruned.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expires| *expires > now);
        before - self.entries.len()
    }

    /// Wholesale replacement from a kernel snapshot. Entries the kernel no
    /// longer reports are gone after this, whatever their local expiry said.
    pub fn reconcile(&mut self, snapshot: Vec<EnforcedEntry>) {
        self.entries = snapshot.into_iter().map(|e| (e.ip, e.expires_at)).collect();
    }

    pub fn entries(&self) -> impl Iterator<Item = EnforcedEntry> + '_ {
        self.entries.iter().map(|(ip, expires_at)| EnforcedEntry { ip: *ip, expires_at: *expires_at })
    }

    pub fn expiry_of(&self, ip: &IpNetwork) -> Option<DateTime<Utc>> {
        self.entries.get(ip).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;

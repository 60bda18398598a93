// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rows exchanged with the shared block store.

use crate::hit::Hit;
use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

/// Persisted block decision, primary key `(ip, origin_host)`.
///
/// The daemon only appends and upserts; garbage collection of old rows
/// belongs to an external process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub ip: IpNetwork,
    pub origin_host: String,
    pub service: String,
    pub detector: String,
    pub pattern: String,
    pub sample: String,
    pub first_blocked_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub count: i64,
}

impl BlockRecord {
    /// Build the publishable row for a hit that was just enforced.
    pub fn from_hit(hit: &Hit, expires_at: DateTime<Utc>) -> Self {
        Self {
            ip: hit.ip,
            origin_host: hit.origin_host.clone(),
            service: hit.service.clone(),
            detector: hit.detector.clone(),
            pattern: hit.pattern.clone(),
            sample: hit.sample.clone(),
            first_blocked_at: hit.first_seen,
            last_seen_at: hit.last_seen,
            expires_at,
            count: 1,
        }
    }
}

/// Peer-published block as pulled by the inbox: just enough to enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerBlock {
    pub ip: IpNetwork,
    pub expires_at: DateTime<Utc>,
}

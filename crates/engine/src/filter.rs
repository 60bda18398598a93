// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Classification of candidate addresses.
//!
//! The local never-block policy is authoritative on this node: it beats
//! hits, peer-published blocks, and plugin entries alike.

use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use warden_core::{CidrSet, Ledger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Protected by a never-block CIDR; must not reach the firewall or
    /// the outbox.
    NeverBlock,
    /// Already present in the ledger with an unexpired ttl.
    AlreadyEnforced,
    /// Forward to the firewall.
    Candidate,
}

pub fn classify(
    net: &IpNetwork,
    never_block: &CidrSet,
    ledger: &Ledger,
    now: DateTime<Utc>,
) -> Classification {
    if never_block.contains(net.ip()) {
        return Classification::NeverBlock;
    }
    if ledger.contains_active(net, now) {
        return Classification::AlreadyEnforced;
    }
    Classification::Candidate
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Firewall backend seam.
//!
//! The engine only sees this trait. The production implementation drives
//! the `nft` binary; the dry-run implementation logs what it would do and
//! reports success without touching the kernel.

mod dry_run;
mod nft;

pub use dry_run::DryRunFirewall;
pub use nft::NftFirewall;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use std::time::Duration;
use thiserror::Error;
use warden_core::EnforcedEntry;

#[derive(Debug, Error)]
pub enum FirewallError {
    #[error("failed to run nft: {0}")]
    Exec(String),

    #[error("unparseable nft json output: {0}")]
    BadJson(String),
}

/// Outcome of one insert attempt.
///
/// `Rejected` is a hard failure: the caller must not touch the ledger and
/// must not publish. A benign "already present" condition surfaces as
/// `Applied`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    Applied { expires_at: DateTime<Utc> },
    Rejected { reason: String, rc: i32 },
}

#[async_trait]
pub trait FirewallBackend: Send + Sync {
    /// Insert `ip` into the dynamic set of its family with the given ttl.
    async fn block(&self, ip: IpNetwork, ttl: Duration) -> Result<BlockOutcome, FirewallError>;

    /// Flush and repopulate the four static sets from config.
    async fn refresh_static(
        &self,
        never_v4: &[IpNetwork],
        never_v6: &[IpNetwork],
        always_v4: &[IpNetwork],
        always_v6: &[IpNetwork],
    ) -> Result<(), FirewallError>;

    /// Current contents of both dynamic sets, residual ttls converted to
    /// absolute expiries.
    async fn snapshot(&self) -> Result<Vec<EnforcedEntry>, FirewallError>;
}

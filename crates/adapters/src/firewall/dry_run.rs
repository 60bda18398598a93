// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dry-run backend: logs every mutation, touches nothing.
//!
//! Lets the same binary validate a config deployment end-to-end — the
//! whole pipeline runs, the kernel stays untouched.

use super::{BlockOutcome, FirewallBackend, FirewallError};
use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use ipnetwork::IpNetwork;
use std::time::Duration;
use tracing::info;
use warden_core::{Clock, EnforcedEntry};

pub struct DryRunFirewall<C: Clock> {
    clock: C,
}

impl<C: Clock> DryRunFirewall<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl<C: Clock> FirewallBackend for DryRunFirewall<C> {
    async fn block(&self, ip: IpNetwork, ttl: Duration) -> Result<BlockOutcome, FirewallError> {
        let expires_at = self.clock.now() + ChronoDuration::seconds(ttl.as_secs().max(1) as i64);
        info!(ip = %ip, ttl_secs = ttl.as_secs(), "dry-run: would block");
        Ok(BlockOutcome::Applied { expires_at })
    }

    async fn refresh_static(
        &self,
        never_v4: &[IpNetwork],
        never_v6: &[IpNetwork],
        always_v4: &[IpNetwork],
        always_v6: &[IpNetwork],
    ) -> Result<(), FirewallError> {
        info!(
            never_v4 = never_v4.len(),
            never_v6 = never_v6.len(),
            always_v4 = always_v4.len(),
            always_v6 = always_v6.len(),
            "dry-run: would refresh static sets"
        );
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<EnforcedEntry>, FirewallError> {
        Ok(Vec::new())
    }
}

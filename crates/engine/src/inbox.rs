// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbox poll: pull peer-published blocks from the shared store.
//!
//! The first pull reaches back one full `block_time` so a restarting
//! node re-hydrates from the fleet. Pulled rows are handed to the
//! supervisor, which runs them through the local filter before
//! enforcing; this task never touches the ledger itself.

use crate::outbox::backoff_delay;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};
use warden_core::{Clock, SupervisorMsg};
use warden_store::BlockStore;

#[derive(Debug, Clone)]
pub struct InboxOptions {
    pub poll_interval: Duration,
    /// Catch-up window for the first pull (normally `block_time`)
    pub catch_up: Duration,
    pub origin_host: String,
}

pub async fn run_inbox<C: Clock>(
    store: Arc<dyn BlockStore>,
    tx: mpsc::Sender<SupervisorMsg>,
    clock: C,
    opts: InboxOptions,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut last_check =
        clock.now() - chrono::Duration::seconds(opts.catch_up.as_secs() as i64);
    let mut failures: u32 = 0;

    loop {
        let checkpoint = clock.now();
        match store.pull_since(&opts.origin_host, last_check).await {
            Ok(rows) => {
                failures = 0;
                last_check = checkpoint;
                let now = clock.now();
                let live: Vec<_> = rows.into_iter().filter(|b| b.expires_at > now).collect();
                if !live.is_empty() {
                    debug!(count = live.len(), "inbox pulled peer blocks");
                    if tx.send(SupervisorMsg::PeerBlocks(live)).await.is_err() {
                        // Supervisor is gone; so are we.
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "inbox pull failed");
                failures = failures.saturating_add(1);
            }
        }

        let delay = if failures == 0 { opts.poll_interval } else { backoff_delay(failures - 1) };
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "inbox_tests.rs"]
mod tests;

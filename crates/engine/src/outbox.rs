// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbox drain: batch local block decisions into the shared store.
//!
//! A batch goes out when `batch_size` records are queued or
//! `batch_timeout` has passed since the first queued record. A failing
//! batch is retried with capped exponential backoff and stays in memory.
//! On shutdown the drain gets `graceful_timeout` to flush; whatever
//! remains is dropped with one warning naming the ips.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use warden_core::BlockRecord;
use warden_store::BlockStore;

const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct OutboxOptions {
    pub batch_size: usize,
    pub batch_timeout: Duration,
    pub graceful_timeout: Duration,
    /// Zero disables the self-cleanup sweep
    pub cleanup_interval: Duration,
    pub origin_host: String,
}

/// Exponential backoff with up to ±25% jitter.
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    let exp = BACKOFF_BASE.as_secs_f64() * 2f64.powi(attempt.min(16) as i32);
    let capped = exp.min(BACKOFF_CAP.as_secs_f64());
    let jitter = rand::rng().random_range(0.75..=1.25);
    Duration::from_secs_f64(capped * jitter)
}

pub async fn run_outbox(
    store: Arc<dyn BlockStore>,
    mut rx: mpsc::UnboundedReceiver<BlockRecord>,
    opts: OutboxOptions,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut last_cleanup = tokio::time::Instant::now();

    loop {
        // Wait for the first record of the next batch.
        let first = tokio::select! {
            record = rx.recv() => record,
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    flush_remaining(&*store, &mut rx, Vec::new(), &opts).await;
                    return;
                }
                continue;
            }
        };
        let Some(first) = first else {
            // All senders gone; nothing more will arrive.
            return;
        };

        let mut batch = vec![first];
        let deadline = tokio::time::Instant::now() + opts.batch_timeout;
        while batch.len() < opts.batch_size {
            tokio::select! {
                record = rx.recv() => match record {
                    Some(record) => batch.push(record),
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline) => break,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        flush_remaining(&*store, &mut rx, batch, &opts).await;
                        return;
                    }
                }
            }
        }

        // Write with retry; the batch survives failures in memory.
        let mut attempt: u32 = 0;
        loop {
            match store.upsert_batch(&batch).await {
                Ok(()) => {
                    debug!(records = batch.len(), "outbox batch published");
                    break;
                }
                Err(e) => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        error = %e,
                        records = batch.len(),
                        retry_in = ?delay,
                        "outbox publish failed"
                    );
                    attempt = attempt.saturating_add(1);
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                flush_remaining(&*store, &mut rx, batch, &opts).await;
                                return;
                            }
                        }
                    }
                }
            }
        }

        if !opts.cleanup_interval.is_zero() && last_cleanup.elapsed() >= opts.cleanup_interval {
            match store.delete_expired(&opts.origin_host, chrono::Utc::now()).await {
                Ok(removed) if removed > 0 => {
                    info!(removed, "cleaned up own expired store rows")
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "store self-cleanup failed"),
            }
            last_cleanup = tokio::time::Instant::now();
        }
    }
}

/// Final flush on shutdown: everything still queued gets one bounded
/// attempt, then the rest is reported and dropped.
async fn flush_remaining(
    store: &dyn BlockStore,
    rx: &mut mpsc::UnboundedReceiver<BlockRecord>,
    mut batch: Vec<BlockRecord>,
    opts: &OutboxOptions,
) {
    while let Ok(record) = rx.try_recv() {
        batch.push(record);
    }
    if batch.is_empty() {
        return;
    }

    match tokio::time::timeout(opts.graceful_timeout, store.upsert_batch(&batch)).await {
        Ok(Ok(())) => {
            info!(records = batch.len(), "outbox flushed on shutdown");
        }
        Ok(Err(e)) => {
            warn_dropped(&batch, &e.to_string());
        }
        Err(_) => {
            warn_dropped(&batch, "graceful timeout elapsed");
        }
    }
}

fn warn_dropped(batch: &[BlockRecord], reason: &str) {
    let ips: Vec<String> = batch.iter().map(|r| r.ip.to_string()).collect();
    warn!(
        dropped = batch.len(),
        ips = %ips.join(", "),
        reason,
        "outbox entries dropped on shutdown"
    );
}

#[cfg(test)]
#[path = "outbox_tests.rs"]
mod tests;

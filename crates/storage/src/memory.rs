// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`BlockStore`] with the same conflict semantics as the
//! Postgres implementation. Test-only.

use crate::{BlockStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use warden_core::{BlockRecord, PeerBlock};

#[derive(Default)]
pub struct MemoryBlockStore {
    rows: Mutex<BTreeMap<(String, String), BlockRecord>>,
    /// Number of upcoming calls that should fail (for retry tests)
    fail_next: AtomicUsize,
    upserts: AtomicUsize,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` store calls fail with a transient error.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Number of successful upsert batches so far.
    pub fn upsert_batches(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<BlockRecord> {
        self.rows.lock().values().cloned().collect()
    }

    pub fn get(&self, ip: &str, origin_host: &str) -> Option<BlockRecord> {
        self.rows.lock().get(&(ip.to_string(), origin_host.to_string())).cloned()
    }

    /// Seed a row as if another node had published it.
    pub fn seed(&self, record: BlockRecord) {
        let key = (record.ip.to_string(), record.origin_host.clone());
        self.rows.lock().insert(key, record);
    }

    fn take_failure(&self) -> bool {
        self.fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn upsert_batch(&self, records: &[BlockRecord]) -> Result<(), StoreError> {
        if self.take_failure() {
            return Err(StoreError::Database("injected failure".into()));
        }
        let mut rows = self.rows.lock();
        for record in records {
            let key = (record.ip.to_string(), record.origin_host.clone());
            rows.entry(key)
                .and_modify(|existing| {
                    existing.last_seen_at = record.last_seen_at;
                    existing.expires_at = record.expires_at;
                    existing.pattern = record.pattern.clone();
                    existing.sample = record.sample.clone();
                    existing.count += 1;
                })
                .or_insert_with(|| record.clone());
        }
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn pull_since(
        &self,
        origin_host: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PeerBlock>, StoreError> {
        if self.take_failure() {
            return Err(StoreError::Database("injected failure".into()));
        }
        let now = Utc::now();
        Ok(self
            .rows
            .lock()
            .values()
            .filter(|r| r.origin_host != origin_host && r.last_seen_at > since && r.expires_at > now)
            .map(|r| PeerBlock { ip: r.ip, expires_at: r.expires_at })
            .collect())
    }

    async fn delete_expired(
        &self,
        origin_host: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|_, r| r.origin_host != origin_host || r.expires_at >= now);
        Ok((before - rows.len()) as u64)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

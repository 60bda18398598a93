// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! warden-store: the shared relational store that links the fleet.
//!
//! Nodes publish their local block decisions here and pull everyone
//! else's. The daemon only ever upserts and reads; deleting old rows is
//! an external concern (apart from each node's optional self-cleanup of
//! its own expired rows).

pub mod postgres;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use postgres::PgBlockStore;

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryBlockStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use warden_core::{BlockRecord, PeerBlock};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("store call timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Capability seam over the shared store.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Upsert a batch under the `(ip, origin_host)` key. Conflicts update
    /// `last_seen_at`, `expires_at`, sample/pattern, and bump `count`.
    async fn upsert_batch(&self, records: &[BlockRecord]) -> Result<(), StoreError>;

    /// Peer rows newer than `since`, excluding our own and the expired.
    async fn pull_since(
        &self,
        origin_host: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PeerBlock>, StoreError>;

    /// Drop this node's own rows whose expiry has passed. Returns the
    /// number of rows removed.
    async fn delete_expired(&self, origin_host: &str, now: DateTime<Utc>)
        -> Result<u64, StoreError>;
}

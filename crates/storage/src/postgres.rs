// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Postgres-backed [`BlockStore`].
//!
//! The pool connects lazily so the daemon starts (and keeps detecting
//! locally) while the database is down; the outbox retries with backoff
//! until it comes back.

use crate::{BlockStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;
use warden_core::{BlockRecord, PeerBlock};

const CALL_TIMEOUT: Duration = Duration::from_secs(15);

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS blocks (
    ip               TEXT        NOT NULL,
    origin_host      TEXT        NOT NULL,
    service          TEXT        NOT NULL DEFAULT '',
    detector         TEXT        NOT NULL DEFAULT '',
    pattern          TEXT        NOT NULL DEFAULT '',
    sample           TEXT        NOT NULL DEFAULT '',
    first_blocked_at TIMESTAMPTZ NOT NULL,
    last_seen_at     TIMESTAMPTZ NOT NULL,
    expires_at       TIMESTAMPTZ NOT NULL,
    count            BIGINT      NOT NULL DEFAULT 1,
    PRIMARY KEY (ip, origin_host)
);
CREATE INDEX IF NOT EXISTS blocks_expires_at_idx ON blocks (expires_at);
CREATE INDEX IF NOT EXISTS blocks_last_seen_at_idx ON blocks (last_seen_at);
"#;

const UPSERT: &str = r#"
INSERT INTO blocks
    (ip, origin_host, service, detector, pattern, sample,
     first_blocked_at, last_seen_at, expires_at, count)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
ON CONFLICT (ip, origin_host) DO UPDATE SET
    last_seen_at = EXCLUDED.last_seen_at,
    expires_at   = EXCLUDED.expires_at,
    pattern      = EXCLUDED.pattern,
    sample       = EXCLUDED.sample,
    count        = blocks.count + 1
"#;

const PULL: &str = r#"
SELECT ip, expires_at
FROM blocks
WHERE origin_host <> $1 AND last_seen_at > $2 AND expires_at > $3
"#;

const DELETE_EXPIRED: &str = "DELETE FROM blocks WHERE origin_host = $1 AND expires_at < $2";

pub struct PgBlockStore {
    pool: PgPool,
}

impl PgBlockStore {
    /// Build a lazy pool from a connection url; no round-trip happens
    /// until the first query.
    pub fn connect_lazy(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(CALL_TIMEOUT)
            .connect_lazy(url)?;
        Ok(Self { pool })
    }

    /// Create the table and indices if they are missing.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        bounded(async {
            let mut tx = self.pool.begin().await?;
            for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                sqlx::query(statement).execute(&mut *tx).await?;
            }
            tx.commit().await?;
            Ok(())
        })
        .await
    }
}

/// Apply the store-wide call timeout to a query future.
async fn bounded<T>(
    fut: impl std::future::Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    tokio::time::timeout(CALL_TIMEOUT, fut)
        .await
        .map_err(|_| StoreError::Timeout(CALL_TIMEOUT))?
}

#[async_trait]
impl BlockStore for PgBlockStore {
    async fn upsert_batch(&self, records: &[BlockRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        bounded(async {
            let mut tx = self.pool.begin().await?;
            for record in records {
                sqlx::query(UPSERT)
                    .bind(record.ip.to_string())
                    .bind(&record.origin_host)
                    .bind(&record.service)
                    .bind(&record.detector)
                    .bind(&record.pattern)
                    .bind(&record.sample)
                    .bind(record.first_blocked_at)
                    .bind(record.last_seen_at)
                    .bind(record.expires_at)
                    .bind(record.count)
                    .execute(&mut *tx)
                    .await?;
            }
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    async fn pull_since(
        &self,
        origin_host: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PeerBlock>, StoreError> {
        bounded(async {
            let rows = sqlx::query(PULL)
                .bind(origin_host)
                .bind(since)
                .bind(Utc::now())
                .fetch_all(&self.pool)
                .await?;

            let mut blocks = Vec::with_capacity(rows.len());
            for row in rows {
                let ip: String = row.try_get("ip")?;
                let expires_at: DateTime<Utc> = row.try_get("expires_at")?;
                match ip.parse() {
                    Ok(ip) => blocks.push(PeerBlock { ip, expires_at }),
                    Err(e) => {
                        tracing::warn!(ip = %ip, error = %e, "skipping unparseable ip from store")
                    }
                }
            }
            Ok(blocks)
        })
        .await
    }

    async fn delete_expired(
        &self,
        origin_host: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        bounded(async {
            let result = sqlx::query(DELETE_EXPIRED)
                .bind(origin_host)
                .bind(now)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected())
        })
        .await
    }
}

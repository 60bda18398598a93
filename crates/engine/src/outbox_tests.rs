// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use warden_store::MemoryBlockStore;

fn record(ip: &str) -> BlockRecord {
    let now = Utc::now();
    BlockRecord {
        ip: ip.parse().unwrap(),
        origin_host: "node-a".into(),
        service: "ssh".into(),
        detector: "sshd".into(),
        pattern: "Failed password".into(),
        sample: "Failed password for root".into(),
        first_blocked_at: now,
        last_seen_at: now,
        expires_at: now + chrono::Duration::seconds(600),
        count: 1,
    }
}

fn opts(batch_size: usize, batch_timeout: Duration) -> OutboxOptions {
    OutboxOptions {
        batch_size,
        batch_timeout,
        graceful_timeout: Duration::from_secs(10),
        cleanup_interval: Duration::ZERO,
        origin_host: "node-a".into(),
    }
}

#[tokio::test(start_paused = true)]
async fn full_batch_publishes_immediately() {
    let store = Arc::new(MemoryBlockStore::new());
    let (tx, rx) = mpsc::unbounded_channel();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    tx.send(record("203.0.113.9/32")).unwrap();
    tx.send(record("198.51.100.4/32")).unwrap();
    drop(tx);

    run_outbox(store.clone(), rx, opts(2, Duration::from_secs(300)), shutdown_rx).await;

    assert_eq!(store.upsert_batches(), 1);
    assert_eq!(store.records().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn partial_batch_publishes_after_timeout() {
    let store = Arc::new(MemoryBlockStore::new());
    let (tx, rx) = mpsc::unbounded_channel();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    tx.send(record("203.0.113.9/32")).unwrap();

    let handle = tokio::spawn(run_outbox(
        store.clone(),
        rx,
        opts(10, Duration::from_millis(100)),
        shutdown_rx,
    ));

    // Paused time fast-forwards through the batch timeout.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(store.records().len(), 1);

    drop(tx);
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failed_batch_retries_and_survives() {
    let store = Arc::new(MemoryBlockStore::new());
    store.fail_next(2);
    let (tx, rx) = mpsc::unbounded_channel();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    tx.send(record("203.0.113.9/32")).unwrap();
    drop(tx);

    run_outbox(store.clone(), rx, opts(1, Duration::from_secs(1)), shutdown_rx).await;

    // Two injected failures, then success; the record was never lost.
    assert_eq!(store.upsert_batches(), 1);
    assert_eq!(store.records().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_flushes_queued_records() {
    let store = Arc::new(MemoryBlockStore::new());
    let (tx, rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    for ip in ["203.0.113.9/32", "198.51.100.4/32", "192.0.2.1/32"] {
        tx.send(record(ip)).unwrap();
    }

    let handle = tokio::spawn(run_outbox(
        store.clone(),
        rx,
        opts(100, Duration::from_secs(300)),
        shutdown_rx,
    ));
    tokio::time::sleep(Duration::from_millis(10)).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    assert_eq!(store.records().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn shutdown_with_dead_store_drops_and_exits() {
    let store = Arc::new(MemoryBlockStore::new());
    store.fail_next(usize::MAX);
    let (tx, rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    for ip in ["203.0.113.9/32", "198.51.100.4/32", "192.0.2.1/32"] {
        tx.send(record(ip)).unwrap();
    }

    let handle = tokio::spawn(run_outbox(
        store.clone(),
        rx,
        opts(100, Duration::from_secs(300)),
        shutdown_rx,
    ));
    tokio::time::sleep(Duration::from_millis(10)).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    // Zero rows made it; the records were dropped with a warning.
    assert!(store.records().is_empty());
}

#[test]
fn backoff_grows_and_caps() {
    let early = backoff_delay(0);
    assert!(early >= Duration::from_secs_f64(0.75) && early <= Duration::from_secs_f64(1.25));

    let late = backoff_delay(12);
    // Capped at 60s, jittered by at most 25% either way.
    assert!(late >= Duration::from_secs(45) && late <= Duration::from_secs(75));
}

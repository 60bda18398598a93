// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use warden_core::{BlockRecord, FakeClock, PeerBlock};
use warden_store::MemoryBlockStore;

fn peer_record(ip: &str, host: &str, expires_in: i64) -> BlockRecord {
    let now = Utc::now();
    BlockRecord {
        ip: ip.parse().unwrap(),
        origin_host: host.into(),
        service: "ssh".into(),
        detector: "sshd".into(),
        pattern: "x".into(),
        sample: String::new(),
        first_blocked_at: now,
        last_seen_at: now,
        expires_at: now + chrono::Duration::seconds(expires_in),
        count: 1,
    }
}

fn options() -> InboxOptions {
    InboxOptions {
        poll_interval: Duration::from_secs(300),
        catch_up: Duration::from_secs(691_200),
        origin_host: "node-a".into(),
    }
}

async fn first_delivery(store: MemoryBlockStore) -> Option<Vec<PeerBlock>> {
    let (tx, mut rx) = mpsc::channel(16);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let clock = FakeClock::new();

    let handle =
        tokio::spawn(run_inbox(Arc::new(store), tx, clock, options(), shutdown_rx));

    let delivered = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.ok().flatten();
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    delivered.map(|msg| match msg {
        SupervisorMsg::PeerBlocks(blocks) => blocks,
        other => panic!("unexpected message: {other:?}"),
    })
}

#[tokio::test]
async fn pulls_peer_blocks_on_startup() {
    let store = MemoryBlockStore::new();
    store.seed(peer_record("198.51.100.77/32", "node-b", 3600));

    let blocks = first_delivery(store).await.unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].ip.to_string(), "198.51.100.77/32");
}

#[tokio::test]
async fn own_rows_are_excluded() {
    let store = MemoryBlockStore::new();
    store.seed(peer_record("198.51.100.77/32", "node-a", 3600));

    let (tx, mut rx) = mpsc::channel(16);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(run_inbox(
        Arc::new(store),
        tx,
        FakeClock::new(),
        options(),
        shutdown_rx,
    ));

    // Nothing should arrive; give the first pull a moment to happen.
    let got = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(got.is_err());

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn expired_rows_are_discarded() {
    let store = MemoryBlockStore::new();
    store.seed(peer_record("198.51.100.77/32", "node-b", -60));

    let (tx, mut rx) = mpsc::channel(16);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(run_inbox(
        Arc::new(store),
        tx,
        FakeClock::new(),
        options(),
        shutdown_rx,
    ));

    let got = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(got.is_err());

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn store_failure_retries_with_backoff() {
    let store = MemoryBlockStore::new();
    store.fail_next(1);
    store.seed(peer_record("198.51.100.77/32", "node-b", 3600));

    let blocks = first_delivery(store).await.unwrap();
    assert_eq!(blocks.len(), 1);
}

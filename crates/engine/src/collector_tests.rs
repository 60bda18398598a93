// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::FakeReader;

fn sources(keys: &[&str]) -> Vec<Source> {
    keys.iter().map(|k| Source::Journal { unit: k.to_string() }).collect()
}

#[tokio::test]
async fn merges_sources_and_filters_ipless_conversations() {
    let reader = FakeReader::new();
    reader.set("sshd.service", "sshd[1]", "Failed password for root from 203.0.113.9");
    reader.set("sshd.service", "sshd[2]", "Server listening on port 22");
    reader.set("nginx.service", "nginx[1]", "denied request from 198.51.100.4");

    let collected = collect(
        &reader,
        &sources(&["sshd.service", "nginx.service"]),
        Duration::from_secs(60),
        100,
    )
    .await;

    assert_eq!(collected.len(), 2);
    assert_eq!(collected["sshd.service"].len(), 1);
    assert!(collected["sshd.service"].contains_key("sshd[1]"));
    assert_eq!(collected["nginx.service"].len(), 1);
}

#[tokio::test]
async fn failing_source_does_not_abort_the_tick() {
    let reader = FakeReader::new();
    reader.set("good.service", "p[1]", "hit from 203.0.113.9");
    reader.fail("bad.service");

    let collected = collect(
        &reader,
        &sources(&["bad.service", "good.service"]),
        Duration::from_secs(60),
        100,
    )
    .await;

    assert_eq!(collected.len(), 1);
    assert!(collected.contains_key("good.service"));
}

#[tokio::test]
async fn source_with_no_ip_conversations_is_absent() {
    let reader = FakeReader::new();
    reader.set("quiet.service", "p[1]", "nothing interesting happened");

    let collected =
        collect(&reader, &sources(&["quiet.service"]), Duration::from_secs(60), 100).await;
    assert!(collected.is_empty());
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use warden_adapters::ConversationMap;

fn ts() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn patterns(texts: &[(&str, &str)]) -> Vec<CompiledPattern> {
    texts
        .iter()
        .map(|(text, det)| CompiledPattern::compile(text, det).unwrap())
        .collect()
}

fn collected(entries: &[(&str, &str, &str)]) -> Collected {
    let mut out = Collected::new();
    for (source, conv, msg) in entries {
        out.entry(source.to_string())
            .or_insert_with(ConversationMap::new)
            .insert(conv.to_string(), msg.to_string());
    }
    out
}

#[test]
fn emits_hit_for_matching_conversation() {
    let hits = match_hits(
        &collected(&[("sshd.service", "sshd[1]", "Failed password for root from 203.0.113.9 port 1234")]),
        &patterns(&[("Failed password", "sshd")]),
        "node-a",
        ts(),
    );
    assert_eq!(hits.len(), 1);
    let hit = &hits[0];
    assert_eq!(hit.ip.to_string(), "203.0.113.9/32");
    assert_eq!(hit.detector, "sshd");
    assert_eq!(hit.service, "sshd.service");
    assert_eq!(hit.pattern, "Failed password");
    assert_eq!(hit.origin_host, "node-a");
    assert_eq!(hit.first_seen, ts());
}

#[test]
fn non_matching_conversation_yields_nothing() {
    let hits = match_hits(
        &collected(&[("sshd.service", "sshd[1]", "Accepted publickey from 192.0.2.1")]),
        &patterns(&[("Failed password", "sshd")]),
        "node-a",
        ts(),
    );
    assert!(hits.is_empty());
}

#[test]
fn same_ip_across_conversations_dedups_within_tick() {
    let hits = match_hits(
        &collected(&[
            ("sshd.service", "sshd[1]", "Failed password for root from 198.51.100.4"),
            ("sshd.service", "sshd[2]", "Failed password for admin from 198.51.100.4"),
        ]),
        &patterns(&[("Failed password", "sshd")]),
        "node-a",
        ts(),
    );
    assert_eq!(hits.len(), 1);
}

#[test]
fn match_all_pattern_still_one_hit_per_ip() {
    let hits = match_hits(
        &collected(&[
            ("a.service", "p[1]", "anything 203.0.113.9"),
            ("a.service", "p[2]", "anything 203.0.113.9 again"),
            ("b.service", "p[3]", "anything 203.0.113.9 elsewhere"),
        ]),
        &patterns(&[(".*", "all")]),
        "node-a",
        ts(),
    );
    assert_eq!(hits.len(), 1);
}

#[test]
fn multiple_ips_in_one_conversation_all_hit() {
    let hits = match_hits(
        &collected(&[(
            "sshd.service",
            "sshd[1]",
            "Failed password via proxy 203.0.113.9 for peer 198.51.100.4",
        )]),
        &patterns(&[("Failed password", "sshd")]),
        "node-a",
        ts(),
    );
    assert_eq!(hits.len(), 2);
}

#[test]
fn first_matching_pattern_claims_the_conversation() {
    let hits = match_hits(
        &collected(&[("x", "c", "Failed password and Invalid user from 203.0.113.9")]),
        &patterns(&[("Failed password", "first"), ("Invalid user", "second")]),
        "node-a",
        ts(),
    );
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].detector, "first");
}

#[test]
fn ipv6_hits_carry_canonical_networks() {
    let hits = match_hits(
        &collected(&[("sshd.service", "s[1]", "Failed password from 2001:db8::7")]),
        &patterns(&[("Failed password", "sshd")]),
        "node-a",
        ts(),
    );
    assert_eq!(hits[0].ip.to_string(), "2001:db8::7/128");
}

#[test]
fn sample_is_bounded() {
    let long = format!("Failed password from 203.0.113.9 {}", "x".repeat(1000));
    let hits = match_hits(
        &collected(&[("s", "c", long.as_str())]),
        &patterns(&[("Failed password", "sshd")]),
        "node-a",
        ts(),
    );
    assert!(hits[0].sample.len() <= warden_core::hit::MAX_SAMPLE_LEN);
}

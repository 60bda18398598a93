// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn ts(offset_secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + offset_secs, 0).unwrap()
}

fn net(s: &str) -> IpNetwork {
    s.parse().unwrap()
}

#[test]
fn insert_then_contains() {
    let mut ledger = Ledger::new();
    ledger.insert(net("203.0.113.9/32"), ts(600));
    assert!(ledger.contains_active(&net("203.0.113.9/32"), ts(0)));
    assert!(!ledger.contains_active(&net("203.0.113.10/32"), ts(0)));
}

#[test]
fn expired_entry_is_not_active() {
    let mut ledger = Ledger::new();
    ledger.insert(net("203.0.113.9/32"), ts(600));
    assert!(!ledger.contains_active(&net("203.0.113.9/32"), ts(601)));
}

#[test]
fn sweep_prunes_only_expired() {
    let mut ledger = Ledger::new();
    ledger.insert(net("203.0.113.9/32"), ts(100));
    ledger.insert(net("198.51.100.4/32"), ts(900));
    assert_eq!(ledger.sweep(ts(500)), 1);
    assert_eq!(ledger.len(), 1);
    assert!(ledger.contains_active(&net("198.51.100.4/32"), ts(500)));
}

#[test]
fn double_insert_is_idempotent() {
    let mut a = Ledger::new();
    a.insert(net("203.0.113.9/32"), ts(600));

    let mut b = Ledger::new();
    b.insert(net("203.0.113.9/32"), ts(600));
    b.insert(net("203.0.113.9/32"), ts(600));

    assert_eq!(a.len(), b.len());
    assert_eq!(a.expiry_of(&net("203.0.113.9/32")), b.expiry_of(&net("203.0.113.9/32")));
}

#[test]
fn reconcile_replaces_wholesale() {
    let mut ledger = Ledger::new();
    ledger.insert(net("203.0.113.9/32"), ts(600));
    ledger.insert(net("198.51.100.4/32"), ts(600));

    // The kernel only reports one entry; the other is considered evicted
    // even though its local expiry has not passed.
    ledger.reconcile(vec![EnforcedEntry { ip: net("198.51.100.4/32"), expires_at: ts(300) }]);

    assert_eq!(ledger.len(), 1);
    assert!(!ledger.contains_active(&net("203.0.113.9/32"), ts(0)));
    assert_eq!(ledger.expiry_of(&net("198.51.100.4/32")), Some(ts(300)));
}

#[test]
fn reconcile_from_empty_snapshot_clears() {
    let mut ledger = Ledger::new();
    ledger.insert(net("203.0.113.9/32"), ts(600));
    ledger.reconcile(vec![]);
    assert!(ledger.is_empty());
}

#[test]
fn sweep_with_no_expiries_is_noop() {
    let mut ledger = Ledger::new();
    ledger.insert(net("2001:db8::1/128"), ts(600));
    assert_eq!(ledger.sweep(ts(0)), 0);
    assert_eq!(ledger.len(), 1);
}

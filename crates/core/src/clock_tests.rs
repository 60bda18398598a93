// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_moves_forward() {
    let clock = SystemClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
}

#[test]
fn fake_clock_advance() {
    let clock = FakeClock::at_epoch();
    let start = clock.now();
    clock.advance(Duration::seconds(90));
    assert_eq!(clock.now() - start, Duration::seconds(90));
}

#[test]
fn fake_clock_set() {
    let clock = FakeClock::at_epoch();
    let target = DateTime::from_timestamp(1_800_000_000, 0).unwrap();
    clock.set(target);
    assert_eq!(clock.now(), target);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::at_epoch();
    let other = clock.clone();
    clock.advance(Duration::seconds(10));
    assert_eq!(clock.now(), other.now());
}

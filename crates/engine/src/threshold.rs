// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-detector hit thresholding.
//!
//! A detector may require `max_threshold` hits within `time_window`
//! before an address is escalated to enforcement. The default threshold
//! of 1 admits on first sight and keeps no state.

use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ThresholdRule {
    pub max_threshold: u32,
    pub time_window: Duration,
}

#[derive(Debug, Default)]
pub struct ThresholdGate {
    rules: HashMap<String, ThresholdRule>,
    counts: HashMap<(String, IpNetwork), (u32, DateTime<Utc>)>,
}

impl ThresholdGate {
    /// Build from detector settings; detectors with threshold 1 need no
    /// rule at all.
    pub fn new(rules: impl IntoIterator<Item = (String, ThresholdRule)>) -> Self {
        Self {
            rules: rules.into_iter().filter(|(_, r)| r.max_threshold > 1).collect(),
            counts: HashMap::new(),
        }
    }

    /// Record one hit; returns whether enforcement should proceed.
    pub fn admit(&mut self, detector: &str, ip: IpNetwork, now: DateTime<Utc>) -> bool {
        let Some(rule) = self.rules.get(detector) else { return true };

        let window = chrono::Duration::seconds(rule.time_window.as_secs() as i64);
        let entry = self
            .counts
            .entry((detector.to_string(), ip))
            .or_insert((0, now));
        if now - entry.1 > window {
            *entry = (0, now);
        }
        entry.0 += 1;
        entry.0 >= rule.max_threshold
    }

    /// Drop stale counters so the map cannot grow without bound.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let rules = &self.rules;
        self.counts.retain(|(detector, _), (_, started)| {
            rules.get(detector).is_some_and(|rule| {
                now - *started <= chrono::Duration::seconds(rule.time_window.as_secs() as i64)
            })
        });
    }
}

#[cfg(test)]
#[path = "threshold_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pattern matching over collected conversations.
//!
//! The first matching pattern claims a conversation; every IP literal in
//! that conversation then becomes a hit. Within one tick an ip yields at
//! most one hit, however many conversations mention it.

use crate::collector::Collected;
use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use std::collections::HashSet;
use warden_config::CompiledPattern;
use warden_core::{canonical, extract_ips, Hit};

pub fn match_hits(
    collected: &Collected,
    patterns: &[CompiledPattern],
    origin_host: &str,
    now: DateTime<Utc>,
) -> Vec<Hit> {
    let mut hits: Vec<Hit> = Vec::new();
    let mut seen: HashSet<IpNetwork> = HashSet::new();

    for (source_key, conversations) in collected {
        for message in conversations.values() {
            let Some(pattern) = patterns.iter().find(|p| p.regex.is_match(message)) else {
                continue;
            };
            for ip in extract_ips(message) {
                let net = canonical(ip);
                if !seen.insert(net) {
                    continue;
                }
                hits.push(Hit {
                    ip: net,
                    detector: pattern.detector.clone(),
                    service: source_key.clone(),
                    pattern: pattern.text.clone(),
                    sample: Hit::truncate_sample(message),
                    first_seen: now,
                    last_seen: now,
                    origin_host: origin_host.to_string(),
                });
            }
        }
    }
    hits
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod tests;

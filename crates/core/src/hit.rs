// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single detection: one offending address seen by one pattern.

use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

/// Longest log excerpt carried along with a hit.
pub const MAX_SAMPLE_LEN: usize = 500;

/// One `(ip, detector, pattern, sample)` produced by the matcher.
///
/// A hit lives for a single supervisor tick: it is resolved against the
/// filter and the firewall, then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub ip: IpNetwork,
    /// Detector that owned the matching pattern
    pub detector: String,
    /// Service the source line came from (unit name or file path)
    pub service: String,
    /// Source text of the pattern that matched
    pub pattern: String,
    /// Truncated excerpt of the matched conversation
    pub sample: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub origin_host: String,
}

impl Hit {
    /// Bound a log excerpt to [`MAX_SAMPLE_LEN`], respecting char
    /// boundaries.
    pub fn truncate_sample(text: &str) -> String {
        if text.len() <= MAX_SAMPLE_LEN {
            return text.to_string();
        }
        let mut end = MAX_SAMPLE_LEN;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text[..end].to_string()
    }
}

#[cfg(test)]
#[path = "hit_tests.rs"]
mod tests;

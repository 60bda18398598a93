// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lexical extraction of IP literals from log text.
//!
//! Extraction is two-phase: a broad regex finds candidates, then each
//! candidate must round-trip through [`IpAddr`] parsing. No DNS, ever.

use regex::Regex;
use std::net::IpAddr;
use std::sync::LazyLock;

/// Dotted-quad IPv4 candidates. Octet range is enforced by the parse step.
static IPV4_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap()
});

/// IPv6 candidates: `::` compression, full 8-group form, and the
/// 6-group + dotted-quad dual notation.
static IPV6_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(
        r"[0-9A-Fa-f:]*::[0-9A-Fa-f:.]*|(?:[0-9A-Fa-f]{1,4}:){7}[0-9A-Fa-f]{1,4}|(?:[0-9A-Fa-f]{1,4}:){6}\d{1,3}(?:\.\d{1,3}){3}",
    )
    .unwrap()
});

/// Bracketed `[addr]:port` forms, unwrapped before candidate scanning.
static BRACKET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\[([0-9A-Fa-f:.]+)\](?::\d+)?").unwrap()
});

/// The regex crate has no lookaround, so token edges are checked by hand:
/// a candidate glued to an alphanumeric neighbor (as in `std::barrier`) is
/// a fragment of a longer token, not an address.
fn is_free_standing(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    let word = |c: char| c.is_alphanumeric() || c == '_';
    !before.is_some_and(word) && !after.is_some_and(word)
}

/// Extract all IP literals from `text`, in order of first appearance,
/// without duplicates.
pub fn extract_ips(text: &str) -> Vec<IpAddr> {
    let mut found = Vec::new();
    let mut push = |ip: IpAddr| {
        if !found.contains(&ip) {
            found.push(ip);
        }
    };

    // Bracketed forms first so `[2001:db8::1]:22` yields the address
    // rather than an address-with-port fragment.
    for cap in BRACKET_PATTERN.captures_iter(text) {
        if let Some(inner) = cap.get(1) {
            if let Ok(ip) = inner.as_str().parse::<IpAddr>() {
                push(ip);
            }
        }
    }

    for m in IPV6_PATTERN.find_iter(text) {
        let candidate = m.as_str().trim_end_matches(['.', ':']);
        // A lone "::" is the unspecified address; log text never means it.
        if candidate.len() < 3 || !is_free_standing(text, m.start(), m.start() + candidate.len()) {
            continue;
        }
        if let Ok(ip) = candidate.parse::<IpAddr>() {
            push(ip);
        }
    }

    for m in IPV4_PATTERN.find_iter(text) {
        if let Ok(ip) = m.as_str().parse::<IpAddr>() {
            push(ip);
        }
    }

    found
}

/// Cheap pre-filter: does the text contain at least one IP literal?
pub fn has_ip(text: &str) -> bool {
    !extract_ips(text).is_empty()
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical address handling and longest-prefix CIDR matching.
//!
//! Every address in the system is an [`IpNetwork`]: a bare address is the
//! `/32` (v4) or `/128` (v6) network containing only itself. Family is
//! carried by the enum variant, never re-derived from the textual form.

use ipnetwork::IpNetwork;
use std::net::IpAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AddrError {
    #[error("invalid address or network `{input}`: {reason}")]
    Invalid { input: String, reason: String },
}

/// Address family of a network or address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Family::V4 => write!(f, "ipv4"),
            Family::V6 => write!(f, "ipv6"),
        }
    }
}

/// Family of a network
pub fn family(net: &IpNetwork) -> Family {
    match net {
        IpNetwork::V4(_) => Family::V4,
        IpNetwork::V6(_) => Family::V6,
    }
}

/// Canonical host network (`/32` or `/128`) for a bare address
pub fn canonical(ip: IpAddr) -> IpNetwork {
    IpNetwork::from(ip)
}

/// Parse either a bare address or a CIDR into a canonical network
pub fn parse_net(input: &str) -> Result<IpNetwork, AddrError> {
    let trimmed = input.trim();
    if trimmed.contains('/') {
        trimmed.parse::<IpNetwork>().map_err(|e| AddrError::Invalid {
            input: trimmed.to_string(),
            reason: e.to_string(),
        })
    } else {
        let ip: IpAddr = trimmed.parse().map_err(|e: std::net::AddrParseError| {
            AddrError::Invalid { input: trimmed.to_string(), reason: e.to_string() }
        })?;
        Ok(canonical(ip))
    }
}

/// A set of CIDRs answering longest-prefix containment queries.
///
/// Sizes here are small (tens of entries from config), so matching is a
/// linear scan tracking the longest matching prefix per family.
#[derive(Debug, Clone, Default)]
pub struct CidrSet {
    v4: Vec<IpNetwork>,
    v6: Vec<IpNetwork>,
}

impl CidrSet {
    pub fn new<I: IntoIterator<Item = IpNetwork>>(nets: I) -> Self {
        let mut set = Self::default();
        for net in nets {
            match net {
                IpNetwork::V4(_) => set.v4.push(net),
                IpNetwork::V6(_) => set.v6.push(net),
            }
        }
        set
    }

    /// Longest-prefix match for an address within its own family
    pub fn longest_match(&self, ip: IpAddr) -> Option<IpNetwork> {
        let pool = match ip {
            IpAddr::V4(_) => &self.v4,
            IpAddr::V6(_) => &self.v6,
        };
        pool.iter()
            .filter(|net| net.contains(ip))
            .max_by_key(|net| net.prefix())
            .copied()
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        self.longest_match(ip).is_some()
    }

    pub fn v4(&self) -> &[IpNetwork] {
        &self.v4
    }

    pub fn v6(&self) -> &[IpNetwork] {
        &self.v6
    }

    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }

    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }
}

#[cfg(test)]
#[path = "addr_tests.rs"]
mod tests;

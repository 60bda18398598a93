// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! warden-adapters: everything that talks to the outside world.
//!
//! Log sources (journalctl, plain files, scp-pulled remote files), the
//! systemd unit probe, the nftables firewall backend, and the HTTP
//! blocklist fetcher. The engine depends only on the traits defined
//! here; concrete process-spawning implementations are bound at startup.

pub mod blocklist;
pub mod exec;
pub mod file_tail;
pub mod firewall;
pub mod journal;
pub mod remote;
pub mod source;
pub mod systemd;

pub use blocklist::{BlocklistFetcher, BlocklistError, FetchedList};
pub use firewall::{BlockOutcome, DryRunFirewall, FirewallBackend, FirewallError, NftFirewall};
pub use source::{ConversationMap, LogReader, ReadError, Source, SourceReader};
pub use systemd::{ProbeError, SystemdProbe, UnitProbe};

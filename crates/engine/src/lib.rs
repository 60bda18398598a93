// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! warden-engine: the detection pipeline and the supervisor that runs it.
//!
//! One tick: read sources → match patterns → filter → enforce → publish.
//! Around the tick loop live the sync tasks (outbox drain, inbox poll)
//! and the blocklist plugins, all talking back to the supervisor over
//! channels. The supervisor is the only owner of the block ledger.

pub mod collector;
pub mod discovery;
pub mod filter;
pub mod inbox;
pub mod matcher;
pub mod outbox;
pub mod plugin;
pub mod supervisor;
pub mod threshold;

#[cfg(any(test, feature = "test-support"))]
pub mod test_helpers;

pub use collector::{collect, Collected};
pub use discovery::discover;
pub use filter::{classify, Classification};
pub use inbox::{run_inbox, InboxOptions};
pub use matcher::match_hits;
pub use outbox::{run_outbox, OutboxOptions};
pub use plugin::{HttpBlocklistPlugin, Plugin, PluginCtx};
pub use supervisor::{ReloadFn, Supervisor, SupervisorDeps, SupervisorError};
pub use threshold::ThresholdGate;

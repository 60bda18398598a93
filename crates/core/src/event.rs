// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messages delivered to the supervisor over its mpsc channel.
//!
//! Workers never touch the ledger directly; everything they learn flows
//! through these messages and is applied on the supervisor's own tick.

use crate::hit::Hit;
use crate::record::PeerBlock;

#[derive(Debug, Clone)]
pub enum SupervisorMsg {
    /// A batch of peer-published blocks pulled by the inbox task.
    /// These re-enter the filter but are never re-published.
    PeerBlocks(Vec<PeerBlock>),
    /// An address contributed by a blocklist plugin. Enters the pipeline
    /// exactly like a matcher hit, publication included.
    PluginHit(Hit),
}

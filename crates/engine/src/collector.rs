// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan out reads across all sources and merge the conversations.
//!
//! A source that fails to open is logged and skipped; the tick always
//! proceeds with whatever could be read. Conversations without a single
//! IP literal are dropped here so the matcher never sees them.

use futures_util::future::join_all;
use std::collections::HashMap;
use std::time::Duration;
use warden_adapters::{ConversationMap, Source, SourceReader};
use warden_core::has_ip;

/// `source_key → (conv_key → message)` for one tick.
pub type Collected = HashMap<String, ConversationMap>;

pub async fn collect(
    reader: &dyn SourceReader,
    sources: &[Source],
    lookback: Duration,
    max_file_lines: usize,
) -> Collected {
    let reads = sources
        .iter()
        .map(|source| async move {
            (source.key(), reader.read(source, lookback, max_file_lines).await)
        });
    let results = join_all(reads).await;

    let mut collected = Collected::new();
    for (key, result) in results {
        match result {
            Ok(conversations) => {
                let with_ip: ConversationMap =
                    conversations.into_iter().filter(|(_, msg)| has_ip(msg)).collect();
                if !with_ip.is_empty() {
                    collected.insert(key, with_ip);
                }
            }
            Err(e) => {
                tracing::warn!(source = %key, error = %e, "source unreadable this tick");
            }
        }
    }
    collected
}

#[cfg(test)]
#[path = "collector_tests.rs"]
mod tests;

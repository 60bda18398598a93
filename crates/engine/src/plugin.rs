// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocklist plugin contract and the HTTP implementation.
//!
//! A plugin is a long-lived task that feeds addresses into the same
//! pipeline as the matcher: everything it enqueues re-enters the filter,
//! the firewall, and the outbox. Plugins poll their shutdown/reload
//! receivers at every suspension point; on reload the supervisor tears
//! them down and respawns them against the new config.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use warden_adapters::BlocklistFetcher;
use warden_config::PluginConfig;
use warden_core::{Clock, Hit, SupervisorMsg};

/// Context handed to every plugin task.
#[derive(Clone)]
pub struct PluginCtx {
    pub hits: mpsc::Sender<SupervisorMsg>,
    pub shutdown: watch::Receiver<bool>,
    /// Bumped on config reload; plugins exit and get respawned.
    pub reload_generation: watch::Receiver<u64>,
    pub origin_host: String,
}

#[async_trait]
pub trait Plugin: Send {
    fn name(&self) -> &str;
    async fn run(self: Box<Self>, ctx: PluginCtx);
}

/// Periodic fetch of a public blocklist over HTTP.
pub struct HttpBlocklistPlugin<C: Clock> {
    cfg: PluginConfig,
    fetcher: BlocklistFetcher,
    clock: C,
}

impl<C: Clock> HttpBlocklistPlugin<C> {
    pub fn new(cfg: PluginConfig, fetcher: BlocklistFetcher, clock: C) -> Self {
        Self { cfg, fetcher, clock }
    }

    fn hit_for(&self, net: ipnetwork::IpNetwork, origin_host: &str) -> Hit {
        let now = self.clock.now();
        Hit {
            ip: net,
            detector: format!("plugin:{}", self.cfg.name),
            service: self.cfg.url.clone(),
            pattern: String::new(),
            sample: String::new(),
            first_seen: now,
            last_seen: now,
            origin_host: origin_host.to_string(),
        }
    }
}

#[async_trait]
impl<C: Clock> Plugin for HttpBlocklistPlugin<C> {
    fn name(&self) -> &str {
        &self.cfg.name
    }

    async fn run(self: Box<Self>, mut ctx: PluginCtx) {
        if !self.cfg.active {
            info!(plugin = %self.cfg.name, "plugin inactive, exiting");
            return;
        }
        let interval = self.cfg.fetch_interval.max(Duration::from_secs(1));

        loop {
            match self.fetcher.fetch(&self.cfg).await {
                Ok(list) => {
                    debug!(
                        plugin = %self.cfg.name,
                        entries = list.entries.len(),
                        from_cache = list.from_cache,
                        "blocklist fetched"
                    );
                    for net in list.entries {
                        let msg = SupervisorMsg::PluginHit(self.hit_for(net, &ctx.origin_host));
                        if ctx.hits.send(msg).await.is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!(plugin = %self.cfg.name, error = %e, "blocklist fetch failed");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = ctx.shutdown.changed() => {
                    if *ctx.shutdown.borrow() {
                        return;
                    }
                }
                _ = ctx.reload_generation.changed() => {
                    debug!(plugin = %self.cfg.name, "reload, plugin exiting for respawn");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "plugin_tests.rs"]
mod tests;

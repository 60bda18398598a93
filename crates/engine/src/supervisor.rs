// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor: owns the ledger, runs the tick loop, spawns and joins
//! every long-lived task.
//!
//! Ordering inside a tick is fixed: local sources first, then a bounded
//! prefix of inbox/plugin messages, then the expiry sweep, then the
//! heartbeat. No ip is published to the store before its firewall call
//! reported `Applied`, and peer-origin blocks are never re-published.

use crate::collector::collect;
use crate::discovery::discover;
use crate::filter::{classify, Classification};
use crate::inbox::{run_inbox, InboxOptions};
use crate::matcher::match_hits;
use crate::outbox::{run_outbox, OutboxOptions};
use crate::plugin::{HttpBlocklistPlugin, Plugin, PluginCtx};
use crate::threshold::{ThresholdGate, ThresholdRule};
use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use warden_adapters::{BlockOutcome, BlocklistFetcher, FirewallBackend, SourceReader, UnitProbe};
use warden_config::{Config, ConfigError, Warning};
use warden_core::{BlockRecord, Clock, Hit, Ledger, PeerBlock, SupervisorMsg};
use warden_store::BlockStore;

/// Upper bound on inbox/plugin messages handled per tick, so peer traffic
/// cannot starve local detection.
const MAX_MESSAGES_PER_TICK: usize = 512;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("firewall unavailable at startup: {0}")]
    Firewall(String),
}

/// External collaborators, bound at process start.
pub struct SupervisorDeps {
    pub firewall: Arc<dyn FirewallBackend>,
    pub store: Arc<dyn BlockStore>,
    pub reader: Arc<dyn SourceReader>,
    pub probe: Arc<dyn UnitProbe>,
    /// Default cache directory for blocklist plugins
    pub plugin_cache: PathBuf,
}

/// Re-runs the config loader on reload; `None` disables reload handling.
pub type ReloadFn = Box<dyn Fn() -> Result<(Config, Vec<Warning>), ConfigError> + Send + Sync>;

pub struct Supervisor<C: Clock> {
    cfg: Arc<Config>,
    deps: SupervisorDeps,
    clock: C,
    reload_fn: Option<ReloadFn>,

    ledger: Ledger,
    gate: ThresholdGate,
    sources: Vec<warden_adapters::Source>,

    msg_tx: mpsc::Sender<SupervisorMsg>,
    msg_rx: mpsc::Receiver<SupervisorMsg>,
    outbox_tx: mpsc::UnboundedSender<BlockRecord>,
    outbox_rx: Option<mpsc::UnboundedReceiver<BlockRecord>>,

    shutdown: watch::Receiver<bool>,
    reload_requests: watch::Receiver<u64>,
    seen_reload: u64,
    plugin_generation: watch::Sender<u64>,
    plugins_need_respawn: bool,

    last_heartbeat: DateTime<Utc>,
    new_since_heartbeat: HashSet<IpNetwork>,
    ticks: u64,
}

impl<C: Clock> Supervisor<C> {
    pub fn new(
        cfg: Arc<Config>,
        deps: SupervisorDeps,
        clock: C,
        reload_fn: Option<ReloadFn>,
        shutdown: watch::Receiver<bool>,
        reload_requests: watch::Receiver<u64>,
    ) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(1024);
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
        let seen_reload = *reload_requests.borrow();
        let gate = gate_for(&cfg);
        let last_heartbeat = clock.now();
        Self {
            cfg,
            deps,
            clock,
            reload_fn,
            ledger: Ledger::new(),
            gate,
            sources: Vec::new(),
            msg_tx,
            msg_rx,
            outbox_tx,
            outbox_rx: Some(outbox_rx),
            shutdown,
            reload_requests,
            seen_reload,
            plugin_generation: watch::channel(0).0,
            plugins_need_respawn: false,
            last_heartbeat,
            new_since_heartbeat: HashSet::new(),
            ticks: 0,
        }
    }

    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.cfg)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn sources(&self) -> &[warden_adapters::Source] {
        &self.sources
    }

    /// Sender used by the inbox task and plugins; exposed for tests.
    pub fn msg_sender(&self) -> mpsc::Sender<SupervisorMsg> {
        self.msg_tx.clone()
    }

    /// The outbox receiver, taken once by `run` (or by tests).
    pub fn take_outbox_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<BlockRecord>> {
        self.outbox_rx.take()
    }

    /// Discovery plus static-set refresh. Fatal when the firewall cannot
    /// even be reached at startup; everything later is warn-and-continue.
    pub async fn bootstrap(&mut self) -> Result<(), SupervisorError> {
        for detector in &self.cfg.detectors {
            if detector.patterns.is_empty() {
                warn!(detector = %detector.key(), "detector has no patterns and is inert");
            }
        }
        self.sources = discover(&self.cfg, &*self.deps.probe).await;
        self.refresh_static()
            .await
            .map_err(SupervisorError::Firewall)
    }

    async fn refresh_static(&self) -> Result<(), String> {
        let never = &self.cfg.never_block;
        let always = &self.cfg.always_block;
        self.deps
            .firewall
            .refresh_static(never.v4(), never.v6(), always.v4(), always.v6())
            .await
            .map_err(|e| e.to_string())
    }

    /// Main loop. Returns after a clean shutdown drain.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        self.bootstrap().await?;

        let outbox_handle = self.spawn_outbox();
        let inbox_handle = self.spawn_inbox();
        let mut plugin_handles = self.spawn_plugins();

        let mut lookback = self.cfg.initial_lookback;
        while !*self.shutdown.borrow() {
            self.tick(lookback).await;
            lookback = self.cfg.sleep_time;

            if self.plugins_need_respawn {
                self.plugins_need_respawn = false;
                // Old tasks observe the generation bump and exit on their
                // own; respawn against the new config.
                plugin_handles.extend(self.spawn_plugins());
            }

            let sleep_time = self.cfg.sleep_time;
            tokio::select! {
                _ = tokio::time::sleep(sleep_time) => {}
                _ = self.shutdown.changed() => {}
            }
        }

        info!("shutdown requested, draining");
        let grace = self.cfg.graceful_timeout + Duration::from_secs(2);
        drop(self.outbox_tx);
        drop(self.msg_tx);
        if let Some(handle) = outbox_handle {
            if tokio::time::timeout(grace, handle).await.is_err() {
                warn!("outbox drain did not finish within the graceful window");
            }
        }
        let _ = tokio::time::timeout(grace, inbox_handle).await;
        for handle in plugin_handles {
            let _ = tokio::time::timeout(grace, handle).await;
        }
        info!("shutdown complete");
        Ok(())
    }

    fn spawn_outbox(&mut self) -> Option<JoinHandle<()>> {
        let rx = self.take_outbox_receiver()?;
        let opts = OutboxOptions {
            batch_size: self.cfg.store.batch_size.max(1),
            batch_timeout: self.cfg.store.batch_timeout,
            graceful_timeout: self.cfg.graceful_timeout,
            cleanup_interval: self.cfg.cleanup_interval,
            origin_host: self.cfg.hostname.clone(),
        };
        Some(tokio::spawn(run_outbox(
            Arc::clone(&self.deps.store),
            rx,
            opts,
            self.shutdown.clone(),
        )))
    }

    fn spawn_inbox(&self) -> JoinHandle<()> {
        let opts = InboxOptions {
            poll_interval: self.cfg.sleep_time,
            catch_up: self.cfg.block_time,
            origin_host: self.cfg.hostname.clone(),
        };
        tokio::spawn(run_inbox(
            Arc::clone(&self.deps.store),
            self.msg_tx.clone(),
            self.clock.clone(),
            opts,
            self.shutdown.clone(),
        ))
    }

    fn spawn_plugins(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        for plugin_cfg in &self.cfg.plugins {
            if !plugin_cfg.active {
                info!(plugin = %plugin_cfg.name, "plugin marked inactive, not spawning");
                continue;
            }
            let cache = plugin_cfg.cache_dir.clone().unwrap_or_else(|| self.deps.plugin_cache.clone());
            let fetcher = match BlocklistFetcher::new(cache) {
                Ok(f) => f,
                Err(e) => {
                    error!(plugin = %plugin_cfg.name, error = %e, "cannot build fetcher");
                    continue;
                }
            };
            let plugin = Box::new(HttpBlocklistPlugin::new(
                plugin_cfg.clone(),
                fetcher,
                self.clock.clone(),
            ));
            let ctx = PluginCtx {
                hits: self.msg_tx.clone(),
                shutdown: self.shutdown.clone(),
                reload_generation: self.plugin_generation.subscribe(),
                origin_host: self.cfg.hostname.clone(),
            };
            handles.push(tokio::spawn(plugin.run(ctx)));
        }
        handles
    }

    /// One pipeline iteration.
    pub async fn tick(&mut self, lookback: Duration) {
        self.check_reload().await;
        self.ticks += 1;

        let collected = collect(
            &*self.deps.reader,
            &self.sources,
            lookback,
            self.cfg.max_file_tail_lines,
        )
        .await;
        let hits = match_hits(&collected, &self.cfg.patterns, &self.cfg.hostname, self.clock.now());
        for hit in hits {
            self.process_hit(hit).await;
        }

        self.drain_messages(MAX_MESSAGES_PER_TICK).await;

        let now = self.clock.now();
        let swept = self.ledger.sweep(now);
        if swept > 0 {
            debug!(swept, "expired ledger entries pruned");
        }
        self.gate.prune(now);

        self.heartbeat_if_due().await;
    }

    /// A locally-detected (or plugin-contributed) hit: gate, classify,
    /// enforce, publish.
    async fn process_hit(&mut self, hit: Hit) {
        let now = self.clock.now();
        if !self.gate.admit(&hit.detector, hit.ip, now) {
            debug!(ip = %hit.ip, detector = %hit.detector, "below detector threshold");
            return;
        }
        match classify(&hit.ip, &self.cfg.never_block, &self.ledger, now) {
            Classification::NeverBlock => {
                debug!(ip = %hit.ip, "never-block address, ignoring hit");
            }
            Classification::AlreadyEnforced => {
                debug!(ip = %hit.ip, "already enforced, nothing to publish");
            }
            Classification::Candidate => {
                self.apply_block(hit.ip, self.cfg.block_time, Some(&hit)).await;
            }
        }
    }

    /// A peer-published block: filter locally, enforce with the residual
    /// ttl, never publish back.
    async fn process_peer(&mut self, block: PeerBlock) {
        let now = self.clock.now();
        let residual = (block.expires_at - now).num_seconds();
        if residual <= 0 {
            return;
        }
        match classify(&block.ip, &self.cfg.never_block, &self.ledger, now) {
            Classification::NeverBlock => {
                debug!(ip = %block.ip, "peer block vetoed by local never-block policy");
            }
            Classification::AlreadyEnforced => {}
            Classification::Candidate => {
                self.apply_block(block.ip, Duration::from_secs(residual as u64), None).await;
            }
        }
    }

    async fn apply_block(&mut self, ip: IpNetwork, ttl: Duration, publish: Option<&Hit>) {
        // Last line of defense for the never-block invariant; classify
        // upstream makes this unreachable. Logged, never fatal.
        if self.cfg.never_block.contains(ip.ip()) {
            error!(ip = %ip, "invariant violation: never-block address reached enforcement");
            return;
        }

        match self.deps.firewall.block(ip, ttl).await {
            Ok(BlockOutcome::Applied { expires_at }) => {
                self.ledger.insert(ip, expires_at);
                self.new_since_heartbeat.insert(ip);
                info!(ip = %ip, ttl_secs = ttl.as_secs(), "block applied");
                if let Some(hit) = publish {
                    if self.outbox_tx.send(BlockRecord::from_hit(hit, expires_at)).is_err() {
                        warn!(ip = %ip, "outbox gone, block not published");
                    }
                }
            }
            Ok(BlockOutcome::Rejected { reason, rc }) => {
                warn!(ip = %ip, rc, reason = %reason, "firewall rejected block");
            }
            Err(e) => {
                warn!(ip = %ip, error = %e, "firewall call failed");
            }
        }
    }

    /// Handle a bounded prefix of queued inbox/plugin messages.
    async fn drain_messages(&mut self, limit: usize) {
        let mut budget = limit;
        while budget > 0 {
            match self.msg_rx.try_recv() {
                Ok(SupervisorMsg::PeerBlocks(blocks)) => {
                    for block in blocks {
                        if budget == 0 {
                            break;
                        }
                        budget -= 1;
                        self.process_peer(block).await;
                    }
                }
                Ok(SupervisorMsg::PluginHit(hit)) => {
                    budget -= 1;
                    self.process_hit(hit).await;
                }
                Err(_) => break,
            }
        }
    }

    async fn heartbeat_if_due(&mut self) {
        let now = self.clock.now();
        let due = chrono::Duration::seconds(self.cfg.heartbeat.as_secs() as i64);
        if now - self.last_heartbeat < due {
            return;
        }
        match self.deps.firewall.snapshot().await {
            Ok(entries) => {
                let kernel = entries.len();
                self.ledger.reconcile(entries);
                info!(
                    enforced = kernel,
                    new_since_last = self.new_since_heartbeat.len(),
                    ticks = self.ticks,
                    "heartbeat: ledger reconciled from kernel"
                );
            }
            Err(e) => {
                warn!(error = %e, "heartbeat snapshot failed, keeping local ledger");
            }
        }
        self.new_since_heartbeat.clear();
        self.last_heartbeat = now;
    }

    /// Apply a pending reload request, if any. The old snapshot survives
    /// a failed load untouched.
    async fn check_reload(&mut self) {
        let requested = *self.reload_requests.borrow();
        if requested == self.seen_reload {
            return;
        }
        self.seen_reload = requested;
        let Some(reload) = &self.reload_fn else {
            warn!("reload requested but no loader is configured");
            return;
        };
        match reload() {
            Ok((cfg, warnings)) => {
                for warning in &warnings {
                    warn!(%warning, "config warning");
                }
                self.cfg = Arc::new(cfg);
                self.gate = gate_for(&self.cfg);
                self.sources = discover(&self.cfg, &*self.deps.probe).await;
                if let Err(e) = self.refresh_static().await {
                    warn!(error = %e, "static set refresh failed after reload");
                }
                self.plugin_generation.send_replace(requested);
                self.plugins_need_respawn = true;
                info!(sources = self.sources.len(), "configuration reloaded");
            }
            Err(e) => {
                error!(error = %e, "reload failed, keeping previous configuration");
            }
        }
    }
}

fn gate_for(cfg: &Config) -> ThresholdGate {
    ThresholdGate::new(cfg.detectors.iter().map(|d| {
        (
            d.name.clone(),
            ThresholdRule { max_threshold: d.max_threshold, time_window: d.time_window },
        )
    }))
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;

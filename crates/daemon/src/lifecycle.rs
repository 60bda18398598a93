// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: state directory, pid lock, dependency wiring, run.

use crate::signal;
use crate::Args;
use anyhow::{anyhow, Context};
use fs2::FileExt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use warden_adapters::{DryRunFirewall, FirewallBackend, LogReader, NftFirewall, SystemdProbe};
use warden_config::Config;
use warden_core::SystemClock;
use warden_engine::{Supervisor, SupervisorDeps};
use warden_store::PgBlockStore;

/// State directory: `$WARDEND_STATE_DIR`, then `/var/lib/warden`, then a
/// per-user state dir for unprivileged runs.
fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("WARDEND_STATE_DIR") {
        return PathBuf::from(dir);
    }
    let system = PathBuf::from("/var/lib/warden");
    if std::fs::create_dir_all(&system).is_ok() {
        return system;
    }
    dirs::state_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("warden")
}

/// Exclusive pid-file lock; released when the returned handle drops.
/// The file is only truncated after the lock is held, so a losing second
/// instance cannot clobber the live daemon's pid.
fn acquire_lock(dir: &Path) -> anyhow::Result<File> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating state dir {}", dir.display()))?;
    let path = dir.join("wardend.pid");
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .with_context(|| format!("opening pid file {}", path.display()))?;
    file.try_lock_exclusive()
        .map_err(|e| anyhow!("another wardend is running? ({e})"))?;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

pub async fn run(cfg: Config, args: Args) -> anyhow::Result<()> {
    let state = state_dir();
    // NOTE(lifetime): held to keep the exclusive pid lock until exit
    let _lock = acquire_lock(&state)?;

    info!(
        host = %cfg.hostname,
        detectors = cfg.detectors.len(),
        patterns = cfg.patterns.len(),
        dry_run = cfg.dry_run,
        "wardend starting"
    );

    let clock = SystemClock;
    let firewall: Arc<dyn FirewallBackend> = if cfg.dry_run {
        info!("dry-run: firewall mutations are logged, not applied");
        Arc::new(DryRunFirewall::new(clock))
    } else {
        Arc::new(NftFirewall::new(cfg.firewall.clone(), clock))
    };

    let store = Arc::new(
        PgBlockStore::connect_lazy(&cfg.store.url()).context("building database pool")?,
    );
    if let Err(e) = store.ensure_schema().await {
        // Non-fatal: local detection keeps running, sync retries.
        warn!(error = %e, "could not verify store schema; sync will retry");
    }

    let deps = SupervisorDeps {
        firewall,
        store,
        reader: Arc::new(LogReader::new(state.join("remote-cache"))),
        probe: Arc::new(SystemdProbe),
        plugin_cache: state.join("blocklists"),
    };

    let signals = signal::install();
    let dry_run = cfg.dry_run;
    let config_path = args.config.clone();
    let conf_dir = args.conf_dir();
    let reload_fn: warden_engine::supervisor::ReloadFn = Box::new(move || {
        warden_config::load(&config_path, conf_dir.as_deref()).map(|(mut cfg, warnings)| {
            // A CLI-requested dry run survives reloads.
            cfg.dry_run |= dry_run;
            (cfg, warnings)
        })
    });

    let supervisor = Supervisor::new(
        Arc::new(cfg),
        deps,
        clock,
        Some(reload_fn),
        signals.shutdown,
        signals.reload,
    );
    supervisor.run().await.map_err(|e| anyhow!(e))?;

    let _ = std::fs::remove_file(state.join("wardend.pid"));
    info!("wardend stopped");
    Ok(())
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;

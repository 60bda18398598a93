// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turn the detector registry into the concrete list of readable sources.
//!
//! Discovery is idempotent and re-run on every reload. Remote probing is
//! best-effort: a host that will not answer costs a warning, never the
//! tick.

use std::collections::HashSet;
use warden_adapters::{Source, UnitProbe};
use warden_config::{Config, Detector};

/// Resolve all active sources for the current config.
pub async fn discover(cfg: &Config, probe: &dyn UnitProbe) -> Vec<Source> {
    let running = if cfg.auto_mode { local_units(probe).await } else { None };

    let mut sources: Vec<Source> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut push = |source: Source| {
        if seen.insert(source.key()) {
            sources.push(source);
        }
    };

    for detector in &cfg.detectors {
        if detector.is_local() {
            discover_local(cfg, detector, running.as_ref(), &mut push);
        } else {
            discover_remote(detector, probe, &mut push).await;
        }
    }

    if sources.is_empty() {
        tracing::warn!("discovery produced no readable sources");
    } else {
        tracing::info!(count = sources.len(), "discovered sources");
    }
    sources
}

/// Probe the local systemd. `None` means the probe failed and listed
/// units should be trusted as-is rather than all dropped.
async fn local_units(probe: &dyn UnitProbe) -> Option<HashSet<String>> {
    match probe.running_units().await {
        Ok(units) => Some(units),
        Err(e) => {
            tracing::warn!(error = %e, "unit probe failed, keeping listed units unprobed");
            None
        }
    }
}

fn discover_local(
    cfg: &Config,
    detector: &Detector,
    running: Option<&HashSet<String>>,
    push: &mut impl FnMut(Source),
) {
    for unit in &detector.units {
        if cfg.exclude_units.contains(unit) {
            continue;
        }
        let keep = !unit.ends_with(".service")
            || running.is_none_or(|units| units.contains(unit));
        if keep {
            push(Source::Journal { unit: unit.clone() });
        } else {
            tracing::debug!(unit = %unit, detector = %detector.name, "unit not running, skipped");
        }
    }

    for path in &detector.files {
        if std::fs::File::open(path).is_ok() {
            push(Source::File { path: path.clone() });
        } else {
            tracing::warn!(path = %path.display(), detector = %detector.name, "file unreadable, skipped");
        }
    }
}

async fn discover_remote(
    detector: &Detector,
    probe: &dyn UnitProbe,
    push: &mut impl FnMut(Source),
) {
    let Some(host) = detector.host.clone() else { return };

    for path in &detector.remote_files {
        push(Source::RemoteFile {
            host: host.clone(),
            path: path.clone(),
            user: detector.remote_user.clone(),
            port: detector.remote_port,
            method: detector.fetch_method,
            fetch_interval: detector.fetch_interval,
            cache_dir: detector.cache_dir.clone(),
        });
    }

    if detector.remote_journald {
        match probe
            .remote_running_units(&host, detector.remote_user.as_deref(), detector.remote_port)
            .await
        {
            Ok(units) => {
                for unit in &detector.units {
                    if units.contains(unit) {
                        push(Source::RemoteJournal {
                            host: host.clone(),
                            unit: unit.clone(),
                            user: detector.remote_user.clone(),
                            port: detector.remote_port,
                        });
                    }
                }
            }
            Err(e) => {
                tracing::warn!(host = %host, error = %e, "remote journald probe failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;

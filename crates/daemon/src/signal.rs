// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OS signals, surfaced to the engine as watch-channel values.
//!
//! SIGHUP bumps the reload counter; SIGTERM and SIGINT flip the shutdown
//! flag. The engine never sees a raw signal.

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{info, warn};

pub struct Signals {
    pub shutdown: watch::Receiver<bool>,
    pub reload: watch::Receiver<u64>,
}

/// Install the handlers and return the receivers the engine consumes.
pub fn install() -> Signals {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (reload_tx, reload_rx) = watch::channel(0u64);

    match signal(SignalKind::hangup()) {
        Ok(mut hangup) => {
            tokio::spawn(async move {
                while hangup.recv().await.is_some() {
                    info!("SIGHUP received, scheduling reload");
                    reload_tx.send_modify(|n| *n += 1);
                }
            });
        }
        Err(e) => warn!(error = %e, "cannot install SIGHUP handler, reload disabled"),
    }

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut term), Ok(mut int)) => {
            tokio::spawn(async move {
                tokio::select! {
                    _ = term.recv() => info!("SIGTERM received"),
                    _ = int.recv() => info!("SIGINT received"),
                }
                let _ = shutdown_tx.send(true);
            });
        }
        (term, int) => {
            if let Err(e) = term {
                warn!(error = %e, "cannot install SIGTERM handler");
            }
            if let Err(e) = int {
                warn!(error = %e, "cannot install SIGINT handler");
            }
        }
    }

    Signals { shutdown: shutdown_rx, reload: reload_rx }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! wardend: the warden daemon binary.
//!
//! Wires config, adapters, store, and the engine together; everything
//! interesting happens in `warden-engine`. Exit codes: 0 on a clean run,
//! 1 on an unrecoverable startup error, 2 when `--test-config` finds the
//! configuration invalid.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod lifecycle;
mod logging;
mod signal;

use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use warden_config::Config;

#[derive(Debug, Parser)]
#[command(name = "wardend", about = "Distributed intrusion-mitigation daemon", version)]
struct Args {
    /// Path to the main configuration file
    #[arg(long, default_value = "/etc/warden/warden.conf")]
    config: PathBuf,

    /// Run the full pipeline but leave the kernel untouched
    #[arg(long)]
    dry_run: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    test_config: bool,

    /// Classify an address against the loaded filters and exit
    #[arg(long, value_name = "ADDR")]
    test_ip: Option<String>,
}

impl Args {
    /// Drop-in directory next to the main file (`conf.d/`).
    fn conf_dir(&self) -> Option<PathBuf> {
        self.config.parent().map(|dir| dir.join("conf.d"))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let loaded = warden_config::load(&args.config, args.conf_dir().as_deref());

    if args.test_config {
        return match loaded {
            Ok((_, warnings)) => {
                for warning in &warnings {
                    eprintln!("warning: {warning}");
                }
                println!("configuration OK: {}", args.config.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("configuration invalid: {e}");
                ExitCode::from(2)
            }
        };
    }

    let (mut cfg, warnings) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("cannot load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    cfg.dry_run |= args.dry_run;

    if let Some(addr) = &args.test_ip {
        return test_ip(&cfg, addr);
    }

    let _guard = logging::init(&cfg);
    for warning in &warnings {
        tracing::warn!(%warning, "config warning");
    }

    match lifecycle::run(cfg, args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "unrecoverable startup error");
            eprintln!("wardend: {e}");
            ExitCode::FAILURE
        }
    }
}

/// `--test-ip`: report which filter set claims the address.
fn test_ip(cfg: &Config, addr: &str) -> ExitCode {
    let ip: IpAddr = match addr.parse() {
        Ok(ip) => ip,
        Err(e) => {
            eprintln!("invalid address `{addr}`: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(net) = cfg.never_block.longest_match(ip) {
        println!("{ip}: never-block (matched {net})");
    } else if let Some(net) = cfg.always_block.longest_match(ip) {
        println!("{ip}: always-block (matched {net})");
    } else {
        println!("{ip}: candidate (no filter set matches)");
    }
    ExitCode::SUCCESS
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The immutable configuration snapshot.
//!
//! Built once by [`crate::load`], shared read-only behind an `Arc`, and
//! replaced wholesale on reload. Nothing here mutates after construction.

use crate::detector::{CompiledPattern, Detector};
use std::path::PathBuf;
use std::time::Duration;
use warden_core::CidrSet;

/// Baked-in authentication-failure patterns, used when the config does
/// not override `bad_conn_pattern<N>`.
pub const DEFAULT_BAD_CONN_PATTERNS: &[&str] = &[
    r"Failed password for",
    r"Invalid user",
    r"authentication failure",
    r"Connection closed by authenticating user",
    r"maximum authentication attempts exceeded",
    r"POSSIBLE BREAK-IN ATTEMPT",
];

/// Names of the nftables objects the daemon mutates. The table and its
/// sets are provisioned out-of-band; the daemon never creates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallIds {
    pub table_family: String,
    pub table_name: String,
    /// Dynamic ban sets, one per family
    pub set_v4: String,
    pub set_v6: String,
    /// Static sets repopulated from config on startup and reload
    pub never_set_v4: String,
    pub never_set_v6: String,
    pub always_set_v4: String,
    pub always_set_v6: String,
}

impl Default for FirewallIds {
    fn default() -> Self {
        Self {
            table_family: "inet".into(),
            table_name: "warden".into(),
            set_v4: "banlist".into(),
            set_v6: "banlist6".into(),
            never_set_v4: "neverblock".into(),
            never_set_v6: "neverblock6".into(),
            always_set_v4: "alwaysblock".into(),
            always_set_v6: "alwaysblock6".into(),
        }
    }
}

/// Shared-store connection and batching knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub batch_size: usize,
    pub batch_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            dbname: "warden".into(),
            user: "warden".into(),
            password: String::new(),
            batch_size: 50,
            batch_timeout: Duration::from_secs(5),
        }
    }
}

impl StoreConfig {
    /// Connection string for the Postgres pool.
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.dbname
        )
    }
}

/// One `[PublicBlocklistPlugins:<name>]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginConfig {
    pub name: String,
    pub url: String,
    pub active: bool,
    pub fetch_interval: Duration,
    pub cache_dir: Option<PathBuf>,
    pub ipv6: bool,
}

/// Immutable snapshot of every tunable.
#[derive(Debug, Clone)]
pub struct Config {
    /// Short hostname, used for `[host:...]` overrides and `origin_host`
    pub hostname: String,

    // Timing
    pub block_time: Duration,
    pub sleep_time: Duration,
    pub heartbeat: Duration,
    pub initial_lookback: Duration,
    pub graceful_timeout: Duration,
    /// Zero disables the store self-cleanup sweep
    pub cleanup_interval: Duration,

    // Filter sets
    pub never_block: CidrSet,
    pub always_block: CidrSet,

    pub firewall: FirewallIds,
    pub store: StoreConfig,

    // Discovery
    pub auto_mode: bool,
    pub exclude_units: Vec<String>,
    pub max_file_tail_lines: usize,

    pub dry_run: bool,
    pub log_level: String,
    pub log_file: Option<PathBuf>,

    // Derived
    pub detectors: Vec<Detector>,
    /// Union of all detector patterns plus the bad-conn set
    pub patterns: Vec<CompiledPattern>,
    pub plugins: Vec<PluginConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hostname: "localhost".into(),
            block_time: Duration::from_secs(691_200),
            sleep_time: Duration::from_secs(300),
            heartbeat: Duration::from_secs(3_600),
            initial_lookback: Duration::from_secs(3_600),
            graceful_timeout: Duration::from_secs(10),
            cleanup_interval: Duration::from_secs(86_400),
            never_block: CidrSet::default(),
            always_block: CidrSet::default(),
            firewall: FirewallIds::default(),
            store: StoreConfig::default(),
            auto_mode: true,
            exclude_units: Vec::new(),
            max_file_tail_lines: 1_000,
            dry_run: false,
            log_level: "info".into(),
            log_file: None,
            detectors: Vec::new(),
            patterns: Vec::new(),
            plugins: Vec::new(),
        }
    }
}


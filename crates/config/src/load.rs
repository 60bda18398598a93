// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assemble and validate a [`Config`] snapshot from disk.
//!
//! Merge order: main file, then `*.conf` drop-ins sorted by name, then the
//! `[host:<short>]` section folded over `[global]`. Loading is
//! referentially transparent for fixed file content; all host-specific
//! input is the hostname itself.

use crate::detector::{CompiledPattern, Detector};
use crate::ini::{parse_bool, split_list, Document, IniError};
use crate::model::{Config, PluginConfig, DEFAULT_BAD_CONN_PATTERNS};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use warden_core::{parse_net, AddrError, CidrSet};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Ini {
        path: PathBuf,
        #[source]
        source: IniError,
    },

    #[error("invalid `{key}` entry: {source}")]
    BadCidr {
        key: String,
        #[source]
        source: AddrError,
    },

    #[error("dynamic set names must not be empty (set_v4 / set_v6)")]
    MissingDynamicSets,

    #[error("no detectors and no patterns configured; nothing to do")]
    NoDetectorsOrPatterns,

    #[error("timing constraint violated: {0}")]
    BadTiming(String),
}

/// Non-fatal finding surfaced to the operator at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning(pub String);

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Load the configuration from the main file plus optional drop-in dir.
pub fn load(main: &Path, conf_dir: Option<&Path>) -> Result<(Config, Vec<Warning>), ConfigError> {
    load_with_hostname(main, conf_dir, &crate::host::short_hostname())
}

pub fn load_with_hostname(
    main: &Path,
    conf_dir: Option<&Path>,
    hostname: &str,
) -> Result<(Config, Vec<Warning>), ConfigError> {
    let mut doc = parse_file(main)?;

    if let Some(dir) = conf_dir {
        let mut extras: Vec<PathBuf> = match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "conf"))
                .collect(),
            // A missing drop-in directory is not an error.
            Err(_) => Vec::new(),
        };
        extras.sort();
        for path in extras {
            doc.merge(parse_file(&path)?);
        }
    }

    build(doc, hostname)
}

/// Build a config from in-memory INI fragments (tests, `--test-config`
/// with stdin). Fragments merge in order.
pub fn load_str(fragments: &[&str], hostname: &str) -> Result<(Config, Vec<Warning>), ConfigError> {
    let mut doc = Document::default();
    for fragment in fragments {
        let parsed = Document::parse(fragment).map_err(|source| ConfigError::Ini {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        doc.merge(parsed);
    }
    build(doc, hostname)
}

fn parse_file(path: &Path) -> Result<Document, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Document::parse(&text).map_err(|source| ConfigError::Ini { path: path.to_path_buf(), source })
}

fn build(mut doc: Document, hostname: &str) -> Result<(Config, Vec<Warning>), ConfigError> {
    doc.fold_into(&format!("host:{hostname}"), "global");

    let mut cfg = Config { hostname: hostname.to_string(), ..Config::default() };
    let mut warnings = Vec::new();

    if let Some(global) = doc.section("global").cloned() {
        apply_global(&mut cfg, &global, &mut warnings)?;
        compile_bad_conn(&mut cfg, &global, &mut warnings);
    } else {
        compile_bad_conn(&mut cfg, &IndexMap::new(), &mut warnings);
    }

    collect_detectors(&mut cfg, &doc, &mut warnings);
    collect_plugins(&mut cfg, &doc, &mut warnings);

    // Pattern union: every detector pattern, then the bad-conn set.
    let mut union: Vec<CompiledPattern> = Vec::new();
    for det in &cfg.detectors {
        union.extend(det.patterns.iter().cloned());
    }
    let bad_conn = std::mem::take(&mut cfg.patterns);
    union.extend(bad_conn);
    cfg.patterns = union;

    validate(&cfg, &mut warnings)?;
    Ok((cfg, warnings))
}

fn apply_global(
    cfg: &mut Config,
    global: &IndexMap<String, String>,
    warnings: &mut Vec<Warning>,
) -> Result<(), ConfigError> {
    let mut secs = |key: &str, slot: &mut Duration| {
        if let Some(value) = global.get(key) {
            match value.trim().parse::<u64>() {
                Ok(n) => *slot = Duration::from_secs(n),
                Err(_) => warnings.push(Warning(format!(
                    "ignoring unparseable `{key}` value `{value}`"
                ))),
            }
        }
    };

    secs("block_time", &mut cfg.block_time);
    secs("sleep_time", &mut cfg.sleep_time);
    secs("heartbeat", &mut cfg.heartbeat);
    secs("initial_lookback", &mut cfg.initial_lookback);
    secs("graceful_timeout", &mut cfg.graceful_timeout);
    secs("cleanup_interval", &mut cfg.cleanup_interval);
    secs("batch_timeout", &mut cfg.store.batch_timeout);

    cfg.never_block = parse_cidr_set(global, "never_block_v4", "never_block_v6")?;
    cfg.always_block = parse_cidr_set(global, "always_block_v4", "always_block_v6")?;

    let mut name = |key: &str, slot: &mut String| {
        if let Some(value) = global.get(key) {
            *slot = value.trim().to_string();
        }
    };
    name("table_family", &mut cfg.firewall.table_family);
    name("table_name", &mut cfg.firewall.table_name);
    name("set_v4", &mut cfg.firewall.set_v4);
    name("set_v6", &mut cfg.firewall.set_v6);
    name("never_set_v4", &mut cfg.firewall.never_set_v4);
    name("never_set_v6", &mut cfg.firewall.never_set_v6);
    name("always_set_v4", &mut cfg.firewall.always_set_v4);
    name("always_set_v6", &mut cfg.firewall.always_set_v6);
    name("db_host", &mut cfg.store.host);
    name("db_name", &mut cfg.store.dbname);
    name("db_user", &mut cfg.store.user);
    name("db_password", &mut cfg.store.password);
    name("log_level", &mut cfg.log_level);

    if let Some(value) = global.get("db_port") {
        match value.trim().parse() {
            Ok(port) => cfg.store.port = port,
            Err(_) => warnings.push(Warning(format!("ignoring unparseable `db_port` `{value}`"))),
        }
    }
    if let Some(value) = global.get("batch_size") {
        match value.trim().parse() {
            Ok(n) => cfg.store.batch_size = n,
            Err(_) => warnings.push(Warning(format!("ignoring unparseable `batch_size` `{value}`"))),
        }
    }
    if let Some(value) = global.get("max_file_tail_lines") {
        match value.trim().parse() {
            Ok(n) => cfg.max_file_tail_lines = n,
            Err(_) => warnings.push(Warning(format!(
                "ignoring unparseable `max_file_tail_lines` `{value}`"
            ))),
        }
    }
    if let Some(value) = global.get("auto_mode") {
        cfg.auto_mode = parse_bool(value);
    }
    if let Some(value) = global.get("dry_run") {
        cfg.dry_run = parse_bool(value);
    }
    if let Some(value) = global.get("exclude_units") {
        cfg.exclude_units = split_list(value);
    }
    if let Some(value) = global.get("log_file") {
        cfg.log_file = Some(PathBuf::from(value.trim()));
    }

    Ok(())
}

fn parse_cidr_set(
    global: &IndexMap<String, String>,
    v4_key: &str,
    v6_key: &str,
) -> Result<CidrSet, ConfigError> {
    let mut nets = Vec::new();
    for key in [v4_key, v6_key] {
        let Some(value) = global.get(key) else { continue };
        for element in split_list(value) {
            let net = parse_net(&element)
                .map_err(|source| ConfigError::BadCidr { key: key.to_string(), source })?;
            nets.push(net);
        }
    }
    Ok(CidrSet::new(nets))
}

fn compile_bad_conn(
    cfg: &mut Config,
    global: &IndexMap<String, String>,
    warnings: &mut Vec<Warning>,
) {
    let overrides: Vec<(&String, &String)> = global
        .iter()
        .filter(|(key, _)| {
            key.strip_prefix("bad_conn_pattern")
                .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
        })
        .collect();

    if overrides.is_empty() {
        for text in DEFAULT_BAD_CONN_PATTERNS {
            if let Ok(p) = CompiledPattern::compile(text, "core") {
                cfg.patterns.push(p);
            }
        }
        return;
    }

    for (key, text) in overrides {
        match CompiledPattern::compile(text, "core") {
            Ok(p) => cfg.patterns.push(p),
            Err(e) => warnings.push(Warning(format!("dropping unparseable `{key}`: {e}"))),
        }
    }
}

fn collect_detectors(cfg: &mut Config, doc: &Document, warnings: &mut Vec<Warning>) {
    for (section, keys) in doc.sections() {
        let Some(spec) = section.strip_prefix("detector:") else { continue };
        let (name, host) = match spec.split_once('@') {
            Some((name, host)) => (name.trim(), Some(host.trim())),
            None => (spec.trim(), None),
        };
        if name.is_empty() {
            warnings.push(Warning(format!("ignoring detector section with empty name `[{section}]`")));
            continue;
        }

        let (detector, dropped) = Detector::from_section(name, host, keys);
        for (key, err) in dropped {
            warnings.push(Warning(format!(
                "detector `{}`: dropping unparseable `{key}`: {err}",
                detector.key()
            )));
        }
        if detector.patterns.is_empty() {
            warnings.push(Warning(format!(
                "detector `{}` has no usable patterns and is inert",
                detector.key()
            )));
        }
        cfg.detectors.push(detector);
    }
}

fn collect_plugins(cfg: &mut Config, doc: &Document, warnings: &mut Vec<Warning>) {
    for (section, keys) in doc.sections() {
        let Some(name) = section.strip_prefix("PublicBlocklistPlugins:") else { continue };
        let Some(url) = keys.get("url") else {
            warnings.push(Warning(format!("plugin `{name}` has no url; skipping")));
            continue;
        };
        let fetch_interval = keys
            .get("fetch_interval")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(Duration::from_secs(3_600), Duration::from_secs);
        cfg.plugins.push(PluginConfig {
            name: name.trim().to_string(),
            url: url.trim().to_string(),
            active: keys.get("active").map_or(true, |v| parse_bool(v)),
            fetch_interval,
            cache_dir: keys.get("cache_dir").map(PathBuf::from),
            ipv6: keys.get("ipv6").map_or(false, |v| parse_bool(v)),
        });
    }
}

fn validate(cfg: &Config, warnings: &mut Vec<Warning>) -> Result<(), ConfigError> {
    if cfg.firewall.set_v4.is_empty() || cfg.firewall.set_v6.is_empty() {
        return Err(ConfigError::MissingDynamicSets);
    }
    if cfg.detectors.is_empty() && cfg.patterns.is_empty() {
        return Err(ConfigError::NoDetectorsOrPatterns);
    }
    for (label, value) in [
        ("block_time", cfg.block_time),
        ("sleep_time", cfg.sleep_time),
        ("heartbeat", cfg.heartbeat),
    ] {
        if value.is_zero() {
            return Err(ConfigError::BadTiming(format!("{label} must be positive")));
        }
    }
    if cfg.block_time < cfg.sleep_time {
        return Err(ConfigError::BadTiming("block_time must be >= sleep_time".into()));
    }
    if cfg.heartbeat < cfg.sleep_time {
        return Err(ConfigError::BadTiming("heartbeat must be >= sleep_time".into()));
    }

    if cfg.never_block.v4().is_empty() {
        let message = "never_block_v4 is EMPTY: every IPv4 address that matches a pattern \
                       will be blocked, including your own"
            .to_string();
        tracing::warn!("{message}");
        warnings.push(Warning(message));
    }

    Ok(())
}

#[cfg(test)]
#[path = "load_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Detector sections compiled into a registry.
//!
//! A detector names the units/files it watches and carries its compiled
//! patterns. A pattern that fails to compile is dropped with a warning
//! naming the detector; the rest of the detector survives.

use crate::ini::{parse_bool, split_list};
use indexmap::IndexMap;
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;

/// How remote files are pulled to the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMethod {
    #[default]
    Scp,
    Rsync,
}

impl FetchMethod {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "rsync" => FetchMethod::Rsync,
            _ => FetchMethod::Scp,
        }
    }

    pub fn binary(&self) -> &'static str {
        match self {
            FetchMethod::Scp => "scp",
            FetchMethod::Rsync => "rsync",
        }
    }
}

/// A compiled pattern keeping its source text for diagnostics.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub text: String,
    pub regex: Regex,
    /// Name of the detector the pattern belongs to (`core` for the
    /// baked-in auth-failure set).
    pub detector: String,
}

impl CompiledPattern {
    pub fn compile(text: &str, detector: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            text: text.to_string(),
            regex: Regex::new(text)?,
            detector: detector.to_string(),
        })
    }
}

/// One `[detector:<name>]` or `[detector:<name>@<host>]` section.
#[derive(Debug, Clone)]
pub struct Detector {
    pub name: String,
    /// Absent means local
    pub host: Option<String>,
    pub units: Vec<String>,
    pub files: Vec<PathBuf>,
    pub remote_files: Vec<String>,
    pub patterns: Vec<CompiledPattern>,
    pub remote_user: Option<String>,
    pub remote_port: Option<u16>,
    pub remote_journald: bool,
    pub fetch_method: FetchMethod,
    pub fetch_interval: Duration,
    pub cache_dir: Option<PathBuf>,
    /// Hits required within `time_window` before enforcement (1 = first hit)
    pub max_threshold: u32,
    pub time_window: Duration,
}

impl Detector {
    pub fn is_local(&self) -> bool {
        self.host.is_none()
    }

    /// Registry key: `name` or `name@host`
    pub fn key(&self) -> String {
        match &self.host {
            Some(host) => format!("{}@{}", self.name, host),
            None => self.name.clone(),
        }
    }

    /// Build a detector from its section. Unparseable `pattern<N>` keys
    /// are reported back as `(key, error)` and skipped.
    pub fn from_section(
        name: &str,
        host: Option<&str>,
        keys: &IndexMap<String, String>,
    ) -> (Self, Vec<(String, regex::Error)>) {
        let mut dropped = Vec::new();
        let mut patterns = Vec::new();
        for (key, value) in keys {
            let numbered = key
                .strip_prefix("pattern")
                .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()));
            if !numbered {
                continue;
            }
            match CompiledPattern::compile(value, name) {
                Ok(p) => patterns.push(p),
                Err(e) => dropped.push((key.clone(), e)),
            }
        }

        let get = |key: &str| keys.get(key).map(String::as_str);
        let secs = |key: &str, default: u64| {
            get(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map_or(Duration::from_secs(default), Duration::from_secs)
        };

        let detector = Detector {
            name: name.to_string(),
            host: host.map(str::to_string),
            units: get("units").map(split_list).unwrap_or_default(),
            files: get("files")
                .map(split_list)
                .unwrap_or_default()
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            remote_files: get("remote_files").map(split_list).unwrap_or_default(),
            patterns,
            remote_user: get("remote_user").map(str::to_string),
            remote_port: get("remote_port").and_then(|v| v.trim().parse().ok()),
            remote_journald: get("remote_journald").map(parse_bool).unwrap_or(false),
            fetch_method: get("fetch_method").map(FetchMethod::parse).unwrap_or_default(),
            fetch_interval: secs("fetch_interval", 300),
            cache_dir: get("cache_dir").map(PathBuf::from),
            max_threshold: get("max_threshold")
                .and_then(|v| v.trim().parse().ok())
                .filter(|n| *n >= 1)
                .unwrap_or(1),
            time_window: secs("time_window", 600),
        };
        (detector, dropped)
    }
}

#[cfg(test)]
#[path = "detector_tests.rs"]
mod tests;

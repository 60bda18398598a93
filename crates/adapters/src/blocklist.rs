// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Public-blocklist fetching for the plugin tasks.
//!
//! Conditional GET with a disk cache: the cache is authoritative while it
//! is younger than `fetch_interval`, a 304 just refreshes its age, and a
//! failed fetch falls back to whatever is cached. Entry parsing accepts
//! bare addresses and CIDRs, one per line, `#`/`;` comments stripped.

use chrono::Utc;
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use warden_config::PluginConfig;
use warden_core::parse_net;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum BlocklistError {
    #[error("http error fetching `{url}`: {detail}")]
    Http { url: String, detail: String },

    #[error("cache i/o for `{url}`: {source}")]
    Cache {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("client construction failed: {0}")]
    Client(String),
}

/// Cache sidecar: validators plus the fetch timestamp.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheMeta {
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: i64,
}

#[derive(Debug)]
pub struct FetchedList {
    pub entries: Vec<IpNetwork>,
    pub from_cache: bool,
}

pub struct BlocklistFetcher {
    client: reqwest::Client,
    cache_dir: PathBuf,
}

impl BlocklistFetcher {
    pub fn new(cache_dir: PathBuf) -> Result<Self, BlocklistError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| BlocklistError::Client(e.to_string()))?;
        Ok(Self { client, cache_dir })
    }

    fn cache_base(&self, plugin: &PluginConfig) -> PathBuf {
        let dir = plugin.cache_dir.clone().unwrap_or_else(|| self.cache_dir.clone());
        let digest = Sha256::digest(plugin.url.as_bytes());
        dir.join(format!("{digest:x}"))
    }

    /// Fetch the plugin's list, honoring the cache.
    pub async fn fetch(&self, plugin: &PluginConfig) -> Result<FetchedList, BlocklistError> {
        let base = self.cache_base(plugin);
        let list_path = base.with_extension("list");
        let meta_path = base.with_extension("meta");
        let meta = read_meta(&meta_path);

        let age = Utc::now().timestamp() - meta.fetched_at;
        if list_path.exists() && age >= 0 && (age as u64) < plugin.fetch_interval.as_secs() {
            return self.from_disk(plugin, &list_path, true);
        }

        let mut request = self.client.get(&plugin.url);
        if let Some(etag) = &meta.etag {
            request = request.header(reqwest::header::IF_NONE_MATCH, etag);
        }
        if let Some(modified) = &meta.last_modified {
            request = request.header(reqwest::header::IF_MODIFIED_SINCE, modified);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) if list_path.exists() => {
                tracing::warn!(plugin = %plugin.name, error = %e, "fetch failed, using cached list");
                return self.from_disk(plugin, &list_path, true);
            }
            Err(e) => {
                return Err(BlocklistError::Http { url: plugin.url.clone(), detail: e.to_string() })
            }
        };

        if response.status() == reqwest::StatusCode::NOT_MODIFIED && list_path.exists() {
            write_meta(&meta_path, &CacheMeta { fetched_at: Utc::now().timestamp(), ..meta })
                .map_err(|source| BlocklistError::Cache { url: plugin.url.clone(), source })?;
            return self.from_disk(plugin, &list_path, true);
        }

        if !response.status().is_success() {
            if list_path.exists() {
                tracing::warn!(
                    plugin = %plugin.name,
                    status = %response.status(),
                    "fetch failed, using cached list"
                );
                return self.from_disk(plugin, &list_path, true);
            }
            return Err(BlocklistError::Http {
                url: plugin.url.clone(),
                detail: format!("status {}", response.status()),
            });
        }

        let new_meta = CacheMeta {
            etag: header_string(&response, reqwest::header::ETAG),
            last_modified: header_string(&response, reqwest::header::LAST_MODIFIED),
            fetched_at: Utc::now().timestamp(),
        };
        let body = response
            .text()
            .await
            .map_err(|e| BlocklistError::Http { url: plugin.url.clone(), detail: e.to_string() })?;

        if let Some(parent) = list_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| BlocklistError::Cache { url: plugin.url.clone(), source })?;
        }
        std::fs::write(&list_path, &body)
            .map_err(|source| BlocklistError::Cache { url: plugin.url.clone(), source })?;
        write_meta(&meta_path, &new_meta)
            .map_err(|source| BlocklistError::Cache { url: plugin.url.clone(), source })?;

        Ok(FetchedList { entries: parse_entries(&body, plugin.ipv6), from_cache: false })
    }

    fn from_disk(
        &self,
        plugin: &PluginConfig,
        list_path: &Path,
        from_cache: bool,
    ) -> Result<FetchedList, BlocklistError> {
        let body = std::fs::read_to_string(list_path)
            .map_err(|source| BlocklistError::Cache { url: plugin.url.clone(), source })?;
        Ok(FetchedList { entries: parse_entries(&body, plugin.ipv6), from_cache })
    }
}

fn header_string(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response.headers().get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

fn read_meta(path: &Path) -> CacheMeta {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default()
}

fn write_meta(path: &Path, meta: &CacheMeta) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string(meta).map_err(std::io::Error::other)?;
    std::fs::write(path, text)
}

/// Parse blocklist lines into networks. IPv6 entries are dropped unless
/// the plugin opted in.
pub fn parse_entries(body: &str, ipv6: bool) -> Vec<IpNetwork> {
    let mut entries = Vec::new();
    for raw in body.lines() {
        let line = raw.split(['#', ';']).next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let Some(token) = line.split_whitespace().next() else { continue };
        let Ok(net) = parse_net(token) else { continue };
        if matches!(net, IpNetwork::V6(_)) && !ipv6 {
            continue;
        }
        if !entries.contains(&net) {
            entries.push(net);
        }
    }
    entries
}

#[cfg(test)]
#[path = "blocklist_tests.rs"]
mod tests;

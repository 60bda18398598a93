// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote-file pulls with a local cache.
//!
//! One cache file per source. A pull happens at most every
//! `fetch_interval`; between pulls, and whenever a pull fails, the cached
//! copy is served. Stale beats absent.

use crate::exec;
use crate::source::{ReadError, Source};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use warden_config::FetchMethod;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct RemoteFetcher {
    cache_root: PathBuf,
    last_fetch: Mutex<HashMap<String, Instant>>,
}

impl RemoteFetcher {
    pub fn new(cache_root: PathBuf) -> Self {
        Self { cache_root, last_fetch: Mutex::new(HashMap::new()) }
    }

    /// Cache path for a source key; content-addressed so exotic paths
    /// cannot escape the cache directory. A detector-level `cache_dir`
    /// overrides the fetcher root.
    pub fn cache_path(&self, key: &str, dir_override: Option<&std::path::Path>) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        dir_override
            .unwrap_or(&self.cache_root)
            .join(format!("{digest:x}.log"))
    }

    /// Return a local path holding the source's content, pulling first if
    /// the cache is due for a refresh.
    pub async fn ensure_fresh(&self, source: &Source) -> Result<PathBuf, ReadError> {
        let Source::RemoteFile { host, path, user, port, method, fetch_interval, cache_dir } =
            source
        else {
            return Err(ReadError::Remote {
                key: source.key(),
                detail: "not a remote file source".into(),
            });
        };

        let key = source.key();
        let cache = self.cache_path(&key, cache_dir.as_deref());
        let due = {
            let guard = self.last_fetch.lock();
            guard.get(&key).is_none_or(|at| at.elapsed() >= *fetch_interval)
        };
        if !due {
            return Ok(cache);
        }

        let cache_parent = cache.parent().unwrap_or(&self.cache_root);
        if let Err(e) = std::fs::create_dir_all(cache_parent) {
            return Err(ReadError::Remote { key, detail: e.to_string() });
        }

        match pull(host, path, user.as_deref(), *port, *method, &cache).await {
            Ok(()) => {
                self.last_fetch.lock().insert(key, Instant::now());
                Ok(cache)
            }
            Err(detail) if cache.exists() => {
                tracing::warn!(source = %key, %detail, "remote fetch failed, serving stale cache");
                Ok(cache)
            }
            Err(detail) => Err(ReadError::Remote { key, detail }),
        }
    }
}

async fn pull(
    host: &str,
    path: &str,
    user: Option<&str>,
    port: Option<u16>,
    method: FetchMethod,
    dest: &std::path::Path,
) -> Result<(), String> {
    let origin = match user {
        Some(user) => format!("{user}@{host}:{path}"),
        None => format!("{host}:{path}"),
    };
    let dest_str = dest.display().to_string();

    let port_value;
    let mut args: Vec<&str> = vec!["-o", "BatchMode=yes", "-o", "ConnectTimeout=10"];
    match method {
        FetchMethod::Scp => {
            if let Some(p) = port {
                port_value = p.to_string();
                args.push("-P");
                args.push(port_value.as_str());
            }
        }
        FetchMethod::Rsync => {
            args = vec!["-az", "--timeout=10"];
            if let Some(p) = port {
                port_value = format!("--rsh=ssh -p {p}");
                args.push(port_value.as_str());
            }
        }
    }
    args.push(origin.as_str());
    args.push(dest_str.as_str());

    let out = exec::run(method.binary(), &args, None, FETCH_TIMEOUT)
        .await
        .map_err(|e| e.to_string())?;
    if out.success() {
        Ok(())
    } else {
        Err(format!("rc {}: {}", out.rc, out.stderr.trim()))
    }
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;

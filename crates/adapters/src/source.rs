// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log sources and the reader trait the engine consumes.
//!
//! A [`Source`] is one concrete place lines come from, produced by the
//! engine's discovery pass. Reading any source yields a conversation map:
//! `conv_key → concatenated message`, where the conversation key groups
//! lines that belong to one event (PID-ish for journald, path+ordinal for
//! files).

use crate::file_tail::tail_lines;
use crate::journal::{self, JournalSpec};
use crate::remote::RemoteFetcher;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use warden_config::FetchMethod;

/// `conv_key → message` for one source.
pub type ConversationMap = HashMap<String, String>;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("journalctl failed for `{unit}`: {detail}")]
    Journal { unit: String, detail: String },

    #[error("cannot read `{path}`: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("remote fetch failed for `{key}`: {detail}")]
    Remote { key: String, detail: String },
}

/// One concrete log source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Journal {
        unit: String,
    },
    RemoteJournal {
        host: String,
        unit: String,
        user: Option<String>,
        port: Option<u16>,
    },
    File {
        path: PathBuf,
    },
    RemoteFile {
        host: String,
        path: String,
        user: Option<String>,
        port: Option<u16>,
        method: FetchMethod,
        fetch_interval: Duration,
        /// Detector-level override of the fetcher's cache root
        cache_dir: Option<PathBuf>,
    },
}

impl Source {
    /// Stable key identifying this source in hits and logs.
    pub fn key(&self) -> String {
        match self {
            Source::Journal { unit } => unit.clone(),
            Source::RemoteJournal { host, unit, .. } => format!("remote:{host}:{unit}"),
            Source::File { path } => path.display().to_string(),
            Source::RemoteFile { host, path, .. } => format!("{host}:{path}"),
        }
    }
}

/// Reads recent lines from a source and groups them into conversations.
#[async_trait]
pub trait SourceReader: Send + Sync {
    async fn read(
        &self,
        source: &Source,
        lookback: Duration,
        max_file_lines: usize,
    ) -> Result<ConversationMap, ReadError>;
}

/// Production reader: journalctl / file tail / remote cache.
pub struct LogReader {
    fetcher: RemoteFetcher,
}

impl LogReader {
    pub fn new(cache_root: PathBuf) -> Self {
        Self { fetcher: RemoteFetcher::new(cache_root) }
    }
}

#[async_trait]
impl SourceReader for LogReader {
    async fn read(
        &self,
        source: &Source,
        lookback: Duration,
        max_file_lines: usize,
    ) -> Result<ConversationMap, ReadError> {
        match source {
            Source::Journal { unit } => {
                journal::read(&JournalSpec::local(unit), lookback).await
            }
            Source::RemoteJournal { host, unit, user, port } => {
                journal::read(
                    &JournalSpec::remote(unit, host, user.as_deref(), *port),
                    lookback,
                )
                .await
            }
            Source::File { path } => {
                let lines = tail_lines(path, max_file_lines)
                    .await
                    .map_err(|source| ReadError::File { path: path.clone(), source })?;
                Ok(file_conversations(&path.display().to_string(), lines))
            }
            Source::RemoteFile { .. } => {
                let cached = self.fetcher.ensure_fresh(source).await?;
                let lines = tail_lines(&cached, max_file_lines)
                    .await
                    .map_err(|source| ReadError::File { path: cached.clone(), source })?;
                Ok(file_conversations(&source.key(), lines))
            }
        }
    }
}

/// File lines keyed `<key>:<reverse-ordinal>`: ordinal 0 is the line
/// closest to EOF. One message per line, no joining.
pub fn file_conversations(key: &str, lines: Vec<String>) -> ConversationMap {
    lines
        .into_iter()
        .enumerate()
        .map(|(idx, line)| (format!("{key}:{idx}"), line))
        .collect()
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;

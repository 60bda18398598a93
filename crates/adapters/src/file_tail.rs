// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded backward tail of a log file.
//!
//! The bound is a line count per read, not a time window: a very noisy
//! file yields its most recent `max_lines` lines regardless of how far
//! back in time they reach. That asymmetry with the journald lookback is
//! deliberate and matches long-standing behavior.

use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

const CHUNK: usize = 8 * 1024;

/// Last `max_lines` lines of `path`, most recent first.
///
/// The file is opened once per call and scanned backward from EOF in
/// fixed-size chunks, so only the tail of a large file is touched.
pub async fn tail_lines(path: &Path, max_lines: usize) -> std::io::Result<Vec<String>> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || tail_lines_blocking(&path, max_lines))
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?
}

fn tail_lines_blocking(path: &Path, max_lines: usize) -> std::io::Result<Vec<String>> {
    if max_lines == 0 {
        return Ok(Vec::new());
    }

    let mut file = std::fs::File::open(path)?;
    let len = file.seek(SeekFrom::End(0))?;

    let mut lines: Vec<String> = Vec::new();
    let mut pending = Vec::new();
    let mut pos = len;

    'outer: while pos > 0 {
        let take = CHUNK.min(pos as usize);
        pos -= take as u64;
        file.seek(SeekFrom::Start(pos))?;

        let mut chunk = vec![0u8; take];
        file.read_exact(&mut chunk)?;

        // `pending` holds the partial line continuing into the previous
        // (later) chunk.
        chunk.extend_from_slice(&pending);
        let mut pieces = chunk.split(|b| *b == b'\n');
        let head = pieces.next().unwrap_or_default().to_vec();
        let rest: Vec<&[u8]> = pieces.collect();

        for piece in rest.into_iter().rev() {
            if piece.is_empty() {
                continue;
            }
            lines.push(String::from_utf8_lossy(piece).into_owned());
            if lines.len() == max_lines {
                break 'outer;
            }
        }
        pending = head;
    }

    if pos == 0 && lines.len() < max_lines && !pending.is_empty() {
        lines.push(String::from_utf8_lossy(&pending).into_owned());
    }

    Ok(lines)
}

#[cfg(test)]
#[path = "file_tail_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

fn remote_source() -> Source {
    Source::RemoteFile {
        host: "web1".into(),
        path: "/var/log/auth.log".into(),
        user: Some("scan".into()),
        port: None,
        method: FetchMethod::Scp,
        fetch_interval: Duration::from_secs(300),
        cache_dir: None,
    }
}

#[test]
fn cache_path_is_stable_and_contained() {
    let dir = tempfile::TempDir::new().unwrap();
    let fetcher = RemoteFetcher::new(dir.path().to_path_buf());
    let a = fetcher.cache_path("web1:/var/log/auth.log", None);
    let b = fetcher.cache_path("web1:/var/log/auth.log", None);
    assert_eq!(a, b);
    assert!(a.starts_with(dir.path()));
    // Path separators in the key must not leak into the filename.
    assert!(a.file_name().unwrap().to_string_lossy().ends_with(".log"));
}

#[test]
fn distinct_sources_get_distinct_cache_files() {
    let dir = tempfile::TempDir::new().unwrap();
    let fetcher = RemoteFetcher::new(dir.path().to_path_buf());
    assert_ne!(
        fetcher.cache_path("web1:/var/log/auth.log", None),
        fetcher.cache_path("web2:/var/log/auth.log", None)
    );
}

#[tokio::test]
async fn failed_fetch_with_cache_serves_stale() {
    let dir = tempfile::TempDir::new().unwrap();
    let fetcher = RemoteFetcher::new(dir.path().to_path_buf());
    let source = remote_source();

    // Seed the cache as if a previous pull succeeded.
    let cache = fetcher.cache_path(&source.key(), None);
    std::fs::write(&cache, "old content\n").unwrap();

    // The scp to a bogus host fails (BatchMode, no credentials), but the
    // stale cache must still be handed back.
    let path = fetcher.ensure_fresh(&source).await.unwrap();
    assert_eq!(std::fs::read_to_string(path).unwrap(), "old content\n");
}

#[tokio::test]
async fn failed_fetch_without_cache_errors() {
    let dir = tempfile::TempDir::new().unwrap();
    let fetcher = RemoteFetcher::new(dir.path().to_path_buf());
    let err = fetcher.ensure_fresh(&remote_source()).await.unwrap_err();
    assert!(matches!(err, ReadError::Remote { .. }));
}

#[tokio::test]
async fn non_remote_source_is_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let fetcher = RemoteFetcher::new(dir.path().to_path_buf());
    let err = fetcher
        .ensure_fresh(&Source::File { path: "/var/log/auth.log".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, ReadError::Remote { .. }));
}

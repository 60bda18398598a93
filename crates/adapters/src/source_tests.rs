// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn source_keys_are_stable() {
    assert_eq!(Source::Journal { unit: "sshd.service".into() }.key(), "sshd.service");
    assert_eq!(
        Source::RemoteJournal {
            host: "web1".into(),
            unit: "sshd.service".into(),
            user: None,
            port: None
        }
        .key(),
        "remote:web1:sshd.service"
    );
    assert_eq!(Source::File { path: "/var/log/auth.log".into() }.key(), "/var/log/auth.log");
}

#[test]
fn file_conversations_key_by_reverse_ordinal() {
    let map = file_conversations("/var/log/x", vec!["newest".into(), "older".into()]);
    assert_eq!(map["/var/log/x:0"], "newest");
    assert_eq!(map["/var/log/x:1"], "older");
}

#[tokio::test]
async fn reads_file_source_tail() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("auth.log");
    std::fs::write(&path, "one 1.1.1.1\ntwo 2.2.2.2\nthree 3.3.3.3\n").unwrap();

    let reader = LogReader::new(dir.path().join("cache"));
    let map = reader
        .read(&Source::File { path: path.clone() }, Duration::from_secs(60), 2)
        .await
        .unwrap();

    assert_eq!(map.len(), 2);
    assert_eq!(map[&format!("{}:0", path.display())], "three 3.3.3.3");
    assert_eq!(map[&format!("{}:1", path.display())], "two 2.2.2.2");
}

#[tokio::test]
async fn missing_file_source_errors() {
    let dir = tempfile::TempDir::new().unwrap();
    let reader = LogReader::new(dir.path().join("cache"));
    let err = reader
        .read(
            &Source::File { path: dir.path().join("absent.log") },
            Duration::from_secs(60),
            10,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReadError::File { .. }));
}

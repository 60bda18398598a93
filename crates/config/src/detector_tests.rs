// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::ini::Document;

fn section(text: &str) -> IndexMap<String, String> {
    Document::parse(text)
        .unwrap()
        .section("detector:test")
        .unwrap()
        .clone()
}

#[test]
fn builds_local_detector() {
    let keys = section(
        "[detector:test]\nunits = sshd.service, ssh.socket\nfiles = /var/log/auth.log\npattern1 = Failed password\npattern2 = Invalid user\n",
    );
    let (det, dropped) = Detector::from_section("sshd", None, &keys);
    assert!(dropped.is_empty());
    assert!(det.is_local());
    assert_eq!(det.key(), "sshd");
    assert_eq!(det.units, vec!["sshd.service", "ssh.socket"]);
    assert_eq!(det.files, vec![PathBuf::from("/var/log/auth.log")]);
    assert_eq!(det.patterns.len(), 2);
    assert_eq!(det.patterns[0].text, "Failed password");
    assert_eq!(det.patterns[0].detector, "sshd");
}

#[test]
fn remote_detector_key_is_qualified() {
    let keys = section(
        "[detector:test]\nremote_files = /var/log/auth.log\nremote_user = scan\nremote_port = 2222\nremote_journald = 1\npattern1 = denied\n",
    );
    let (det, _) = Detector::from_section("sshd", Some("web1"), &keys);
    assert_eq!(det.key(), "sshd@web1");
    assert!(!det.is_local());
    assert_eq!(det.remote_user.as_deref(), Some("scan"));
    assert_eq!(det.remote_port, Some(2222));
    assert!(det.remote_journald);
}

#[test]
fn bad_pattern_dropped_rest_kept() {
    let keys = section("[detector:test]\npattern1 = [unclosed\npattern2 = valid.*pattern\n");
    let (det, dropped) = Detector::from_section("web", None, &keys);
    assert_eq!(det.patterns.len(), 1);
    assert_eq!(det.patterns[0].text, "valid.*pattern");
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].0, "pattern1");
}

#[test]
fn non_pattern_keys_are_not_patterns() {
    let keys = section("[detector:test]\npattern_style = ignored\npatternX = ignored\npattern1 = real\n");
    let (det, dropped) = Detector::from_section("web", None, &keys);
    assert!(dropped.is_empty());
    assert_eq!(det.patterns.len(), 1);
}

#[test]
fn threshold_defaults_to_first_hit() {
    let keys = section("[detector:test]\npattern1 = x\n");
    let (det, _) = Detector::from_section("web", None, &keys);
    assert_eq!(det.max_threshold, 1);
    assert_eq!(det.time_window, Duration::from_secs(600));
}

#[test]
fn threshold_of_zero_is_clamped_to_one() {
    let keys = section("[detector:test]\nmax_threshold = 0\npattern1 = x\n");
    let (det, _) = Detector::from_section("web", None, &keys);
    assert_eq!(det.max_threshold, 1);
}

#[test]
fn fetch_method_parses() {
    let keys = section("[detector:test]\nfetch_method = rsync\npattern1 = x\n");
    let (det, _) = Detector::from_section("web", None, &keys);
    assert_eq!(det.fetch_method, FetchMethod::Rsync);
    assert_eq!(det.fetch_method.binary(), "rsync");
}

#[test]
fn zero_pattern_detector_is_inert_but_valid() {
    let keys = section("[detector:test]\nunits = nginx.service\n");
    let (det, dropped) = Detector::from_section("web", None, &keys);
    assert!(det.patterns.is_empty());
    assert!(dropped.is_empty());
}

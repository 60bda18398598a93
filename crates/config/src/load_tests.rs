// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const MINIMAL: &str = "[global]\nnever_block_v4 = 10.0.0.0/8\n\n[detector:sshd]\nunits = sshd.service\npattern1 = Failed password\n";

#[test]
fn minimal_config_loads() {
    let (cfg, warnings) = load_str(&[MINIMAL], "node-a").unwrap();
    assert_eq!(cfg.hostname, "node-a");
    assert_eq!(cfg.detectors.len(), 1);
    // Detector pattern + baked-in bad-conn set
    assert!(cfg.patterns.len() > 1);
    assert!(warnings.is_empty());
}

#[test]
fn defaults_apply_when_keys_absent() {
    let (cfg, _) = load_str(&[MINIMAL], "node-a").unwrap();
    assert_eq!(cfg.block_time, Duration::from_secs(691_200));
    assert_eq!(cfg.sleep_time, Duration::from_secs(300));
    assert_eq!(cfg.store.batch_size, 50);
    assert_eq!(cfg.firewall.table_name, "warden");
    assert!(cfg.auto_mode);
}

#[test]
fn global_keys_override_defaults() {
    let text = "[global]\nblock_time = 600\nsleep_time = 60\nheartbeat = 120\ntable_name = jail\nnever_block_v4 = 10.0.0.0/8\ndb_host = db.internal\nbatch_size = 7\n\n[detector:sshd]\npattern1 = x\n";
    let (cfg, _) = load_str(&[text], "node-a").unwrap();
    assert_eq!(cfg.block_time, Duration::from_secs(600));
    assert_eq!(cfg.sleep_time, Duration::from_secs(60));
    assert_eq!(cfg.firewall.table_name, "jail");
    assert_eq!(cfg.store.host, "db.internal");
    assert_eq!(cfg.store.batch_size, 7);
}

#[test]
fn host_section_wins_over_global() {
    let text = "[global]\nsleep_time = 300\nnever_block_v4 = 10.0.0.0/8\n\n[host:node-a]\nsleep_time = 60\n\n[detector:sshd]\npattern1 = x\n";
    let (cfg, _) = load_str(&[text], "node-a").unwrap();
    assert_eq!(cfg.sleep_time, Duration::from_secs(60));

    // A different host ignores the override.
    let (cfg, _) = load_str(&[text], "node-b").unwrap();
    assert_eq!(cfg.sleep_time, Duration::from_secs(300));
}

#[test]
fn later_fragments_override_earlier() {
    let extra = "[global]\nsleep_time = 30\nblock_time = 60\nheartbeat = 45\n";
    let (cfg, _) = load_str(&[MINIMAL, extra], "node-a").unwrap();
    assert_eq!(cfg.sleep_time, Duration::from_secs(30));
}

#[test]
fn load_merges_conf_dir_in_sorted_order() {
    let dir = tempfile::TempDir::new().unwrap();
    let main = dir.path().join("warden.conf");
    std::fs::write(&main, MINIMAL).unwrap();

    let dropins = dir.path().join("conf.d");
    std::fs::create_dir(&dropins).unwrap();
    std::fs::write(dropins.join("10-a.conf"), "[global]\nsleep_time = 120\n").unwrap();
    std::fs::write(dropins.join("20-b.conf"), "[global]\nsleep_time = 90\n").unwrap();
    std::fs::write(dropins.join("ignored.txt"), "[global]\nsleep_time = 5\n").unwrap();

    let (cfg, _) = load_with_hostname(&main, Some(&dropins), "node-a").unwrap();
    assert_eq!(cfg.sleep_time, Duration::from_secs(90));
}

#[test]
fn load_is_referentially_transparent() {
    let dir = tempfile::TempDir::new().unwrap();
    let main = dir.path().join("warden.conf");
    std::fs::write(&main, MINIMAL).unwrap();

    let (a, _) = load_with_hostname(&main, None, "node-a").unwrap();
    let (b, _) = load_with_hostname(&main, None, "node-a").unwrap();
    assert_eq!(a.sleep_time, b.sleep_time);
    assert_eq!(a.detectors.len(), b.detectors.len());
    assert_eq!(
        a.patterns.iter().map(|p| &p.text).collect::<Vec<_>>(),
        b.patterns.iter().map(|p| &p.text).collect::<Vec<_>>()
    );
}

#[test]
fn empty_never_block_warns_loudly() {
    let text = "[detector:sshd]\npattern1 = Failed password\n";
    let (_, warnings) = load_str(&[text], "node-a").unwrap();
    assert!(warnings.iter().any(|w| w.0.contains("never_block_v4 is EMPTY")));
}

#[test]
fn missing_dynamic_set_names_refuse() {
    let text = "[global]\nset_v4 =\nnever_block_v4 = 10.0.0.0/8\n\n[detector:sshd]\npattern1 = x\n";
    assert!(matches!(
        load_str(&[text], "node-a").unwrap_err(),
        ConfigError::MissingDynamicSets
    ));
}

#[test]
fn no_detectors_no_patterns_refuses() {
    // Overriding the bad-conn set with an unparseable pattern empties the
    // union; with no detectors either there is nothing left to run.
    let text = "[global]\nbad_conn_pattern1 = [broken\nnever_block_v4 = 10.0.0.0/8\n";
    assert!(matches!(
        load_str(&[text], "node-a").unwrap_err(),
        ConfigError::NoDetectorsOrPatterns
    ));
}

#[test]
fn timing_constraints_enforced() {
    let text = "[global]\nsleep_time = 600\nblock_time = 300\nnever_block_v4 = 10.0.0.0/8\n\n[detector:s]\npattern1 = x\n";
    assert!(matches!(load_str(&[text], "n").unwrap_err(), ConfigError::BadTiming(_)));

    let text = "[global]\nsleep_time = 600\nheartbeat = 300\nnever_block_v4 = 10.0.0.0/8\n\n[detector:s]\npattern1 = x\n";
    assert!(matches!(load_str(&[text], "n").unwrap_err(), ConfigError::BadTiming(_)));

    let text = "[global]\nsleep_time = 0\nnever_block_v4 = 10.0.0.0/8\n\n[detector:s]\npattern1 = x\n";
    assert!(matches!(load_str(&[text], "n").unwrap_err(), ConfigError::BadTiming(_)));
}

#[test]
fn bad_cidr_is_fatal() {
    let text = "[global]\nnever_block_v4 = 10.0.0.0/99\n\n[detector:s]\npattern1 = x\n";
    assert!(matches!(load_str(&[text], "n").unwrap_err(), ConfigError::BadCidr { .. }));
}

#[test]
fn unparseable_detector_pattern_warns_and_survives() {
    let text = "[global]\nnever_block_v4 = 10.0.0.0/8\n\n[detector:web]\npattern1 = [broken\npattern2 = ok\n";
    let (cfg, warnings) = load_str(&[text], "n").unwrap();
    assert_eq!(cfg.detectors[0].patterns.len(), 1);
    assert!(warnings.iter().any(|w| w.0.contains("pattern1")));
}

#[test]
fn inert_detector_warns() {
    let text = "[global]\nnever_block_v4 = 10.0.0.0/8\n\n[detector:quiet]\nunits = quiet.service\n";
    let (cfg, warnings) = load_str(&[text], "n").unwrap();
    assert_eq!(cfg.detectors.len(), 1);
    assert!(warnings.iter().any(|w| w.0.contains("inert")));
}

#[test]
fn plugins_parse_with_defaults() {
    let text = "[global]\nnever_block_v4 = 10.0.0.0/8\n\n[detector:s]\npattern1 = x\n\n[PublicBlocklistPlugins:spamlist]\nurl = https://example.com/drop.txt\n";
    let (cfg, _) = load_str(&[text], "n").unwrap();
    assert_eq!(cfg.plugins.len(), 1);
    let plugin = &cfg.plugins[0];
    assert_eq!(plugin.name, "spamlist");
    assert!(plugin.active);
    assert!(!plugin.ipv6);
    assert_eq!(plugin.fetch_interval, Duration::from_secs(3_600));
}

#[test]
fn inactive_plugin_parses_as_inactive() {
    let text = "[global]\nnever_block_v4 = 10.0.0.0/8\n\n[detector:s]\npattern1 = x\n\n[PublicBlocklistPlugins:off]\nurl = https://example.com/x\nactive = 0\n";
    let (cfg, _) = load_str(&[text], "n").unwrap();
    assert!(!cfg.plugins[0].active);
}

#[test]
fn remote_detector_sections_parse() {
    let text = "[global]\nnever_block_v4 = 10.0.0.0/8\n\n[detector:auth@web1]\nremote_files = /var/log/auth.log\npattern1 = Failed password\n";
    let (cfg, _) = load_str(&[text], "n").unwrap();
    assert_eq!(cfg.detectors[0].key(), "auth@web1");
    assert_eq!(cfg.detectors[0].host.as_deref(), Some("web1"));
}

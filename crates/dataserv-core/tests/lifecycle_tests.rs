//! Integration tests for the shard lifecycle: build, checkup, audit, clean

use std::fs;

use dataserv_core::{
    AuditReport, Auditor, BuildOptions, HashScope, SeedChain, ShardEvent, ShardSpec, ShardStore,
    SHARD_SIZE,
};
use tempfile::TempDir;

const MIB: u64 = 1024 * 1024;

/// Build a "storj" store of two shards and check files, events and audits
fn run_storj_scenario(shard_size: u64, max_size: u64, scope: HashScope) {
    let dir = TempDir::new().unwrap();
    let chain = SeedChain::new("storj");
    let spec = ShardSpec::new(shard_size, max_size).unwrap();
    assert_eq!(spec.height(), 2);

    let store = ShardStore::open(dir.path(), spec, scope).unwrap();
    let mut heights = Vec::new();
    let mut sink = |event: ShardEvent| heights.push(event.height);
    let generated = store
        .build(&chain, BuildOptions::default(), &mut sink)
        .unwrap();

    assert_eq!(heights, vec![1, 2]);
    assert_eq!(generated.len(), 2);

    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    let mut expected: Vec<String> = (0..2).map(|i| chain.build_seed(i).to_hex()).collect();
    expected.sort();
    assert_eq!(names, expected);
    assert!(store.checkup(&chain, 2).unwrap());

    let auditor = Auditor::new(chain.clone(), shard_size, scope).unwrap();
    let report = auditor.full_audit(b"storj", &store, 2, true).unwrap();
    assert_eq!(report, AuditReport::Verdicts(vec![true, true]));

    // Corrupt the start of the second shard
    let path = store.shard_path(&chain.build_seed(1));
    let mut file = fs::OpenOptions::new().write(true).open(&path).unwrap();
    std::io::Write::write_all(&mut file, b"bad data is bad\n").unwrap();
    drop(file);

    let report = auditor.full_audit(b"storj", &store, 2, true).unwrap();
    assert_eq!(report, AuditReport::Verdicts(vec![true, false]));

    // A plain build leaves the corruption, a rebuild repairs it
    store
        .build(&chain, BuildOptions::default(), &mut dataserv_core::NullSink)
        .unwrap();
    let report = auditor.full_audit(b"storj", &store, 2, true).unwrap();
    assert_eq!(report, AuditReport::Verdicts(vec![true, false]));

    let rebuild = BuildOptions {
        rebuild: true,
        ..Default::default()
    };
    store
        .build(&chain, rebuild, &mut dataserv_core::NullSink)
        .unwrap();
    let report = auditor.full_audit(b"storj", &store, 2, true).unwrap();
    assert_eq!(report, AuditReport::Verdicts(vec![true, true]));

    assert_eq!(store.clean(&chain, 2).unwrap(), 2);
    assert!(!store.checkup(&chain, 2).unwrap());
    assert!(store.checkup(&chain, 0).unwrap());
}

#[test]
fn test_storj_scenario_small_shards() {
    run_storj_scenario(64 * 1024, 128 * 1024, HashScope::Full);
}

#[test]
fn test_storj_scenario_prefix_scope() {
    run_storj_scenario(256 * 1024, 512 * 1024 + 17, HashScope::Prefix(4096));
}

#[test]
#[ignore = "generates 256 MiB of shard data"]
fn test_storj_scenario_full_size() {
    run_storj_scenario(SHARD_SIZE, 256 * MIB, HashScope::default());
}

#[test]
fn test_shrinking_height_skips_everything() {
    let dir = TempDir::new().unwrap();
    let chain = SeedChain::new("epsilon");

    let large = ShardStore::open(dir.path(), ShardSpec::new(4096, 4096 * 3).unwrap(), HashScope::Full)
        .unwrap();
    let first = large
        .build(&chain, BuildOptions::default(), &mut dataserv_core::NullSink)
        .unwrap();

    let small = ShardStore::open(dir.path(), ShardSpec::new(4096, 4096).unwrap(), HashScope::Full)
        .unwrap();
    let mut events = 0;
    let mut sink = |_: ShardEvent| events += 1;
    let second = small
        .build(&chain, BuildOptions::default(), &mut sink)
        .unwrap();

    assert_eq!(events, 0);
    assert_eq!(second.len(), 1);
    assert_eq!(
        second.iter().next().unwrap(),
        first.iter().next().unwrap()
    );
}

#[test]
fn test_clean_before_any_build_is_noop() {
    let dir = TempDir::new().unwrap();
    let chain = SeedChain::new("delta");
    let store = ShardStore::open(dir.path(), ShardSpec::new(4096, 8192).unwrap(), HashScope::Full)
        .unwrap();

    assert_eq!(store.clean(&chain, 2).unwrap(), 0);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

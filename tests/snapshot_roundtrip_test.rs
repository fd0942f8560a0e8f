//! Snapshot save/load round trips through a real directory

mod common;

use common::FakeProcess;
use memlens::{
    save_process, Addr, MemSize, MemoryError, MemoryRead, Process, SaveOptions, SnapshotProcess,
};
use std::time::Duration;

fn patterned(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

fn target() -> FakeProcess {
    FakeProcess::new(
        4000,
        "roundtrip-target",
        vec![
            (0x100000, patterned(4096, 1), "rw-p"),
            (0x200000, patterned(65536, 2), "r--p"),
            // oversized under the test cap below
            (0x300000, patterned(128 * 1024, 3), "r--p"),
            (0x400000, vec![0u8; 512], "---p"),
        ],
    )
}

fn capped_options() -> SaveOptions {
    SaveOptions {
        max_region_size: MemSize::new(100 * 1024),
        ..SaveOptions::default()
    }
}

#[test]
fn test_save_writes_layout_and_counts() {
    let dir = tempfile::tempdir().unwrap();
    let stats = save_process(&target(), dir.path(), &capped_options()).unwrap();

    assert_eq!(stats.saved, 2);
    assert_eq!(stats.skipped_too_large, 1);
    assert_eq!(stats.skipped_non_readable, 1);
    assert_eq!(stats.read_error, 0);
    assert_eq!(stats.write_error, 0);

    assert!(dir.path().join("metadata.json").exists());
    assert!(dir.path().join("process_memory_map.json").exists());
    assert!(dir.path().join("blob_0x100000_4096.bin").exists());
    assert!(dir.path().join("blob_0x200000_65536.bin").exists());
    // the oversized region is listed in the map but has no blob
    assert!(!dir.path().join("blob_0x300000_131072.bin").exists());

    let blobs: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("blob_"))
        .collect();
    assert_eq!(blobs.len(), 2);
}

#[test]
fn test_loaded_snapshot_agrees_with_original() {
    let dir = tempfile::tempdir().unwrap();
    let original = target();
    save_process(&original, dir.path(), &capped_options()).unwrap();

    let snapshot = SnapshotProcess::load(dir.path()).unwrap();
    assert_eq!(snapshot.pid().unwrap(), 4000);
    assert_eq!(snapshot.name().as_deref(), Some("roundtrip-target"));
    assert_eq!(snapshot.memory_map().unwrap().len(), 4);
    assert_eq!(snapshot.blob_count(), 2);

    // primitive reads agree for every address covered by a persisted blob
    for addr in [0x100000u64, 0x100800, 0x100FF8, 0x200000, 0x20FF00] {
        let addr = Addr::new(addr);
        assert_eq!(
            snapshot.read_u64(addr).unwrap(),
            original.read_u64(addr).unwrap(),
            "disagreement at {addr}"
        );
    }
    assert_eq!(
        snapshot.read_bytes(Addr::new(0x100010), MemSize::new(64)).unwrap(),
        original.read_bytes(Addr::new(0x100010), MemSize::new(64)).unwrap()
    );
}

#[test]
fn test_missing_blob_reads_as_gap() {
    let dir = tempfile::tempdir().unwrap();
    save_process(&target(), dir.path(), &capped_options()).unwrap();

    let snapshot = SnapshotProcess::load(dir.path()).unwrap();
    assert!(matches!(
        snapshot.read_u8(Addr::new(0x300010)),
        Err(MemoryError::BlobMissing(addr)) if addr == Addr::new(0x300000)
    ));
}

#[test]
fn test_include_large_lifts_the_cap() {
    let dir = tempfile::tempdir().unwrap();
    let options = SaveOptions {
        include_large: true,
        ..capped_options()
    };
    let stats = save_process(&target(), dir.path(), &options).unwrap();
    assert_eq!(stats.saved, 3);
    assert_eq!(stats.skipped_too_large, 0);
    assert!(dir.path().join("blob_0x300000_131072.bin").exists());
}

#[test]
fn test_watchdog_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let options = SaveOptions {
        timeout: Duration::ZERO,
        ..SaveOptions::default()
    };
    let err = save_process(&target(), dir.path(), &options).unwrap_err();
    assert!(matches!(err, MemoryError::Timeout(_)));
    // metadata written before the watchdog fired is kept
    assert!(dir.path().join("metadata.json").exists());
    assert!(dir.path().join("process_memory_map.json").exists());
}

#[test]
fn test_snapshot_refuses_live_only_operations() {
    let dir = tempfile::tempdir().unwrap();
    save_process(&target(), dir.path(), &capped_options()).unwrap();

    let snapshot = SnapshotProcess::load(dir.path()).unwrap();
    assert!(matches!(
        snapshot.write_bytes(Addr::new(0x100000), &[0]),
        Err(MemoryError::Unsupported("write_bytes"))
    ));
    let other = tempfile::tempdir().unwrap();
    assert!(matches!(
        snapshot.save(other.path(), &SaveOptions::default()),
        Err(MemoryError::Unsupported("save"))
    ));
}

#[test]
fn test_load_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    assert!(SnapshotProcess::load(&missing).is_err());
}

#[test]
fn test_scan_over_loaded_snapshot() {
    use memlens::{AobPattern, MemoryScan};

    let dir = tempfile::tempdir().unwrap();
    let mut region = vec![0u8; 4096];
    region[100..104].copy_from_slice(&[0xCA, 0xFE, 0xD0, 0x0D]);
    let process = FakeProcess::new(4001, "scan-me", vec![(0x100000, region, "r--p")]);
    save_process(&process, dir.path(), &SaveOptions::default()).unwrap();

    let snapshot = SnapshotProcess::load(dir.path()).unwrap();
    let pattern = AobPattern::from_hex_string("ca fe d0 0d").unwrap();
    assert_eq!(snapshot.scan(&pattern).unwrap(), vec![Addr::new(0x100064)]);
}

//! Durability Tests
//!
//! Tests for reopening a data directory: committed bookings and their
//! versions come back together, torn tails are discarded, damage inside
//! the log stops the open.

use crate::*;
use std::fs::OpenOptions;
use std::io::Write;

fn open_strict(dir: &std::path::Path) -> Berth {
    init_tracing();
    Berth::builder().path(dir).strict().open().expect("open berth")
}

// ============================================================================
// Reopen
// ============================================================================

#[test]
fn bookings_and_versions_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let berth = open_strict(dir.path());
        berth.register_room(ResourceId::new(1), &room(1)).unwrap();
        berth.register_room(ResourceId::new(2), &room(2)).unwrap();
        for expected in 0..3 {
            assert!(berth.reserve(&request(1, expected, "ivy")).is_committed());
        }
        assert!(berth.reserve(&request(2, 0, "jack")).is_committed());
        assert!(berth.reserve(&request(2, 0, "kate")).is_conflict());
    }

    let berth = open_strict(dir.path());
    assert_eq!(berth.version(ResourceId::new(1)).unwrap(), Version::new(3));
    assert_eq!(berth.version(ResourceId::new(2)).unwrap(), Version::new(1));
    assert_paired(&berth, 1, 0);
    assert_paired(&berth, 2, 0);
    assert_eq!(berth.room(ResourceId::new(2)).unwrap(), room(2));

    let recovery = berth.recovery();
    assert_eq!(recovery.resources, 2);
    assert_eq!(recovery.bookings, 4);
    assert_eq!(recovery.truncated_bytes, 0);
}

#[test]
fn reservations_continue_after_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let first_record = {
        let berth = open_strict(dir.path());
        berth.register_room(ResourceId::new(1), &room(1)).unwrap();
        berth.book(&request(1, 0, "liam")).unwrap().1
    };

    let berth = open_strict(dir.path());
    // The old view is stale after restart too
    assert!(berth.reserve(&request(1, 0, "mia")).is_conflict());

    let (version, record) = berth.book(&request(1, 1, "mia")).unwrap();
    assert_eq!(version, Version::new(2));
    assert!(record.as_u64() > first_record.as_u64());
    assert_paired(&berth, 1, 0);
}

#[test]
fn buffered_mode_flush_then_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let berth = Berth::builder()
            .path(dir.path())
            .buffered_with(60_000, 10_000)
            .open()
            .unwrap();
        berth.register_room(ResourceId::new(1), &room(1)).unwrap();
        berth.reserve(&request(1, 0, "noah"));
        berth.flush().unwrap();
    }

    let berth = Berth::open(dir.path()).unwrap();
    assert_eq!(berth.version(ResourceId::new(1)).unwrap(), Version::new(1));
    assert_paired(&berth, 1, 0);
}

#[test]
fn config_file_opens_durable_instance() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let config_path = dir.path().join("berth.toml");
    std::fs::write(
        &config_path,
        format!(
            "data_dir = {:?}\n\n[durability]\nmode = \"strict\"\n",
            data_dir.to_string_lossy()
        ),
    )
    .unwrap();

    let config = BerthConfig::from_file(&config_path).unwrap();
    {
        let berth = Berth::from_config(&config).unwrap();
        assert_eq!(berth.durability_mode(), DurabilityMode::Strict);
        berth.register_room(ResourceId::new(4), &room(4)).unwrap();
        berth.reserve(&request(4, 0, "olga"));
    }

    let berth = Berth::from_config(&config).unwrap();
    assert_eq!(berth.version(ResourceId::new(4)).unwrap(), Version::new(1));
}

#[test]
fn no_durability_replays_but_does_not_log() {
    let dir = tempfile::tempdir().unwrap();

    {
        let berth = open_strict(dir.path());
        berth.register_room(ResourceId::new(1), &room(1)).unwrap();
    }
    let wal_len = std::fs::metadata(dir.path().join(berth::WAL_FILE_NAME))
        .unwrap()
        .len();

    {
        let berth = Berth::builder().path(dir.path()).no_durability().open().unwrap();
        assert_eq!(berth.version(ResourceId::new(1)).unwrap(), Version::INITIAL);
        assert!(berth.reserve(&request(1, 0, "pete")).is_committed());
    }

    let after = std::fs::metadata(dir.path().join(berth::WAL_FILE_NAME))
        .unwrap()
        .len();
    assert_eq!(after, wal_len);
}

// ============================================================================
// Crash artifacts
// ============================================================================

#[test]
fn torn_tail_is_truncated_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let wal_path = dir.path().join(berth::WAL_FILE_NAME);

    {
        let berth = open_strict(dir.path());
        berth.register_room(ResourceId::new(1), &room(1)).unwrap();
        berth.reserve(&request(1, 0, "quinn"));
    }
    let good_len = std::fs::metadata(&wal_path).unwrap().len();

    // A crash mid-append leaves a partial frame
    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[0x2a, 0x00, 0x00, 0x00, 0xde, 0xad]).unwrap();
    drop(file);

    let berth = open_strict(dir.path());
    assert_eq!(berth.recovery().truncated_bytes, 6);
    assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), good_len);
    assert_eq!(berth.version(ResourceId::new(1)).unwrap(), Version::new(1));

    // New commits append after the last good frame
    assert!(berth.reserve(&request(1, 1, "quinn")).is_committed());
    drop(berth);

    let berth = open_strict(dir.path());
    assert_eq!(berth.recovery().truncated_bytes, 0);
    assert_eq!(berth.version(ResourceId::new(1)).unwrap(), Version::new(2));
    assert_paired(&berth, 1, 0);
}

#[test]
fn damaged_entry_in_the_middle_refuses_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let wal_path = dir.path().join(berth::WAL_FILE_NAME);

    {
        let berth = open_strict(dir.path());
        berth.register_room(ResourceId::new(1), &room(1)).unwrap();
    }
    let registered_len = std::fs::metadata(&wal_path).unwrap().len() as usize;
    {
        let berth = open_strict(dir.path());
        assert!(berth.reserve(&request(1, 0, "rose")).is_committed());
        assert!(berth.reserve(&request(1, 1, "sam")).is_committed());
        berth.register_room(ResourceId::new(2), &room(2)).unwrap();
    }

    // Flip a payload byte of the first booking; later commits stay intact
    let mut bytes = std::fs::read(&wal_path).unwrap();
    bytes[registered_len + 10] ^= 0xff;
    std::fs::write(&wal_path, &bytes).unwrap();

    let err = Berth::builder().path(dir.path()).strict().open().unwrap_err();
    assert!(matches!(err, Error::Corruption(_)));
    assert!(err.is_serious());

    // Acknowledged commits after the damage are still on disk
    assert_eq!(std::fs::read(&wal_path).unwrap(), bytes);
}

#[test]
fn batched_commits_reach_disk_after_drop() {
    let dir = tempfile::tempdir().unwrap();

    {
        let berth = Berth::builder()
            .path(dir.path())
            .buffered_with(60_000, 10_000)
            .open()
            .unwrap();
        berth.register_room(ResourceId::new(1), &room(1)).unwrap();
        assert!(berth.reserve(&request(1, 0, "tess")).is_committed());
        // No flush; dropping syncs the pending tail
    }

    let berth = open_strict(dir.path());
    assert_eq!(berth.version(ResourceId::new(1)).unwrap(), Version::new(1));
    assert_paired(&berth, 1, 0);
}

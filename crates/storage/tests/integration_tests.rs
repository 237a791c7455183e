//! Integration tests for the storage layer
//!
//! These tests verify that Store works correctly as a complete system:
//! - Key ordering seen through cursors
//! - Snapshot isolation between readers and the writer
//! - Single-writer admission under concurrent access
//! - Sequence persistence across commit and rollback
//! - Durable stores reopened from their directory

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use proptest::prelude::*;
use rowkv_storage::{StorageError, Store, LOG_FILE_NAME};

// ============================================================================
// Ordering
// ============================================================================

mod ordering {
    use super::*;

    #[test]
    fn test_cursor_skips_nothing_and_marks_buckets() {
        let store = Store::new();
        let mut tx = store.begin(true);
        tx.create_bucket_if_not_exists(&["b", "nested"]).unwrap();
        tx.put(&["b"], b"a", b"1").unwrap();
        tx.put(&["b"], b"z", b"2").unwrap();
        tx.commit().unwrap();

        let tx = store.begin(false);
        let entries: Vec<_> = tx.bucket(&["b"]).unwrap().cursor().collect();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].key, b"a".to_vec());
        assert_eq!(entries[1].key, b"nested".to_vec());
        assert!(entries[1].is_bucket());
        assert_eq!(entries[2].value.as_deref(), Some(&b"2"[..]));
    }

    #[test]
    fn test_pending_writes_merge_with_committed() {
        let store = Store::new();
        let mut tx = store.begin(true);
        tx.create_bucket_if_not_exists(&["b"]).unwrap();
        for k in [b"k1", b"k5"] {
            tx.put(&["b"], k, b"old").unwrap();
        }
        tx.commit().unwrap();

        let mut tx = store.begin(true);
        tx.put(&["b"], b"k3", b"new").unwrap();
        tx.put(&["b"], b"k5", b"new").unwrap();

        let entries: Vec<_> = tx
            .bucket(&["b"])
            .unwrap()
            .cursor()
            .map(|e| (e.key, e.value.unwrap()))
            .collect();
        assert_eq!(
            entries,
            vec![
                (b"k1".to_vec(), b"old".to_vec()),
                (b"k3".to_vec(), b"new".to_vec()),
                (b"k5".to_vec(), b"new".to_vec()),
            ]
        );
    }

    proptest! {
        #[test]
        fn prop_cursor_matches_sorted_map(
            entries in prop::collection::btree_map(
                prop::collection::vec(any::<u8>(), 1..8),
                prop::collection::vec(any::<u8>(), 0..8),
                0..64,
            )
        ) {
            let store = Store::new();
            let mut tx = store.begin(true);
            tx.create_bucket_if_not_exists(&["p"]).unwrap();
            // Insert in reverse to make sure order comes from the store.
            for (k, v) in entries.iter().rev() {
                tx.put(&["p"], k, v).unwrap();
            }
            tx.commit().unwrap();

            let tx = store.begin(false);
            let scanned: BTreeMap<Vec<u8>, Vec<u8>> = tx
                .bucket(&["p"])
                .unwrap()
                .cursor()
                .map(|e| (e.key, e.value.unwrap()))
                .collect();
            let keys: Vec<_> = tx.bucket(&["p"]).unwrap().cursor().map(|e| e.key).collect();
            let mut sorted = keys.clone();
            sorted.sort();

            prop_assert_eq!(keys, sorted);
            prop_assert_eq!(scanned, entries);
        }
    }
}

// ============================================================================
// Isolation
// ============================================================================

mod isolation {
    use super::*;

    #[test]
    fn test_reader_never_sees_uncommitted_writes() {
        let store = Store::new();
        let mut writer = store.begin(true);
        writer.create_bucket_if_not_exists(&["b"]).unwrap();
        writer.put(&["b"], b"k", b"v").unwrap();

        let reader = store.begin(false);
        assert!(reader.bucket(&["b"]).is_none());

        writer.commit().unwrap();
        assert!(reader.bucket(&["b"]).is_none());
        assert!(store.begin(false).get(&["b"], b"k").is_some());
    }

    #[test]
    fn test_cursor_outlives_transaction() {
        let store = Store::new();
        let mut tx = store.begin(true);
        tx.create_bucket_if_not_exists(&["b"]).unwrap();
        tx.put(&["b"], b"k", b"v").unwrap();
        tx.commit().unwrap();

        let cursor = {
            let tx = store.begin(false);
            tx.bucket(&["b"]).unwrap().cursor()
        };

        let mut tx = store.begin(true);
        tx.put(&["b"], b"k2", b"v").unwrap();
        tx.commit().unwrap();

        assert_eq!(cursor.count(), 1);
    }

    #[test]
    fn test_readers_during_writes_see_whole_commits() {
        let store = Store::new();
        let mut tx = store.begin(true);
        tx.create_bucket_if_not_exists(&["b"]).unwrap();
        tx.commit().unwrap();

        let writer_store = store.clone();
        let writer = thread::spawn(move || {
            for i in 0u32..200 {
                let mut tx = writer_store.begin(true);
                // Two keys per commit; readers must never see one without the other.
                tx.put(&["b"], format!("a{:04}", i).as_bytes(), b"v").unwrap();
                tx.put(&["b"], format!("b{:04}", i).as_bytes(), b"v").unwrap();
                tx.commit().unwrap();
            }
        });

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        let tx = store.begin(false);
                        let len = tx.bucket(&["b"]).unwrap().len();
                        assert_eq!(len % 2, 0);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(store.begin(false).bucket(&["b"]).unwrap().len(), 400);
        assert_eq!(store.current_version(), 201);
    }
}

// ============================================================================
// Writers
// ============================================================================

mod writers {
    use super::*;

    #[test]
    fn test_writers_are_serialized() {
        let store = Store::new();
        let mut tx = store.begin(true);
        tx.create_bucket_if_not_exists(&["b"]).unwrap();
        tx.commit().unwrap();

        let active = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = store.clone();
                let active = Arc::clone(&active);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let mut tx = store.begin(true);
                    assert_eq!(active.fetch_add(1, Ordering::SeqCst), 0);
                    tx.put(&["b"], format!("k{}", i).as_bytes(), b"v").unwrap();
                    thread::sleep(Duration::from_millis(5));
                    active.fetch_sub(1, Ordering::SeqCst);
                    tx.commit().unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.begin(false).bucket(&["b"]).unwrap().len(), 4);
    }

    #[test]
    fn test_read_only_rejects_mutation() {
        let store = Store::new();
        let mut tx = store.begin(false);
        assert_eq!(
            tx.create_bucket_if_not_exists(&["b"]),
            Err(StorageError::ReadOnly)
        );
        assert_eq!(tx.next_sequence(&["b"]), Err(StorageError::ReadOnly));
    }
}

// ============================================================================
// Sequences
// ============================================================================

mod sequences {
    use super::*;

    #[test]
    fn test_sequence_survives_commit_not_rollback() {
        let store = Store::new();

        let mut tx = store.begin(true);
        tx.create_bucket_if_not_exists(&["b"]).unwrap();
        assert_eq!(tx.next_sequence(&["b"]).unwrap(), 1);
        assert_eq!(tx.next_sequence(&["b"]).unwrap(), 2);
        tx.commit().unwrap();

        let mut tx = store.begin(true);
        assert_eq!(tx.next_sequence(&["b"]).unwrap(), 3);
        tx.rollback();

        let mut tx = store.begin(true);
        assert_eq!(tx.next_sequence(&["b"]).unwrap(), 3);
        drop(tx);

        let mut tx = store.begin(true);
        assert_eq!(tx.next_sequence(&["b"]).unwrap(), 3);
    }

    #[test]
    fn test_sequences_are_per_bucket() {
        let store = Store::new();
        let mut tx = store.begin(true);
        tx.create_bucket_if_not_exists(&["a"]).unwrap();
        tx.create_bucket_if_not_exists(&["a", "child"]).unwrap();
        assert_eq!(tx.next_sequence(&["a"]).unwrap(), 1);
        assert_eq!(tx.next_sequence(&["a", "child"]).unwrap(), 1);
        assert_eq!(tx.next_sequence(&["a"]).unwrap(), 2);
    }
}

// ============================================================================
// Durability
// ============================================================================

mod durability {
    use super::*;
    use std::fs::{self, OpenOptions};
    use std::io::Write;
    use tempfile::TempDir;

    fn fill(store: &Store, bucket: &str, count: u32) {
        let mut tx = store.begin(true);
        tx.create_bucket_if_not_exists(&[bucket]).unwrap();
        for i in 0..count {
            let seq = tx.next_sequence(&[bucket]).unwrap();
            tx.put(&[bucket], &seq.to_be_bytes(), &i.to_le_bytes()).unwrap();
        }
        tx.commit().unwrap();
    }

    #[test]
    fn test_reopen_sees_every_commit() {
        let dir = TempDir::new().unwrap();
        {
            let store = Store::open(dir.path()).unwrap();
            for _ in 0..5 {
                fill(&store, "b", 10);
            }
        }

        let store = Store::open(dir.path()).unwrap();
        assert_eq!(store.current_version(), 5);
        assert_eq!(store.begin(false).bucket(&["b"]).unwrap().len(), 50);

        let mut tx = store.begin(true);
        assert_eq!(tx.next_sequence(&["b"]).unwrap(), 51);
    }

    #[test]
    fn test_reopen_after_checkpoint_keeps_appending() {
        let dir = TempDir::new().unwrap();
        for round in 1..=3u32 {
            let store = Store::open(dir.path()).unwrap();
            fill(&store, "b", 4);
            assert_eq!(
                store.begin(false).bucket(&["b"]).unwrap().len(),
                (round * 4) as usize
            );
        }
        let store = Store::open(dir.path()).unwrap();
        assert_eq!(store.current_version(), 3);
        assert_eq!(store.begin(false).bucket(&["b"]).unwrap().len(), 12);
    }

    #[test]
    fn test_torn_append_is_dropped() {
        let dir = TempDir::new().unwrap();
        {
            let store = Store::open(dir.path()).unwrap();
            fill(&store, "b", 3);
        }
        {
            // A record header promising more bytes than were written.
            let mut file = OpenOptions::new()
                .append(true)
                .open(dir.path().join(LOG_FILE_NAME))
                .unwrap();
            file.write_all(&[0x40, 0, 0, 0, 1, 2, 3]).unwrap();
        }

        let store = Store::open(dir.path()).unwrap();
        assert_eq!(store.begin(false).bucket(&["b"]).unwrap().len(), 3);
        fill(&store, "b", 1);
        drop(store);

        let store = Store::open(dir.path()).unwrap();
        assert_eq!(store.begin(false).bucket(&["b"]).unwrap().len(), 4);
    }

    #[test]
    fn test_corrupt_log_refuses_to_open() {
        let dir = TempDir::new().unwrap();
        {
            let store = Store::open(dir.path()).unwrap();
            fill(&store, "b", 3);
        }
        let path = dir.path().join(LOG_FILE_NAME);
        let mut bytes = fs::read(&path).unwrap();
        bytes[6] ^= 0xff;
        fs::write(&path, bytes).unwrap();

        assert!(matches!(
            Store::open(dir.path()),
            Err(StorageError::Corrupt { .. })
        ));
    }
}

//! Behavior shared by every lock store backend.
//!
//! Each contract function is run against the memory, file and SQLite stores.

use super::*;
use crate::record::ReleaseReason;
use chrono::{Duration, TimeZone};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use tempfile::TempDir;

fn at(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_700_000_000_000 + millis).unwrap()
}

fn locked(resource: &str, holder: &str, start: i64, lease: i64) -> LockRecord {
    LockRecord::locked(resource, holder, at(start), lease)
}

fn check_insert_if_absent(store: &dyn LockStore) {
    let first = locked("job-1", "node-a", 0, 1000);
    let second = locked("job-1", "node-b", 10, 1000);

    assert!(store.insert_if_absent(&first).unwrap());
    assert!(!store.insert_if_absent(&second).unwrap());
    assert_eq!(store.get("job-1").unwrap(), Some(first));
}

fn check_get_missing(store: &dyn LockStore) {
    assert_eq!(store.get("nothing-here").unwrap(), None);
}

fn check_compare_and_update_exact_match(store: &dyn LockStore) {
    let original = locked("job-1", "node-a", 0, 1000);
    store.insert_if_absent(&original).unwrap();

    let released = original.released(ReleaseReason::Normal, at(500));
    assert!(store.compare_and_update("job-1", &original, &released).unwrap());
    assert_eq!(store.get("job-1").unwrap(), Some(released.clone()));

    // The prior state no longer matches.
    let again = original.released(ReleaseReason::SystemShutdown, at(600));
    assert!(!store.compare_and_update("job-1", &original, &again).unwrap());
    assert_eq!(store.get("job-1").unwrap(), Some(released));
}

fn check_compare_and_update_rejects_stale_lease(store: &dyn LockStore) {
    let old = locked("job-1", "node-a", 0, 1000);
    store.insert_if_absent(&old).unwrap();

    // Another instance already replaced the expired lease.
    let winner = locked("job-1", "node-b", 2000, 1000);
    assert!(store.compare_and_update("job-1", &old, &winner).unwrap());

    // A late writer that read the same expired lease must lose.
    let loser = locked("job-1", "node-c", 2001, 1000);
    assert!(!store.compare_and_update("job-1", &old, &loser).unwrap());
    assert_eq!(store.get("job-1").unwrap().unwrap().holder, "node-b");
}

fn check_compare_and_update_missing(store: &dyn LockStore) {
    let ghost = locked("ghost", "node-a", 0, 1000);
    let replacement = locked("ghost", "node-b", 0, 1000);

    assert!(!store.compare_and_update("ghost", &ghost, &replacement).unwrap());
    assert_eq!(store.get("ghost").unwrap(), None);
}

fn check_conditional_delete(store: &dyn LockStore) {
    let active = locked("active", "node-a", 0, 10_000);
    let expired = locked("expired", "node-a", 0, 100);
    let released = locked("released", "node-a", 0, 10_000).released(ReleaseReason::Normal, at(50));
    for record in [&active, &expired, &released] {
        store.insert_if_absent(record).unwrap();
    }

    let reclaimable = DeleteCondition::Reclaimable { now: at(1000) };
    assert_eq!(store.conditional_delete("active", &reclaimable).unwrap(), 0);
    assert_eq!(store.conditional_delete("expired", &reclaimable).unwrap(), 1);
    assert_eq!(store.conditional_delete("missing", &reclaimable).unwrap(), 0);

    let old_release = DeleteCondition::Released {
        updated_before: at(10),
    };
    assert_eq!(store.conditional_delete("released", &old_release).unwrap(), 0);
    let recent_release = DeleteCondition::Released {
        updated_before: at(51),
    };
    assert_eq!(store.conditional_delete("released", &recent_release).unwrap(), 1);

    let remaining: Vec<String> = store.list().unwrap().into_iter().map(|r| r.resource).collect();
    assert_eq!(remaining, vec!["active".to_string()]);
}

fn check_query_expired_before(store: &dyn LockStore) {
    store.insert_if_absent(&locked("late", "node-a", 0, 300)).unwrap();
    store.insert_if_absent(&locked("early", "node-a", 0, 100)).unwrap();
    store.insert_if_absent(&locked("fresh", "node-a", 0, 5000)).unwrap();
    let released = locked("done", "node-a", 0, 50).released(ReleaseReason::Normal, at(10));
    store.insert_if_absent(&released).unwrap();

    let expired = store.query_expired_before(at(1000), LockStatus::Locked).unwrap();
    let names: Vec<&str> = expired.iter().map(|r| r.resource.as_str()).collect();
    assert_eq!(names, vec!["early", "late"]);

    let released_only = store
        .query_expired_before(at(1000), LockStatus::Released)
        .unwrap();
    assert_eq!(released_only.len(), 1);
    assert_eq!(released_only[0].resource, "done");

    // Strictly before the cutoff.
    let none = store.query_expired_before(at(100), LockStatus::Locked).unwrap();
    assert!(none.is_empty());
}

fn check_list_ordered(store: &dyn LockStore) {
    for name in ["charlie", "alpha", "bravo"] {
        store.insert_if_absent(&locked(name, "node-a", 0, 1000)).unwrap();
    }

    let names: Vec<String> = store.list().unwrap().into_iter().map(|r| r.resource).collect();
    assert_eq!(names, vec!["alpha", "bravo", "charlie"]);
}

fn check_round_trip_preserves_record(store: &dyn LockStore) {
    let now = at(123) + Duration::microseconds(456);
    let record = LockRecord::locked("billing/nightly:export", "user@host", now, 86_400_000)
        .released(ReleaseReason::ErrorDuringProcess, now + Duration::seconds(3));
    store.insert_if_absent(&record).unwrap();

    assert_eq!(store.get("billing/nightly:export").unwrap(), Some(record));
}

fn check_long_resource_name(store: &dyn LockStore) {
    let resource = "orders/".repeat(43);
    assert!(resource.len() > 300);
    let sibling = format!("{}x", resource);

    let record = locked(&resource, "node-a", 0, 1000);
    assert!(store.insert_if_absent(&record).unwrap());
    assert!(store.insert_if_absent(&locked(&sibling, "node-b", 0, 1000)).unwrap());
    assert_eq!(store.get(&resource).unwrap(), Some(record.clone()));

    let released = record.released(ReleaseReason::Normal, at(10));
    assert!(store.compare_and_update(&resource, &record, &released).unwrap());
    assert_eq!(store.get(&resource).unwrap(), Some(released));
    assert_eq!(store.list().unwrap().len(), 2);
}

fn check_concurrent_insert_single_winner(store: Arc<dyn LockStore>) {
    let wins = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            let wins = Arc::clone(&wins);
            thread::spawn(move || {
                let record = locked("contended", &format!("node-{}", i), i, 1000);
                if store.insert_if_absent(&record).unwrap() {
                    wins.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(wins.load(Ordering::SeqCst), 1);
}

fn check_concurrent_cas_single_winner(store: Arc<dyn LockStore>) {
    let expired = locked("contended", "node-old", 0, 10);
    store.insert_if_absent(&expired).unwrap();

    let wins = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            let wins = Arc::clone(&wins);
            let expected = expired.clone();
            thread::spawn(move || {
                let record = locked("contended", &format!("node-{}", i), 100 + i, 1000);
                if store.compare_and_update("contended", &expected, &record).unwrap() {
                    wins.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(wins.load(Ordering::SeqCst), 1);
}

macro_rules! store_contract_tests {
    ($module:ident, $make:expr) => {
        mod $module {
            use super::*;

            #[test]
            fn insert_if_absent() {
                let (_guard, store) = $make;
                check_insert_if_absent(&*store);
            }

            #[test]
            fn get_missing() {
                let (_guard, store) = $make;
                check_get_missing(&*store);
            }

            #[test]
            fn compare_and_update_exact_match() {
                let (_guard, store) = $make;
                check_compare_and_update_exact_match(&*store);
            }

            #[test]
            fn compare_and_update_rejects_stale_lease() {
                let (_guard, store) = $make;
                check_compare_and_update_rejects_stale_lease(&*store);
            }

            #[test]
            fn compare_and_update_missing() {
                let (_guard, store) = $make;
                check_compare_and_update_missing(&*store);
            }

            #[test]
            fn conditional_delete() {
                let (_guard, store) = $make;
                check_conditional_delete(&*store);
            }

            #[test]
            fn query_expired_before() {
                let (_guard, store) = $make;
                check_query_expired_before(&*store);
            }

            #[test]
            fn list_ordered() {
                let (_guard, store) = $make;
                check_list_ordered(&*store);
            }

            #[test]
            fn round_trip_preserves_record() {
                let (_guard, store) = $make;
                check_round_trip_preserves_record(&*store);
            }

            #[test]
            fn long_resource_name() {
                let (_guard, store) = $make;
                check_long_resource_name(&*store);
            }

            #[test]
            fn concurrent_insert_single_winner() {
                let (_guard, store) = $make;
                check_concurrent_insert_single_winner(store);
            }

            #[test]
            fn concurrent_cas_single_winner() {
                let (_guard, store) = $make;
                check_concurrent_cas_single_winner(store);
            }
        }
    };
}

fn memory_store() -> (Option<TempDir>, Arc<dyn LockStore>) {
    (None, Arc::new(MemoryLockStore::new()))
}

fn file_store() -> (Option<TempDir>, Arc<dyn LockStore>) {
    let temp_dir = TempDir::new().unwrap();
    let store = FileLockStore::open(temp_dir.path().join("locks")).unwrap();
    (Some(temp_dir), Arc::new(store))
}

fn sqlite_store() -> (Option<TempDir>, Arc<dyn LockStore>) {
    let temp_dir = TempDir::new().unwrap();
    let store = SqliteLockStore::open(temp_dir.path().join("locks.db")).unwrap();
    (Some(temp_dir), Arc::new(store))
}

store_contract_tests!(memory, memory_store());
store_contract_tests!(file, file_store());
store_contract_tests!(sqlite, sqlite_store());

#[test]
fn test_file_stem_bounded_for_long_names() {
    use super::file::{encode_resource, file_stem};

    assert_eq!(file_stem("job-1"), "job-1");

    let long = "orders/".repeat(43);
    let stem = file_stem(&long);
    assert!(stem.len() <= 200);
    assert!(stem.starts_with(&encode_resource(&long)[..64]));
    assert_ne!(stem, file_stem(&format!("{}x", long)));
    assert_eq!(stem, file_stem(&long));
}

#[test]
fn test_file_store_encodes_resource_names() {
    use super::file::encode_resource;

    assert_eq!(encode_resource("job-1"), "job-1");
    assert_eq!(encode_resource("a/b"), "a%2Fb");
    assert_eq!(encode_resource(".hidden"), "%2Ehidden");
    assert_eq!(encode_resource("v1.2"), "v1.2");
    assert_ne!(encode_resource("a b"), encode_resource("a_b"));
}

#[test]
fn test_file_store_skips_corrupt_documents_in_list() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileLockStore::open(temp_dir.path()).unwrap();
    store.insert_if_absent(&locked("good", "node-a", 0, 1000)).unwrap();
    std::fs::write(temp_dir.path().join("bad.lock"), "not json").unwrap();

    let all = store.list().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].resource, "good");

    // A direct read of a corrupt document is a store fault, not "absent".
    assert!(matches!(store.get("bad"), Err(crate::error::LeaseError::StoreError(_))));
}

#[test]
fn test_sqlite_store_shared_between_connections() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("shared.db");
    let first = SqliteLockStore::open(&path).unwrap();
    let second = SqliteLockStore::open(&path).unwrap();

    assert!(first.insert_if_absent(&locked("job-1", "node-a", 0, 1000)).unwrap());
    assert!(!second.insert_if_absent(&locked("job-1", "node-b", 0, 1000)).unwrap());
    assert_eq!(second.get("job-1").unwrap().unwrap().holder, "node-a");
}

#[test]
fn test_sqlite_in_memory_store() {
    let store = SqliteLockStore::open_in_memory().unwrap();
    assert!(store.insert_if_absent(&locked("job-1", "node-a", 0, 1000)).unwrap());
    assert_eq!(store.backend_name(), "sqlite");
}

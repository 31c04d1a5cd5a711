//! Cross-process lock behavior under contention
//!
//! Threads stand in for processes: the lock is a marker file, so two threads
//! contend for it exactly as two processes would.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use blackbook_fs::lock::{LockGuard, LockPolicy, lock_path_for, with_lock_policy};
use blackbook_fs::{Error, io};
use tempfile::tempdir;

fn patient_policy() -> LockPolicy {
    LockPolicy {
        attempts: 200,
        backoff_step: Duration::from_millis(1),
        stale_after: Duration::from_secs(60),
    }
}

#[test]
fn locked_read_modify_write_loses_no_updates() {
    let dir = tempdir().unwrap();
    let counter = Arc::new(dir.path().join("counter.txt"));
    io::write_text(&counter, "0").unwrap();

    let threads = 8;
    let increments = 10;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let counter = Arc::clone(&counter);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..increments {
                    with_lock_policy(&counter, &patient_policy(), || -> Result<(), Error> {
                        let value: u32 = io::read_text(&counter)?.trim().parse().unwrap();
                        io::write_text(&counter, &(value + 1).to_string())
                    })
                    .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread should not panic");
    }

    let total: u32 = io::read_text(&counter).unwrap().trim().parse().unwrap();
    assert_eq!(total, (threads * increments) as u32);
    assert!(!lock_path_for(&counter).exists());
}

#[test]
fn held_lock_times_out_with_attempt_count() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("manifest.json");
    let _held = LockGuard::acquire(&path).unwrap();

    let policy = LockPolicy {
        attempts: 3,
        backoff_step: Duration::from_millis(5),
        stale_after: Duration::from_secs(60),
    };
    let started = Instant::now();
    let err = LockGuard::acquire_with(&path, &policy).unwrap_err();

    match err {
        Error::LockTimeout { path: p, attempts } => {
            assert_eq!(p, path);
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // Two linear delays: 5ms + 10ms
    assert!(started.elapsed() >= Duration::from_millis(15));
}

#[test]
fn stale_marker_is_reclaimed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(lock_path_for(&path), "{\"pid\":1,\"acquired_at_unix\":0}").unwrap();
    thread::sleep(Duration::from_millis(30));

    let policy = LockPolicy {
        attempts: 2,
        backoff_step: Duration::from_millis(1),
        stale_after: Duration::from_millis(10),
    };
    let guard = LockGuard::acquire_with(&path, &policy).unwrap();

    let holder = blackbook_fs::lock::read_holder(&path).unwrap();
    assert_eq!(holder.pid, std::process::id());
    drop(guard);
    assert!(!lock_path_for(&path).exists());
}

#[test]
fn contended_stale_marker_admits_one_holder_at_a_time() {
    let dir = tempdir().unwrap();
    let path = Arc::new(dir.path().join("manifest.json"));
    std::fs::write(lock_path_for(&path), "{\"pid\":1,\"acquired_at_unix\":0}").unwrap();
    thread::sleep(Duration::from_millis(300));

    let policy = LockPolicy {
        attempts: 400,
        backoff_step: Duration::from_millis(1),
        stale_after: Duration::from_millis(200),
    };
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let inside = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let path = Arc::clone(&path);
            let barrier = Arc::clone(&barrier);
            let inside = Arc::clone(&inside);
            let overlaps = Arc::clone(&overlaps);
            thread::spawn(move || {
                barrier.wait();
                let _guard = LockGuard::acquire_with(&path, &policy).unwrap();
                if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                    overlaps.fetch_add(1, Ordering::SeqCst);
                }
                thread::sleep(Duration::from_millis(2));
                inside.fetch_sub(1, Ordering::SeqCst);
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread should not panic");
    }

    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    assert!(!lock_path_for(&path).exists());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.contains(".stale."))
        .collect();
    assert!(leftovers.is_empty(), "leftover claims: {leftovers:?}");
}

#[test]
fn waiter_acquires_after_holder_releases() {
    let dir = tempdir().unwrap();
    let path = Arc::new(dir.path().join("shared.json"));
    let guard = LockGuard::acquire(&path).unwrap();

    let waiter = {
        let path = Arc::clone(&path);
        thread::spawn(move || LockGuard::acquire_with(&path, &patient_policy()).map(|_| ()))
    };

    thread::sleep(Duration::from_millis(20));
    drop(guard);

    waiter.join().unwrap().unwrap();
}

//! Lazy creation of the process-wide engine from `PERSISTCACHE_DB`

use std::env;
use std::sync::{Arc, Barrier};
use std::thread;

use persistcache::cache;
use persistcache::config::DATABASE_ENV;
use tempfile::TempDir;

#[test]
fn test_concurrent_first_access_creates_one_engine() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("lazy.db");
    env::set_var(DATABASE_ENV, &path);

    let barrier = Arc::new(Barrier::new(16));
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache::global()
            })
        })
        .collect();

    let engines: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("Thread should not panic"))
        .collect();

    assert!(engines.iter().all(|engine| Arc::ptr_eq(engine, &engines[0])));
    assert!(path.exists(), "Engine should open the configured file");
}

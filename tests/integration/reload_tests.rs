//! Hot-reload behavior against real file replacement.
//!
//! The reload task polls mtime once per second, so these tests poll the
//! store with a generous deadline instead of sleeping a fixed amount.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mbtilesrv::store::TileStore;

use super::test_utils::{default_metadata, ArchiveFixture};

const DEADLINE: Duration = Duration::from_secs(5);

async fn wait_for_tile(store: &TileStore, z: u32, x: u32, y: u32, want: &[u8]) -> bool {
    let start = Instant::now();
    while start.elapsed() < DEADLINE {
        if let Ok(blob) = store.get_tile(z, x, y) {
            if blob == want {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_replaced_archive_is_picked_up() {
    let fixture = ArchiveFixture::new(&default_metadata());
    fixture.insert_tile(0, 0, 0, b"old-tile");

    let store = TileStore::open(fixture.path()).unwrap();
    store.set_auto_reload(true);
    assert_eq!(store.get_tile(0, 0, 0).unwrap(), b"old-tile");

    // New file lands atomically via rename, mtime changes.
    fixture.replace_with_tiles(
        &[("name", "Updated World"), ("maxzoom", "1")],
        &[(0, 0, 0, b"new-tile")],
    );

    assert!(
        wait_for_tile(&store, 0, 0, 0, b"new-tile").await,
        "store never served the replaced archive"
    );
    assert_eq!(store.metadata().unwrap().name, "Updated World");

    store.close();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_straddling_readers_see_whole_generations_only() {
    // Two archive generations whose contents must never mix: a read that
    // lands on either side of a swap is fine, a read that sees pieces of
    // both is a torn snapshot.
    let gen_a: &[(&str, &str)] = &[("name", "Gen A"), ("version", "a.1"), ("maxzoom", "1")];
    let gen_b: &[(&str, &str)] = &[("name", "Gen B"), ("version", "b.1"), ("maxzoom", "2")];

    let fixture = ArchiveFixture::new(gen_a);
    fixture.insert_tile(0, 0, 0, b"tile-gen-a");

    let store = Arc::new(TileStore::open(fixture.path()).unwrap());
    store.set_auto_reload(true);

    let stop = Arc::new(AtomicBool::new(false));
    let saw_new_generation = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let stop = Arc::clone(&stop);
            let saw_new_generation = Arc::clone(&saw_new_generation);
            std::thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    let tile = store.get_tile(0, 0, 0).unwrap();
                    assert!(
                        tile == b"tile-gen-a" || tile == b"tile-gen-b",
                        "torn tile read: {tile:?}"
                    );

                    let md = store.metadata().unwrap();
                    match md.name.as_str() {
                        "Gen A" => {
                            assert_eq!(md.version, "a.1", "torn metadata");
                            assert_eq!(md.max_zoom, 1, "torn metadata");
                        }
                        "Gen B" => {
                            assert_eq!(md.version, "b.1", "torn metadata");
                            assert_eq!(md.max_zoom, 2, "torn metadata");
                            saw_new_generation.store(true, Ordering::Relaxed);
                        }
                        other => panic!("metadata from no known generation: {other:?}"),
                    }
                }
            })
        })
        .collect();

    // Swap back and forth while the readers hammer the store; each
    // pause spans at least one reload tick.
    for round in 0..3u32 {
        tokio::time::sleep(Duration::from_millis(1300)).await;
        if round % 2 == 0 {
            fixture.replace_with_tiles(gen_b, &[(0, 0, 0, b"tile-gen-b")]);
        } else {
            fixture.replace_with_tiles(gen_a, &[(0, 0, 0, b"tile-gen-a")]);
        }
    }
    tokio::time::sleep(Duration::from_millis(1500)).await;

    stop.store(true, Ordering::Relaxed);
    for reader in readers {
        reader.join().expect("reader observed a torn snapshot");
    }
    assert!(
        saw_new_generation.load(Ordering::Relaxed),
        "no reader ever observed a swapped-in generation"
    );

    store.close();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reload_disabled_keeps_original_snapshot() {
    let fixture = ArchiveFixture::new(&default_metadata());
    fixture.insert_tile(0, 0, 0, b"original");

    let store = TileStore::open(fixture.path()).unwrap();
    // Auto-reload never enabled for this store.

    fixture.replace_with_tiles(&default_metadata(), &[(0, 0, 0, b"replacement")]);

    // Give a would-be reload task ample time to (not) fire.
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(store.get_tile(0, 0, 0).unwrap(), b"original");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_deleting_file_after_disabling_reload_keeps_reads_working() {
    let fixture = ArchiveFixture::new(&default_metadata());
    fixture.insert_tile(0, 0, 0, b"resident");

    let store = TileStore::open(fixture.path()).unwrap();
    store.set_auto_reload(true);
    store.set_auto_reload(false);

    // The open connection keeps the data reachable after the unlink.
    std::fs::remove_file(fixture.path()).unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(store.get_tile(0, 0, 0).unwrap(), b"resident");
    assert_eq!(store.metadata().unwrap().name, "Fixture World");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_broken_replacement_keeps_serving_old_snapshot() {
    let fixture = ArchiveFixture::new(&default_metadata());
    fixture.insert_tile(0, 0, 0, b"good");

    let store = TileStore::open(fixture.path()).unwrap();
    store.set_auto_reload(true);

    // Overwrite with a file that is not a valid archive at all.
    std::fs::write(fixture.path(), b"garbage, not sqlite").unwrap();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(
        store.get_tile(0, 0, 0).unwrap(),
        b"good",
        "a failed reload must not disturb the current snapshot"
    );

    store.close();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_toggle_is_idempotent_and_close_stops_the_task() {
    let fixture = ArchiveFixture::new(&default_metadata());
    fixture.insert_tile(0, 0, 0, b"t");

    let store = TileStore::open(fixture.path()).unwrap();
    store.set_auto_reload(true);
    store.set_auto_reload(true);
    store.set_auto_reload(false);
    store.set_auto_reload(false);
    store.set_auto_reload(true);

    store.close();
    assert!(store.get_tile(0, 0, 0).is_err());

    // Replacing the file after close must not resurrect the snapshot.
    fixture.replace_with_tiles(&default_metadata(), &[(0, 0, 0, b"late")]);
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(store.get_tile(0, 0, 0).is_err());
}

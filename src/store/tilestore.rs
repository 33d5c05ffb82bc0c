//! TileStore: the concurrent, hot-reloadable archive handle.
//!
//! The store owns the current [`Snapshot`] behind a single mutex and
//! exposes the three read operations plus an optional auto-reload task.
//! The lock is held only for the duration of one database round trip
//! (or, during a reload, for the final swap-and-dispose); building a
//! replacement snapshot happens outside the lock so a slow reopen never
//! stalls concurrent readers.
//!
//! # Hot reload
//!
//! When auto-reload is enabled, a background task wakes once per second,
//! stats the backing file, and — if the modification time changed —
//! opens a brand-new snapshot at the same path. On success the new
//! snapshot is swapped in under the lock and the old one is disposed;
//! on failure the attempt is logged and the existing snapshot keeps
//! serving traffic. Readers that straddle a swap see either the old or
//! the new snapshot in full, never a mixture.

use std::mem;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::StoreError;

use super::grid::assemble_grid;
use super::metadata::Metadata;
use super::snapshot::Snapshot;

/// How often the auto-reload task checks the archive for replacement.
pub const RELOAD_INTERVAL: Duration = Duration::from_secs(1);

// =============================================================================
// Shared state
// =============================================================================

#[derive(Debug)]
struct State {
    /// Current snapshot; `None` once the store has been closed.
    snapshot: Option<Snapshot>,

    /// Modification time of the file the current snapshot came from.
    mtime: SystemTime,
}

#[derive(Debug)]
struct Shared {
    path: PathBuf,
    state: Mutex<State>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
struct ReloadTask {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

// =============================================================================
// TileStore
// =============================================================================

/// Read-only access to an MBTiles archive for concurrent callers.
///
/// All read operations are synchronous point lookups; async callers
/// should dispatch them via `tokio::task::spawn_blocking` (the HTTP
/// handlers do). [`TileStore::set_auto_reload`] must be called from
/// within a Tokio runtime.
#[derive(Debug)]
pub struct TileStore {
    shared: Arc<Shared>,
    reload: Mutex<Option<ReloadTask>>,
}

impl TileStore {
    /// Open the archive at `path`, building the initial snapshot.
    ///
    /// Fails exactly when the snapshot build fails: missing file,
    /// unopenable database, unreadable metadata, or missing schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mtime = file_mtime(&path)?;
        let snapshot = Snapshot::open(&path)?;

        Ok(Self {
            shared: Arc::new(Shared {
                path,
                state: Mutex::new(State {
                    snapshot: Some(snapshot),
                    mtime,
                }),
            }),
            reload: Mutex::new(None),
        })
    }

    /// Path of the backing archive.
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Fetch the raw tile blob for a TMS key.
    ///
    /// This is the hot path: one lock acquisition, one point query, no
    /// transformation of the blob.
    ///
    /// # Errors
    ///
    /// [`StoreError::TileNotFound`] if no row matches; [`StoreError::Io`]
    /// on query failure; [`StoreError::Closed`] after [`TileStore::close`].
    pub fn get_tile(&self, z: u32, x: u32, y: u32) -> Result<Vec<u8>, StoreError> {
        let state = self.shared.lock();
        let snapshot = state.snapshot.as_ref().ok_or(StoreError::Closed)?;
        snapshot.tile(z, x, y)?.ok_or(StoreError::TileNotFound)
    }

    /// Fetch and assemble the grid document for a TMS key.
    ///
    /// Decompresses the stored blob, merges the tile's `grid_data` rows
    /// into a `data` object in row-return order, and serializes. A
    /// non-empty `callback` wraps the result as a JSONP invocation.
    ///
    /// # Errors
    ///
    /// [`StoreError::TileNotFound`] if the `grids` relation has no row;
    /// [`StoreError::Decode`] on a corrupt blob or malformed JSON. Either
    /// failure leaves the store fully usable for other keys.
    pub fn get_grid_data(
        &self,
        z: u32,
        x: u32,
        y: u32,
        callback: Option<&str>,
    ) -> Result<Vec<u8>, StoreError> {
        // Copy the blob and rows out under the lock; decompression and
        // merging work on the copies.
        let (blob, rows) = {
            let state = self.shared.lock();
            let snapshot = state.snapshot.as_ref().ok_or(StoreError::Closed)?;
            let blob = snapshot.grid(z, x, y)?.ok_or(StoreError::TileNotFound)?;
            let rows = snapshot.grid_data(z, x, y)?;
            (blob, rows)
        };

        assemble_grid(&blob, &rows, callback)
    }

    /// The current snapshot's parsed metadata.
    ///
    /// The metadata itself is immutable; the lock only protects taking
    /// the reference against a concurrent reload swap.
    pub fn metadata(&self) -> Result<Metadata, StoreError> {
        let state = self.shared.lock();
        let snapshot = state.snapshot.as_ref().ok_or(StoreError::Closed)?;
        Ok(snapshot.metadata().clone())
    }

    /// Enable or disable the background freshness check. Idempotent.
    ///
    /// Enabling starts exactly one task (no-op if already running) that
    /// wakes once per second and rebuilds the snapshot when
    /// the backing file's modification time changes. Disabling signals
    /// the task to stop and aborts it; after this returns the task makes
    /// no further store accesses.
    pub fn set_auto_reload(&self, enabled: bool) {
        let mut reload = self.reload.lock().unwrap_or_else(PoisonError::into_inner);

        if !enabled {
            if let Some(task) = reload.take() {
                let _ = task.stop.send(true);
                task.handle.abort();
            }
            return;
        }

        if reload.is_some() {
            return;
        }

        let (stop, stop_rx) = watch::channel(false);
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(reload_loop(shared, stop_rx));
        *reload = Some(ReloadTask { stop, handle });
    }

    /// Stop the reload task and release the current snapshot.
    ///
    /// Safe to call while requests are in flight; subsequent operations
    /// return [`StoreError::Closed`] instead of panicking.
    pub fn close(&self) {
        self.set_auto_reload(false);
        let snapshot = self.shared.lock().snapshot.take();
        drop(snapshot);
    }
}

impl Drop for TileStore {
    fn drop(&mut self) {
        // Make sure a forgotten store does not leave its reload task
        // holding the shared state alive forever.
        self.set_auto_reload(false);
    }
}

// =============================================================================
// Reload task
// =============================================================================

async fn reload_loop(shared: Arc<Shared>, mut stop: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(RELOAD_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // Consume the immediate first tick so the first check happens one
    // interval after enabling.
    ticker.tick().await;

    loop {
        tokio::select! {
            // A send or a dropped sender both mean shutdown.
            _ = stop.changed() => return,
            _ = ticker.tick() => check_once(&shared).await,
        }
    }
}

/// One freshness check: stat, compare, rebuild outside the lock, swap.
///
/// A failed attempt is logged and retried on the next tick; the current
/// snapshot keeps serving either way.
async fn check_once(shared: &Arc<Shared>) {
    let mtime = match file_mtime(&shared.path) {
        Ok(mtime) => mtime,
        // File may be missing mid-replace; try again next tick.
        Err(err) => {
            debug!(path = %shared.path.display(), error = %err, "reload stat failed");
            return;
        }
    };

    {
        let state = shared.lock();
        // The closed check must come before anything else so a racing
        // `close` never resurrects a snapshot.
        if state.snapshot.is_none() || state.mtime == mtime {
            return;
        }
    }

    let path = shared.path.clone();
    match tokio::task::spawn_blocking(move || Snapshot::open(&path)).await {
        Ok(Ok(snapshot)) => {
            let swapped = {
                let mut state = shared.lock();
                if state.snapshot.is_none() {
                    // Closed while we were reopening; discard the new one.
                    false
                } else {
                    let old = mem::replace(&mut state.snapshot, Some(snapshot));
                    state.mtime = mtime;
                    drop(old);
                    true
                }
            };
            if swapped {
                info!(path = %shared.path.display(), "archive reloaded");
            }
        }
        Ok(Err(err)) => {
            warn!(
                path = %shared.path.display(),
                error = %err,
                "reload failed, keeping current snapshot"
            );
        }
        Err(err) => {
            warn!(error = %err, "reload worker panicked");
        }
    }
}

fn file_mtime(path: &Path) -> Result<SystemTime, StoreError> {
    let meta = std::fs::metadata(path)
        .map_err(|err| StoreError::Io(format!("{}: {}", path.display(), err)))?;
    meta.modified()
        .map_err(|err| StoreError::Io(err.to_string()))
}

// =============================================================================
// Tests
// =============================================================================

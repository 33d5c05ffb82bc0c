//! MBTiles storage-access layer.
//!
//! This module is the core of the crate: read-only, concurrency-safe
//! access to one MBTiles archive with transparent hot reload.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        TileStore                          │
//! │   get_tile / get_grid_data / metadata    reload task      │
//! │                │                             │            │
//! │                ▼        (one mutex)          ▼            │
//! │   ┌──────────────────────────┐    swap on mtime change    │
//! │   │         Snapshot         │◀───────────────────────    │
//! │   │  connection + queries +  │                            │
//! │   │     parsed Metadata      │                            │
//! │   └──────────────────────────┘                            │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! - `Snapshot` (internal): one fully-initialized version of the
//!   archive (connection, validated lookup queries, parsed metadata)
//! - [`TileStore`]: owns the current snapshot behind a mutex, runs the
//!   optional auto-reload task
//! - [`Metadata`]: strongly-typed view of the `metadata` table with
//!   per-field error collection
//! - grid assembly (decompress + merge + optional JSONP wrap) lives in
//!   the private `grid` submodule, reached through
//!   [`TileStore::get_grid_data`]

mod grid;
mod metadata;
mod snapshot;
mod tilestore;

pub use metadata::{Bounds, Center, Metadata};
pub use tilestore::TileStore;

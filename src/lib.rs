//! # mbtilesrv
//!
//! A read-only HTTP server for [MBTiles](https://github.com/mapbox/mbtiles-spec)
//! tile archives: raster tiles, UTFGrid interactivity data, and TileJSON,
//! straight out of a single SQLite file.
//!
//! ## Features
//!
//! - Point lookups against prepared, validated queries
//! - Transparent hot reload when the archive file changes on disk
//! - UTFGrid assembly (zlib decompress + grid_data merge) with JSONP support
//! - Lenient metadata parsing that collects per-field errors instead of
//!   failing the whole archive
//! - TMS/XYZ row conversion at the HTTP boundary
//!
//! ## Architecture
//!
//! ```text
//! HTTP request -> Router -> Handler -> TileStore -> Snapshot -> SQLite
//!                                          ^
//!                                   reload task (swaps snapshots)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mbtilesrv::server::{create_router, RouterConfig};
//! use mbtilesrv::store::TileStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(TileStore::open("world.mbtiles")?);
//! store.set_auto_reload(true);
//!
//! let app = create_router(store, RouterConfig::default());
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:10998").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod server;
pub mod store;

pub use config::Config;
pub use error::StoreError;
pub use store::{Metadata, TileStore};

//! HTTP server layer.
//!
//! Exposes the tile store over HTTP: tile and grid endpoints (with the
//! north-origin to south-origin row flip at the boundary), the TileJSON
//! and metadata documents, and a health check. The store itself knows
//! nothing about HTTP; everything web-shaped lives here.

pub mod handlers;
pub mod routes;
pub mod tilejson;

pub use handlers::AppState;
pub use routes::{create_router, RouterConfig};
pub use tilejson::TileJson;

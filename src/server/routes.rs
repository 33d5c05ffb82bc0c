//! HTTP route configuration.
//!
//! Defines the API routes and middleware stack for the tile server.

use std::sync::Arc;

use axum::{routing::get, Router};
use http::{header, HeaderValue, Method};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::store::TileStore;

use super::handlers::{
    grid_handler, health_handler, metadata_handler, tile_handler, tilejson_handler, AppState,
};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration options for the router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins. `None` allows any origin, which suits the
    /// common case of a public tile endpoint consumed by map widgets.
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds for tile and grid responses.
    pub cache_max_age: u32,

    /// Whether to enable request tracing middleware.
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: 3600,
            enable_tracing: true,
        }
    }
}

impl RouterConfig {
    /// Create a new router configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict CORS to the given origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Set the Cache-Control max-age for tile and grid responses.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Enable or disable request tracing middleware.
    pub fn with_tracing(mut self, enable: bool) -> Self {
        self.enable_tracing = enable;
        self
    }
}

// =============================================================================
// Router Construction
// =============================================================================

/// Create the application router serving one tile store.
///
/// # Routes
///
/// - `GET /health` - Health check
/// - `GET /tiles/{z}/{x}/{filename}` - Tile images
/// - `GET /grids/{z}/{x}/{filename}` - UTFGrid data
/// - `GET /tilejson.json` - TileJSON document
/// - `GET /metadata.json` - Parsed archive metadata
pub fn create_router(store: Arc<TileStore>, config: RouterConfig) -> Router {
    let state = AppState::new(store, config.cache_max_age);

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/tiles/{z}/{x}/{filename}", get(tile_handler))
        .route("/grids/{z}/{x}/{filename}", get(grid_handler))
        .route("/tilejson.json", get(tilejson_handler))
        .route("/metadata.json", get(metadata_handler))
        .with_state(state)
        .layer(build_cors_layer(config.cors_origins.as_deref()));

    if config.enable_tracing {
        router = router.layer(TraceLayer::new_for_http());
    }

    router
}

/// Build the CORS layer from the configured origins.
fn build_cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let allow_origin = match origins {
        None => AllowOrigin::any(),
        Some(origins) => {
            let parsed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = %origin, "ignoring unparseable CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(parsed)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::HEAD])
        .allow_headers([header::CONTENT_TYPE])
}

// =============================================================================
// Tests
// =============================================================================

//! HTTP request handlers for the MBTiles tile API.
//!
//! # Endpoints
//!
//! - `GET /tiles/{z}/{x}/{y}.png` - Serve a raster tile
//! - `GET /grids/{z}/{x}/{y}.json` - Serve assembled UTFGrid data (JSONP with `?callback=`)
//! - `GET /tilejson.json` - TileJSON document for the archive
//! - `GET /metadata.json` - Parsed metadata, including field parse errors
//! - `GET /health` - Health check endpoint
//!
//! Tile keys arrive in north-origin (slippy map / XYZ) convention and
//! are flipped to the south-origin (TMS) convention the archive uses
//! before reaching the store: `row = 2^zoom - 1 - y`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::StoreError;
use crate::store::TileStore;

use super::tilejson::TileJson;

/// Zoom levels past this cannot be addressed with 32-bit tile
/// coordinates and no real archive comes close.
pub const MAX_ZOOM: u32 = 30;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The tile store serving this archive.
    pub store: Arc<TileStore>,

    /// Cache-Control max-age in seconds for tile and grid responses.
    pub cache_max_age: u32,
}

impl AppState {
    /// Create a new application state around an open store.
    pub fn new(store: Arc<TileStore>, cache_max_age: u32) -> Self {
        Self {
            store,
            cache_max_age,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for tile and grid requests.
///
/// Extracted from `/tiles/{z}/{x}/{filename}` where filename is `{y}`
/// with an optional extension (`3`, `3.png`, `3.json`).
#[derive(Debug, Deserialize)]
pub struct TilePathParams {
    /// Zoom level.
    pub z: u32,

    /// Tile column (0-indexed from the west).
    pub x: u32,

    /// Tile row with optional extension, in north-origin convention.
    pub filename: String,
}

impl TilePathParams {
    /// Parse the Y coordinate from the filename, dropping any extension.
    pub fn y(&self) -> Result<u32, std::num::ParseIntError> {
        let y_str = self
            .filename
            .split_once('.')
            .map_or(self.filename.as_str(), |(y, _)| y);
        y_str.parse()
    }
}

/// Query parameters for grid and tilejson requests.
#[derive(Debug, Deserialize)]
pub struct JsonpQueryParams {
    /// JSONP callback name; empty or absent means plain JSON.
    #[serde(default)]
    pub callback: Option<String>,
}

impl JsonpQueryParams {
    fn callback(&self) -> Option<&str> {
        self.callback.as_deref().filter(|cb| !cb.is_empty())
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "bad_request")
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Errors a handler can produce, mapped onto HTTP responses.
///
/// `TileNotFound` is the expected miss case and maps to 404 (logged at
/// debug); every other store error is a 5xx (logged at error). Malformed
/// request parameters are the client's fault and map to 400.
#[derive(Debug)]
pub enum ApiError {
    /// Request parameters did not parse or were out of range.
    BadRequest(String),

    /// Error from the tile store.
    Store(StoreError),

    /// Handler-internal failure (e.g. a worker task died).
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, "bad_request", message.clone())
            }
            ApiError::Store(StoreError::TileNotFound) => (
                StatusCode::NOT_FOUND,
                "not_found",
                "tile does not exist".to_string(),
            ),
            ApiError::Store(err @ StoreError::Io(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                err.to_string(),
            ),
            ApiError::Store(err @ StoreError::Decode(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "decode_error",
                err.to_string(),
            ),
            ApiError::Store(StoreError::Closed) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_closed",
                "store is closed".to_string(),
            ),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                message.clone(),
            ),
        };

        // Misses are routine; anything 5xx is not.
        if status == StatusCode::NOT_FOUND {
            debug!(error_type = error_type, "tile not found");
        } else if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "request failed: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "bad request: {}",
                message
            );
        }

        (status, Json(ErrorResponse::new(error_type, message))).into_response()
    }
}

// =============================================================================
// Coordinate Conversion
// =============================================================================

/// Flip a north-origin (XYZ) row to the south-origin (TMS) row the
/// archive stores. `None` if the row is outside the zoom level's grid.
pub fn tms_row(z: u32, y: u32) -> Option<u32> {
    if z > MAX_ZOOM {
        return None;
    }
    let dim = 1u64 << z;
    let y = u64::from(y);
    if y >= dim {
        return None;
    }
    Some((dim - 1 - y) as u32)
}

fn parse_coords(params: &TilePathParams) -> Result<(u32, u32, u32), ApiError> {
    let y = params.y().map_err(|_| {
        ApiError::BadRequest(format!("invalid tile row: {:?}", params.filename))
    })?;
    let row = tms_row(params.z, y).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "tile {}/{}/{} is outside the zoom {} grid",
            params.z, params.x, y, params.z
        ))
    })?;
    Ok((params.z, params.x, row))
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle tile requests.
///
/// # Endpoint
///
/// `GET /tiles/{z}/{x}/{y}.png`
///
/// # Response
///
/// - `200 OK`: tile bytes with `Content-Type: image/png`
/// - `400 Bad Request`: malformed or out-of-range coordinates
/// - `404 Not Found`: no tile at this key
/// - `500 Internal Server Error`: query failure
pub async fn tile_handler(
    State(state): State<AppState>,
    Path(params): Path<TilePathParams>,
) -> Result<Response, ApiError> {
    let (z, x, row) = parse_coords(&params)?;

    let store = Arc::clone(&state.store);
    let blob = tokio::task::spawn_blocking(move || store.get_tile(z, x, row))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))??;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/png")
        .header(
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.cache_max_age),
        )
        .body(axum::body::Body::from(blob))
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    Ok(response)
}

/// Handle grid data requests.
///
/// # Endpoint
///
/// `GET /grids/{z}/{x}/{y}.json[?callback=fn]`
///
/// # Response
///
/// - `200 OK`: assembled grid JSON (`application/json`), or a JSONP
///   invocation (`application/javascript`) when `callback` is non-empty
/// - `404 Not Found`: no grid at this key
/// - `500 Internal Server Error`: corrupt blob or malformed JSON
pub async fn grid_handler(
    State(state): State<AppState>,
    Path(params): Path<TilePathParams>,
    Query(query): Query<JsonpQueryParams>,
) -> Result<Response, ApiError> {
    let (z, x, row) = parse_coords(&params)?;
    let callback = query.callback().map(str::to_string);

    let store = Arc::clone(&state.store);
    let is_jsonp = callback.is_some();
    let body = tokio::task::spawn_blocking(move || {
        store.get_grid_data(z, x, row, callback.as_deref())
    })
    .await
    .map_err(|err| ApiError::Internal(err.to_string()))??;

    let content_type = if is_jsonp {
        "application/javascript"
    } else {
        "application/json"
    };

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.cache_max_age),
        )
        .body(axum::body::Body::from(body))
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    Ok(response)
}

/// Handle TileJSON requests.
///
/// # Endpoint
///
/// `GET /tilejson.json[?callback=fn]`
///
/// Returns a TileJSON v1.0.0 document assembled from the archive
/// metadata, with `/tiles/...` and `/grids/...` URL templates.
pub async fn tilejson_handler(
    State(state): State<AppState>,
    Query(query): Query<JsonpQueryParams>,
) -> Result<Response, ApiError> {
    let metadata = state.store.metadata()?;
    let body = TileJson::from_metadata(&metadata)
        .to_body(query.callback())
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    let content_type = if query.callback().is_some() {
        "application/javascript"
    } else {
        "application/json"
    };

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .body(axum::body::Body::from(body))
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    Ok(response)
}

/// Handle metadata requests.
///
/// # Endpoint
///
/// `GET /metadata.json`
///
/// Returns the parsed metadata as JSON. Per-field parse failures appear
/// in an `errors` array of strings; they never fail the request.
pub async fn metadata_handler(
    State(state): State<AppState>,
) -> Result<Json<crate::store::Metadata>, ApiError> {
    Ok(Json(state.store.metadata()?))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================

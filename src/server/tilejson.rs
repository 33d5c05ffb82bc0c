//! TileJSON document generation.
//!
//! Builds a TileJSON v1.0.0 description of the served archive from its
//! parsed metadata, with URL templates pointing back at this server's
//! own tile and grid routes.

use serde::Serialize;

use crate::store::Metadata;

/// TileJSON v1.0.0 document for the served archive.
#[derive(Debug, Serialize)]
pub struct TileJson {
    /// TileJSON spec version, always "1.0.0".
    pub tilejson: &'static str,

    /// Tile set name from the archive metadata.
    pub name: String,

    /// Lowest zoom level with tiles.
    pub minzoom: i32,

    /// Highest zoom level with tiles.
    pub maxzoom: i32,

    /// Extent as [west, south, east, north].
    pub bounds: [f64; 4],

    /// Initial view. The first two components mirror the stored archive
    /// order (latitude first); see [`crate::store::Center`].
    pub center: [f64; 3],

    /// Tile URL templates, relative to this server.
    pub tiles: Vec<String>,

    /// Grid URL templates, relative to this server.
    pub grids: Vec<String>,

    /// Mustache template for interactivity popups.
    pub template: String,

    /// Legend markup.
    pub legend: String,
}

impl TileJson {
    /// Assemble a document from archive metadata.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            tilejson: "1.0.0",
            name: metadata.name.clone(),
            minzoom: metadata.min_zoom,
            maxzoom: metadata.max_zoom,
            bounds: [
                metadata.bounds.west,
                metadata.bounds.south,
                metadata.bounds.east,
                metadata.bounds.north,
            ],
            center: [metadata.center.lat, metadata.center.lon, metadata.center.zoom],
            tiles: vec!["/tiles/{z}/{x}/{y}.png".to_string()],
            grids: vec!["/grids/{z}/{x}/{y}.json".to_string()],
            template: metadata.template.clone(),
            legend: metadata.legend.clone(),
        }
    }

    /// Serialize to a response body, wrapped as JSONP when `callback`
    /// is a non-empty name.
    pub fn to_body(&self, callback: Option<&str>) -> Result<Vec<u8>, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(match callback {
            Some(callback) if !callback.is_empty() => {
                let mut out = Vec::with_capacity(callback.len() + json.len() + 3);
                out.extend_from_slice(callback.as_bytes());
                out.push(b'(');
                out.extend_from_slice(&json);
                out.extend_from_slice(b");");
                out
            }
            _ => json,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

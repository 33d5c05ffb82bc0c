//! MBTiles metadata parsing.
//!
//! The `metadata` table of an MBTiles archive is a loosely-typed bag of
//! `(name, value)` string pairs. This module turns it into a strongly
//! typed [`Metadata`] record without aborting on malformed individual
//! fields: each failed numeric component appends a [`FieldParseError`]
//! to [`Metadata::errors`] and leaves that component at its zero value,
//! and parsing always continues with the remaining rows.
//!
//! # Recognized names
//!
//! - `bounds` — four comma-separated floats assigned (west, south, east,
//!   north) in that literal order
//! - `center` — three comma-separated floats assigned (latitude,
//!   longitude, zoom). Yes, latitude first: that is the order the format
//!   has always used, even though most consumers treat the pair as
//!   (longitude, latitude). We decode it as stored; see the note on
//!   [`Center`].
//! - `minzoom`, `maxzoom` — single integers
//! - any other name — matched case-insensitively against the known
//!   string fields (`name`, `description`, `attribution`, `legend`,
//!   `template`, `version`); unknown names are silently dropped

use rusqlite::Connection;
use serde::{Serialize, Serializer};

use crate::error::{FieldParseError, StoreError};

// =============================================================================
// Types
// =============================================================================

/// Geographic extent of the tile set, in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Bounds {
    /// Western longitude.
    pub west: f64,

    /// Southern latitude.
    pub south: f64,

    /// Eastern longitude.
    pub east: f64,

    /// Northern latitude.
    pub north: f64,
}

/// Suggested initial view for the tile set.
///
/// The stored `center` value decodes as (latitude, longitude, zoom),
/// which is inverted relative to how TileJSON consumers read the pair.
/// This inversion exists in every known writer of the format, so we
/// preserve the decode order rather than "fixing" it silently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Center {
    /// Longitude (second stored component).
    pub lon: f64,

    /// Latitude (first stored component).
    pub lat: f64,

    /// Initial zoom level.
    pub zoom: f64,
}

/// Parsed contents of the `metadata` table.
///
/// Unrecognized names are dropped; malformed values for recognized names
/// are collected in [`Metadata::errors`] rather than failing the parse.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Metadata {
    /// Geographic extent (from `bounds`).
    pub bounds: Bounds,

    /// Suggested initial view (from `center`).
    pub center: Center,

    /// Lowest zoom level with tiles (from `minzoom`).
    pub min_zoom: i32,

    /// Highest zoom level with tiles (from `maxzoom`).
    pub max_zoom: i32,

    /// Human-readable tile set name.
    pub name: String,

    /// Free-form description.
    pub description: String,

    /// Attribution markup shown with the map.
    pub attribution: String,

    /// Legend markup.
    pub legend: String,

    /// Mustache template for interactivity popups.
    pub template: String,

    /// Tile set version string.
    pub version: String,

    /// Non-fatal per-field parse failures, in encounter order.
    #[serde(serialize_with = "errors_as_strings")]
    pub errors: Vec<FieldParseError>,
}

fn errors_as_strings<S: Serializer>(
    errors: &[FieldParseError],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(|e| e.to_string()))
}

// =============================================================================
// Parsing
// =============================================================================

impl Metadata {
    /// Read and parse the `metadata` table of an open archive.
    ///
    /// A failure to read the table itself (missing table, broken
    /// connection) is an error; malformed individual values are not.
    pub fn read(conn: &Connection) -> Result<Self, StoreError> {
        let mut stmt = conn.prepare("SELECT name, value FROM metadata")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut pairs = Vec::new();
        for row in rows {
            pairs.push(row?);
        }

        Ok(Self::from_rows(
            pairs.iter().map(|(n, v)| (n.as_str(), v.as_str())),
        ))
    }

    /// Parse a sequence of `(name, value)` pairs.
    ///
    /// Rows are processed in order; a duplicated name overwrites the
    /// field (last write wins), while parse errors accumulate across all
    /// occurrences. The parser never aborts early.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut md = Self::default();

        for (name, value) in rows {
            match name {
                "bounds" => {
                    let mut b = md.bounds;
                    fill_floats(
                        "bounds",
                        value,
                        &mut [&mut b.west, &mut b.south, &mut b.east, &mut b.north],
                        &mut md.errors,
                    );
                    md.bounds = b;
                }
                "center" => {
                    // Stored order is (lat, lon, zoom), not (lon, lat, zoom).
                    let mut c = md.center;
                    fill_floats(
                        "center",
                        value,
                        &mut [&mut c.lat, &mut c.lon, &mut c.zoom],
                        &mut md.errors,
                    );
                    md.center = c;
                }
                "minzoom" => fill_int("minzoom", value, &mut md.min_zoom, &mut md.errors),
                "maxzoom" => fill_int("maxzoom", value, &mut md.max_zoom, &mut md.errors),
                other => {
                    // The accepted key set is an explicit table so it is
                    // checkable at compile time.
                    let field = match other.to_ascii_lowercase().as_str() {
                        "name" => Some(&mut md.name),
                        "description" => Some(&mut md.description),
                        "attribution" => Some(&mut md.attribution),
                        "legend" => Some(&mut md.legend),
                        "template" => Some(&mut md.template),
                        "version" => Some(&mut md.version),
                        _ => None,
                    };
                    if let Some(field) = field {
                        *field = value.to_string();
                    }
                }
            }
        }

        md
    }
}

/// Assign comma-separated float components to `slots` in order.
///
/// Each component parses independently: a failure appends one error and
/// leaves that slot untouched, and the remaining components still parse.
/// A missing component (too few parts) is also one error per slot.
fn fill_floats(
    field: &'static str,
    value: &str,
    slots: &mut [&mut f64],
    errors: &mut Vec<FieldParseError>,
) {
    let mut parts = value.split(',');
    for slot in slots.iter_mut() {
        match parts.next() {
            Some(part) => match part.parse::<f64>() {
                Ok(v) => **slot = v,
                Err(err) => errors.push(FieldParseError {
                    field,
                    value: part.to_string(),
                    message: err.to_string(),
                }),
            },
            None => errors.push(FieldParseError {
                field,
                value: value.to_string(),
                message: "missing component".to_string(),
            }),
        }
    }
}

/// Assign a single integer value, appending one error on failure.
fn fill_int(field: &'static str, value: &str, slot: &mut i32, errors: &mut Vec<FieldParseError>) {
    match value.parse::<i32>() {
        Ok(v) => *slot = v,
        Err(err) => errors.push(FieldParseError {
            field,
            value: value.to_string(),
            message: err.to_string(),
        }),
    }
}

// =============================================================================
// Tests
// =============================================================================

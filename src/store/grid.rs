//! UTFGrid document assembly.
//!
//! A grid lookup yields two pieces: a zlib-compressed JSON document from
//! the `grids` relation (the grid index plus a `keys` array of opaque
//! identifiers) and zero or more `(key_name, key_json)` rows from the
//! `grid_data` relation for the same tile key. The assembled output is
//! the decompressed document with an added `data` object mapping each
//! key name to its JSON fragment.
//!
//! Row-return order is preserved in the `data` object (serde_json's
//! `preserve_order` feature), so the output is stable for a given data
//! set. Keys with no matching row are simply absent from `data`.

use std::io::Read;

use flate2::read::ZlibDecoder;
use serde_json::{Map, Value};

use crate::error::StoreError;

/// Decompress a grid blob, merge in its grid_data rows, and serialize.
///
/// With a non-empty `callback` the result is wrapped as a JSONP
/// invocation, exactly `callback + "(" + json + ");"`.
pub(crate) fn assemble_grid(
    blob: &[u8],
    rows: &[(String, String)],
    callback: Option<&str>,
) -> Result<Vec<u8>, StoreError> {
    let mut decoded = Vec::new();
    ZlibDecoder::new(blob)
        .read_to_end(&mut decoded)
        .map_err(|err| StoreError::Decode(format!("corrupt grid blob: {err}")))?;

    let mut doc: Map<String, Value> = serde_json::from_slice(&decoded)
        .map_err(|err| StoreError::Decode(format!("malformed grid document: {err}")))?;

    let mut data = Map::new();
    for (key_name, key_json) in rows {
        let fragment: Value = serde_json::from_str(key_json).map_err(|err| {
            StoreError::Decode(format!("malformed grid_data fragment for `{key_name}`: {err}"))
        })?;
        data.insert(key_name.clone(), fragment);
    }
    doc.insert("data".to_string(), Value::Object(data));

    let body = serde_json::to_vec(&doc)
        .map_err(|err| StoreError::Decode(format!("cannot serialize grid document: {err}")))?;

    Ok(match callback {
        Some(callback) if !callback.is_empty() => {
            let mut out = Vec::with_capacity(callback.len() + body.len() + 3);
            out.extend_from_slice(callback.as_bytes());
            out.push(b'(');
            out.extend_from_slice(&body);
            out.extend_from_slice(b");");
            out
        }
        _ => body,
    })
}

// =============================================================================
// Tests
// =============================================================================

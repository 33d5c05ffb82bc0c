use thiserror::Error;

/// Errors returned by the tile store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Requested tile or grid key has no row. Expected and frequent;
    /// the HTTP boundary maps this to 404.
    #[error("tile does not exist")]
    TileNotFound,

    /// File stat/open or query execution failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// Corrupt compressed payload or malformed JSON in a grid blob.
    #[error("decode error: {0}")]
    Decode(String),

    /// Operation issued after the store was closed.
    #[error("store is closed")]
    Closed,
}

impl StoreError {
    /// Whether this is the expected "no such tile" condition rather than
    /// a genuine failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::TileNotFound)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

/// A non-fatal failure parsing one metadata field.
///
/// These are accumulated in the metadata's error list instead of failing
/// the whole metadata parse; the affected field keeps its zero value.
#[derive(Debug, Clone, Error)]
#[error("metadata field `{field}`: cannot parse {value:?}: {message}")]
pub struct FieldParseError {
    /// The metadata row name the value came from (e.g. "bounds").
    pub field: &'static str,

    /// The component that failed to parse.
    pub value: String,

    /// What went wrong.
    pub message: String,
}

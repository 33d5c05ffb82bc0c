//! Snapshot of one version of an MBTiles archive.
//!
//! A [`Snapshot`] bundles one read-only SQLite connection, its three
//! validated lookup queries, and the parsed metadata for one version of
//! the backing file. Construction is all-or-nothing: if any step fails,
//! everything acquired so far is released (connection ownership makes
//! this RAII) and no partial snapshot is ever exposed. Once built, a
//! snapshot is never mutated; the store swaps whole snapshots instead.

use std::path::Path;

use rusqlite::{Connection, OpenFlags, OptionalExtension};

use crate::error::StoreError;

use super::metadata::Metadata;

const TILE_SQL: &str = "SELECT tile_data FROM tiles \
     WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3";

const GRID_SQL: &str = "SELECT grid FROM grids \
     WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3";

const GRID_DATA_SQL: &str = "SELECT key_name, key_json FROM grid_data \
     WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3";

/// An immutable, fully-initialized handle to one version of the archive.
#[derive(Debug)]
pub struct Snapshot {
    conn: Connection,
    metadata: Metadata,
}

impl Snapshot {
    /// Open the archive at `path` and validate it end to end.
    ///
    /// Steps, each checked: stat the file, open a read-only connection,
    /// parse the `metadata` table, and prepare the tile/grid/grid_data
    /// lookup queries (left in the connection's statement cache for the
    /// point lookups). A missing table or column fails the open.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        // Stat first so a missing or unreadable file reports as a plain
        // I/O failure instead of whatever SQLite says about it.
        std::fs::metadata(path)
            .map_err(|err| StoreError::Io(format!("{}: {}", path.display(), err)))?;

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let metadata = Metadata::read(&conn)?;

        conn.set_prepared_statement_cache_capacity(8);
        for sql in [TILE_SQL, GRID_SQL, GRID_DATA_SQL] {
            conn.prepare_cached(sql)?;
        }

        Ok(Self { conn, metadata })
    }

    /// The archive's parsed metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Look up a tile blob by TMS key. `None` means no matching row.
    pub fn tile(&self, z: u32, x: u32, y: u32) -> Result<Option<Vec<u8>>, StoreError> {
        let mut stmt = self.conn.prepare_cached(TILE_SQL)?;
        Ok(stmt.query_row((z, x, y), |row| row.get(0)).optional()?)
    }

    /// Look up a compressed grid blob by TMS key.
    pub fn grid(&self, z: u32, x: u32, y: u32) -> Result<Option<Vec<u8>>, StoreError> {
        let mut stmt = self.conn.prepare_cached(GRID_SQL)?;
        Ok(stmt.query_row((z, x, y), |row| row.get(0)).optional()?)
    }

    /// Fetch the `(key_name, key_json)` rows for a tile key, in
    /// row-return order.
    pub fn grid_data(&self, z: u32, x: u32, y: u32) -> Result<Vec<(String, String)>, StoreError> {
        let mut stmt = self.conn.prepare_cached(GRID_DATA_SQL)?;
        let rows = stmt.query_map((z, x, y), |row| Ok((row.get(0)?, row.get(1)?)))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

// =============================================================================
// Tests
// =============================================================================

//! v003: per-memory metadata row (keywords/tags as JSON arrays + btree
//! index on importance, per §6's data-store contract).

use rusqlite::Connection;

use cme_core::errors::CortexResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> CortexResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS memory_metadata (
            memory_id   TEXT PRIMARY KEY,
            keywords    TEXT NOT NULL DEFAULT '[]',
            tags        TEXT NOT NULL DEFAULT '[]',
            category    TEXT,
            context     TEXT NOT NULL DEFAULT '',
            importance  REAL NOT NULL DEFAULT 0.0,
            is_atomic   INTEGER NOT NULL DEFAULT 0,
            parent_id   TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_metadata_importance ON memory_metadata(importance);
        CREATE INDEX IF NOT EXISTS idx_metadata_category ON memory_metadata(category);
        CREATE INDEX IF NOT EXISTS idx_metadata_parent ON memory_metadata(parent_id);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

//! v001: memories table, schema_version bookkeeping.

use rusqlite::Connection;

use cme_core::errors::CortexResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> CortexResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS memories (
            id                 TEXT PRIMARY KEY,
            content            TEXT NOT NULL,
            user_id            TEXT NOT NULL,
            session_id         TEXT,
            primary_sector     TEXT NOT NULL,
            created_at         TEXT NOT NULL,
            last_accessed      TEXT NOT NULL,
            access_count       INTEGER NOT NULL DEFAULT 0,
            salience           REAL NOT NULL DEFAULT 0.5,
            strength           REAL NOT NULL DEFAULT 1.0,
            decay_rate         REAL NOT NULL DEFAULT 0.0,
            embedding_status   TEXT NOT NULL DEFAULT 'pending',
            consolidated_into  TEXT,
            consolidated_from  TEXT,
            content_hash       TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_memories_user ON memories(user_id);
        CREATE INDEX IF NOT EXISTS idx_memories_user_sector ON memories(user_id, primary_sector);
        CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at);
        CREATE INDEX IF NOT EXISTS idx_memories_consolidated_into ON memories(consolidated_into);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

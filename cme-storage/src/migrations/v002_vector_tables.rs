//! v002: one embedding vector per (memory_id, sector, namespace).

use rusqlite::Connection;

use cme_core::errors::CortexResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> CortexResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS memory_embeddings (
            memory_id  TEXT NOT NULL,
            sector     TEXT NOT NULL,
            namespace  TEXT NOT NULL,
            vector     BLOB NOT NULL,
            PRIMARY KEY (memory_id, sector, namespace)
        );

        CREATE INDEX IF NOT EXISTS idx_embeddings_sector_namespace
            ON memory_embeddings(sector, namespace);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

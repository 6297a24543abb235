//! v004: directed weighted graph edges + consolidation audit log.

use rusqlite::Connection;

use cme_core::errors::CortexResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> CortexResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS memory_links (
            source_id        TEXT NOT NULL,
            target_id        TEXT NOT NULL,
            link_type        TEXT NOT NULL,
            weight            REAL NOT NULL,
            created_at        TEXT NOT NULL,
            traversal_count   INTEGER NOT NULL DEFAULT 0,
            UNIQUE(source_id, target_id)
        );

        CREATE INDEX IF NOT EXISTS idx_links_source ON memory_links(source_id);
        CREATE INDEX IF NOT EXISTS idx_links_target ON memory_links(target_id);

        CREATE TABLE IF NOT EXISTS consolidation_history (
            id                       TEXT PRIMARY KEY,
            user_id                  TEXT NOT NULL,
            summary_memory_id        TEXT NOT NULL,
            consolidated_memory_ids  TEXT NOT NULL,
            similarity_threshold     REAL NOT NULL,
            cluster_size             INTEGER NOT NULL,
            consolidated_at          TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_consolidation_history_user
            ON consolidation_history(user_id);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

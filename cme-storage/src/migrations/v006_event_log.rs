//! v006: append-only mutation log backing `getTimeline`.

use rusqlite::Connection;

use cme_core::errors::CortexResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> CortexResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS memory_events (
            event_id     INTEGER PRIMARY KEY AUTOINCREMENT,
            memory_id    TEXT NOT NULL,
            user_id      TEXT NOT NULL,
            recorded_at  TEXT NOT NULL,
            event_type   TEXT NOT NULL,
            delta        TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_events_user_time ON memory_events(user_id, recorded_at);
        CREATE INDEX IF NOT EXISTS idx_events_memory ON memory_events(memory_id);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

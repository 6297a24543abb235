//! Aggregate reads backing `getStats`: per-sector counts, consolidation
//! backlog, and a recent-activity feed drawn from the event log.

use rusqlite::{params, Connection};

use cme_core::errors::CortexResult;

use crate::to_storage_err;

/// One row of the recent-activity feed: a memory id, when it last moved,
/// and what kind of event that was.
#[derive(Debug, Clone)]
pub struct RecentActivity {
    pub memory_id: String,
    pub recorded_at: String,
    pub event_type: String,
}

pub fn get_recent_activity(
    conn: &Connection,
    user_id: &str,
    limit: usize,
) -> CortexResult<Vec<RecentActivity>> {
    let mut stmt = conn
        .prepare(
            "SELECT memory_id, recorded_at, event_type FROM memory_events
             WHERE user_id = ?1 ORDER BY recorded_at DESC, event_id DESC LIMIT ?2",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows = stmt
        .query_map(params![user_id, limit as i64], |row| {
            Ok(RecentActivity {
                memory_id: row.get(0)?,
                recorded_at: row.get(1)?,
                event_type: row.get(2)?,
            })
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

pub fn total_memory_count(conn: &Connection, user_id: &str) -> CortexResult<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM memories WHERE user_id = ?1 AND strength > 0",
        params![user_id],
        |row| row.get::<_, i64>(0),
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

pub fn total_link_count(conn: &Connection, user_id: &str) -> CortexResult<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM memory_links l
         JOIN memories m ON m.id = l.source_id
         WHERE m.user_id = ?1",
        params![user_id],
        |row| row.get::<_, i64>(0),
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

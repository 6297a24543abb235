//! Append-only mutation log (`memory_events`) backing `getTimeline`.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use cme_core::errors::CortexResult;
use cme_core::memory::{MemoryEvent, MemoryEventType};

use crate::to_storage_err;

pub fn append_event(
    conn: &Connection,
    memory_id: &str,
    user_id: &str,
    recorded_at: DateTime<Utc>,
    event_type: MemoryEventType,
    delta: &serde_json::Value,
) -> CortexResult<()> {
    let delta_json = serde_json::to_string(delta).map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "INSERT INTO memory_events (memory_id, user_id, recorded_at, event_type, delta)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![memory_id, user_id, recorded_at.to_rfc3339(), event_type.as_str(), delta_json],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Chronological event log for one memory, oldest first.
pub fn get_timeline_for_memory(conn: &Connection, memory_id: &str) -> CortexResult<Vec<MemoryEvent>> {
    let mut stmt = conn
        .prepare(
            "SELECT event_id, memory_id, user_id, recorded_at, event_type, delta
             FROM memory_events WHERE memory_id = ?1 ORDER BY recorded_at ASC, event_id ASC",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    collect_events(&mut stmt, params![memory_id])
}

/// Chronological event log across every memory owned by `user_id`, within
/// an optional time window, newest first, capped at `limit`.
pub fn get_timeline_for_user(
    conn: &Connection,
    user_id: &str,
    since: Option<DateTime<Utc>>,
    limit: usize,
) -> CortexResult<Vec<MemoryEvent>> {
    let since_str = since.map(|dt| dt.to_rfc3339()).unwrap_or_default();
    let mut stmt = conn
        .prepare(
            "SELECT event_id, memory_id, user_id, recorded_at, event_type, delta
             FROM memory_events
             WHERE user_id = ?1 AND recorded_at >= ?2
             ORDER BY recorded_at DESC, event_id DESC
             LIMIT ?3",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    collect_events(&mut stmt, params![user_id, since_str, limit as i64])
}

fn collect_events(
    stmt: &mut rusqlite::Statement<'_>,
    params: &[&dyn rusqlite::ToSql],
) -> CortexResult<Vec<MemoryEvent>> {
    let rows: Vec<CortexResult<MemoryEvent>> = stmt
        .query_map(params, row_to_event)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    rows.into_iter().collect()
}

fn row_to_event(row: &rusqlite::Row<'_>) -> Result<CortexResult<MemoryEvent>, rusqlite::Error> {
    let recorded_at_str: String = row.get(3)?;
    let event_type_str: String = row.get(4)?;
    let delta_json: String = row.get(5)?;

    let parsed: CortexResult<MemoryEvent> = (|| {
        let recorded_at = DateTime::parse_from_rfc3339(&recorded_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| to_storage_err(format!("parse datetime '{recorded_at_str}': {e}")))?;
        let event_type = MemoryEventType::parse(&event_type_str)
            .ok_or_else(|| to_storage_err(format!("invalid event_type '{event_type_str}'")))?;
        let delta: serde_json::Value =
            serde_json::from_str(&delta_json).map_err(|e| to_storage_err(e.to_string()))?;

        Ok(MemoryEvent {
            event_id: row.get::<_, i64>(0).map_err(|e| to_storage_err(e.to_string()))? as u64,
            memory_id: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
            user_id: row.get(2).map_err(|e| to_storage_err(e.to_string()))?,
            recorded_at,
            event_type,
            delta,
        })
    })();
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageEngine;

    #[test]
    fn append_then_read_back_in_order() {
        let engine = StorageEngine::open(":memory:").unwrap();
        engine
            .transaction(|conn| {
                append_event(conn, "m1", "u1", Utc::now(), MemoryEventType::Created, &serde_json::json!({}))?;
                append_event(
                    conn,
                    "m1",
                    "u1",
                    Utc::now(),
                    MemoryEventType::ContentUpdated,
                    &serde_json::json!({"field": "content"}),
                )?;
                let timeline = get_timeline_for_memory(conn, "m1")?;
                assert_eq!(timeline.len(), 2);
                assert_eq!(timeline[0].event_type, MemoryEventType::Created);
                assert_eq!(timeline[1].event_type, MemoryEventType::ContentUpdated);
                Ok(())
            })
            .unwrap();
    }
}

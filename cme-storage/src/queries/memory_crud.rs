//! Insert, update, get, delete for the `memories` table.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use cme_core::errors::CortexResult;
use cme_core::memory::{EmbeddingStatus, Memory, Sector};

use crate::to_storage_err;

const SELECT_COLUMNS: &str = "id, content, user_id, session_id, primary_sector, created_at, \
     last_accessed, access_count, salience, strength, decay_rate, embedding_status, \
     consolidated_into, consolidated_from, content_hash";

/// Insert a new memory row. Callers insert embeddings/metadata/links
/// separately, within the same transaction.
pub fn insert_memory(conn: &Connection, memory: &Memory) -> CortexResult<()> {
    let consolidated_from_json = memory
        .consolidated_from
        .as_ref()
        .map(|ids| serde_json::to_string(ids))
        .transpose()
        .map_err(|e| to_storage_err(e.to_string()))?;

    conn.execute(
        &format!(
            "INSERT INTO memories ({SELECT_COLUMNS}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
        ),
        params![
            memory.id,
            memory.content,
            memory.user_id,
            memory.session_id,
            memory.primary_sector.as_str(),
            memory.created_at.to_rfc3339(),
            memory.last_accessed.to_rfc3339(),
            memory.access_count as i64,
            memory.salience,
            memory.strength,
            memory.decay_rate,
            memory.embedding_status.as_str(),
            memory.consolidated_into,
            consolidated_from_json,
            memory.content_hash,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Get a memory by id, regardless of owner. Callers enforce ownership.
pub fn get_memory(conn: &Connection, id: &str) -> CortexResult<Option<Memory>> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM memories WHERE id = ?1"),
        params![id],
        row_to_memory,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))?
    .transpose()
}

/// Get a memory by id, scoped to `user_id`. Returns `None` both when the
/// id is unknown and when it belongs to a different user — the two cases
/// must be indistinguishable to the caller.
pub fn get_memory_owned(conn: &Connection, id: &str, user_id: &str) -> CortexResult<Option<Memory>> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM memories WHERE id = ?1 AND user_id = ?2"),
        params![id, user_id],
        row_to_memory,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))?
    .transpose()
}

pub fn get_memories(conn: &Connection, ids: &[String]) -> CortexResult<Vec<Memory>> {
    let mut found = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(m) = get_memory(conn, id)? {
            found.push(m);
        }
    }
    Ok(found)
}

/// Update the scalar fields of a memory (content, status, access bookkeeping,
/// strength/salience, consolidation linkage). Returns `false` if no row matched.
pub fn update_memory(conn: &Connection, memory: &Memory) -> CortexResult<bool> {
    let consolidated_from_json = memory
        .consolidated_from
        .as_ref()
        .map(|ids| serde_json::to_string(ids))
        .transpose()
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows = conn
        .execute(
            "UPDATE memories SET
                content = ?2, session_id = ?3, primary_sector = ?4,
                last_accessed = ?5, access_count = ?6, salience = ?7,
                strength = ?8, decay_rate = ?9, embedding_status = ?10,
                consolidated_into = ?11, consolidated_from = ?12, content_hash = ?13
             WHERE id = ?1",
            params![
                memory.id,
                memory.content,
                memory.session_id,
                memory.primary_sector.as_str(),
                memory.last_accessed.to_rfc3339(),
                memory.access_count as i64,
                memory.salience,
                memory.strength,
                memory.decay_rate,
                memory.embedding_status.as_str(),
                memory.consolidated_into,
                consolidated_from_json,
                memory.content_hash,
            ],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows > 0)
}

/// Bump `last_accessed`/`access_count` as a side effect of a successful read.
pub fn record_access(conn: &Connection, id: &str, at: DateTime<Utc>) -> CortexResult<()> {
    conn.execute(
        "UPDATE memories SET last_accessed = ?2, access_count = access_count + 1 WHERE id = ?1",
        params![id, at.to_rfc3339()],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Soft delete: set strength to 0. The row remains visible to callers that
/// opt in to deleted items.
pub fn soft_delete(conn: &Connection, id: &str) -> CortexResult<bool> {
    let rows = conn
        .execute("UPDATE memories SET strength = 0.0 WHERE id = ?1", params![id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows > 0)
}

/// Hard delete the memory row itself. Callers delete dependent rows
/// (embeddings, metadata, links, events) first, in the same transaction.
pub fn hard_delete(conn: &Connection, id: &str) -> CortexResult<bool> {
    let rows = conn
        .execute("DELETE FROM memories WHERE id = ?1", params![id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows > 0)
}

/// Apply consolidation to one original: multiply `strength` and set
/// `consolidated_into`.
pub fn apply_consolidation_to_original(
    conn: &Connection,
    id: &str,
    strength_reduction_factor: f64,
    summary_id: &str,
) -> CortexResult<bool> {
    let rows = conn
        .execute(
            "UPDATE memories SET strength = strength * ?2, consolidated_into = ?3 WHERE id = ?1",
            params![id, strength_reduction_factor, summary_id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows > 0)
}

/// Unconsolidated episodic memories for a user: `consolidated_into IS NULL`
/// and `embedding_status = 'complete'`, capped at `limit`. Soft-deleted
/// memories (`strength = 0`) are excluded.
pub fn get_unconsolidated_episodic(
    conn: &Connection,
    user_id: &str,
    limit: usize,
) -> CortexResult<Vec<Memory>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM memories
             WHERE user_id = ?1 AND primary_sector = 'episodic'
               AND consolidated_into IS NULL AND embedding_status = 'complete'
               AND strength > 0
             ORDER BY created_at ASC
             LIMIT ?2"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows: Vec<CortexResult<Memory>> = stmt
        .query_map(params![user_id, limit as i64], row_to_memory)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    rows.into_iter().collect()
}

/// Fallback for schemas predating the consolidation columns: all episodic
/// memories for the user. Not expected to trigger against this engine's own
/// schema (which always has the columns) — kept for the degraded-storage
/// contract described in §8.4.8 step 1.
pub fn get_all_episodic(conn: &Connection, user_id: &str, limit: usize) -> CortexResult<Vec<Memory>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM memories
             WHERE user_id = ?1 AND primary_sector = 'episodic' AND strength > 0
             ORDER BY created_at ASC
             LIMIT ?2"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows: Vec<CortexResult<Memory>> = stmt
        .query_map(params![user_id, limit as i64], row_to_memory)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    rows.into_iter().collect()
}

/// Most recently touched memories for a user, for use as a default BFS
/// seed set when `getGraph` is called without a center.
pub fn get_recent_for_user(conn: &Connection, user_id: &str, limit: usize) -> CortexResult<Vec<Memory>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM memories
             WHERE user_id = ?1 AND strength > 0
             ORDER BY last_accessed DESC
             LIMIT ?2"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows: Vec<CortexResult<Memory>> = stmt
        .query_map(params![user_id, limit as i64], row_to_memory)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    rows.into_iter().collect()
}

pub fn count_by_sector(conn: &Connection, user_id: &str) -> CortexResult<Vec<(Sector, i64)>> {
    let mut stmt = conn
        .prepare(
            "SELECT primary_sector, COUNT(*) FROM memories
             WHERE user_id = ?1 AND strength > 0
             GROUP BY primary_sector",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows = stmt
        .query_map(params![user_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut out = Vec::new();
    for row in rows {
        let (sector_str, count) = row.map_err(|e| to_storage_err(e.to_string()))?;
        if let Some(sector) = Sector::parse(&sector_str) {
            out.push((sector, count));
        }
    }
    Ok(out)
}

pub fn count_consolidation_pending(conn: &Connection, user_id: &str) -> CortexResult<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM memories
         WHERE user_id = ?1 AND primary_sector = 'episodic'
           AND consolidated_into IS NULL AND embedding_status = 'complete' AND strength > 0",
        params![user_id],
        |row| row.get::<_, i64>(0),
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

fn row_to_memory(row: &rusqlite::Row<'_>) -> Result<CortexResult<Memory>, rusqlite::Error> {
    Ok(try_row_to_memory(row))
}

fn try_row_to_memory(row: &rusqlite::Row<'_>) -> CortexResult<Memory> {
    let parse_dt = |s: &str| -> CortexResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| to_storage_err(format!("parse datetime '{s}': {e}")))
    };

    let sector_str: String = row.get(4).map_err(|e| to_storage_err(e.to_string()))?;
    let created_at_str: String = row.get(5).map_err(|e| to_storage_err(e.to_string()))?;
    let last_accessed_str: String = row.get(6).map_err(|e| to_storage_err(e.to_string()))?;
    let status_str: String = row.get(11).map_err(|e| to_storage_err(e.to_string()))?;
    let consolidated_from_json: Option<String> =
        row.get(13).map_err(|e| to_storage_err(e.to_string()))?;

    let consolidated_from = consolidated_from_json
        .map(|s| serde_json::from_str::<Vec<String>>(&s))
        .transpose()
        .map_err(|e| to_storage_err(format!("parse consolidated_from: {e}")))?;

    Ok(Memory {
        id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        content: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        user_id: row.get(2).map_err(|e| to_storage_err(e.to_string()))?,
        session_id: row.get(3).map_err(|e| to_storage_err(e.to_string()))?,
        primary_sector: Sector::parse(&sector_str)
            .ok_or_else(|| to_storage_err(format!("invalid sector '{sector_str}'")))?,
        created_at: parse_dt(&created_at_str)?,
        last_accessed: parse_dt(&last_accessed_str)?,
        access_count: row.get::<_, i64>(7).map_err(|e| to_storage_err(e.to_string()))? as u64,
        salience: row.get(8).map_err(|e| to_storage_err(e.to_string()))?,
        strength: row.get(9).map_err(|e| to_storage_err(e.to_string()))?,
        decay_rate: row.get(10).map_err(|e| to_storage_err(e.to_string()))?,
        embedding_status: EmbeddingStatus::parse(&status_str)
            .ok_or_else(|| to_storage_err(format!("invalid embedding_status '{status_str}'")))?,
        consolidated_into: row.get(12).map_err(|e| to_storage_err(e.to_string()))?,
        consolidated_from,
        content_hash: row.get(14).map_err(|e| to_storage_err(e.to_string()))?,
    })
}

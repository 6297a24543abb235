//! Directed weighted edges between memories (`memory_links`), the
//! persistence half of the link graph (`cme-graph` owns traversal logic).

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use cme_core::errors::CortexResult;
use cme_core::memory::{Link, LinkType};

use crate::to_storage_err;

/// Insert or update a link. Self-loops are rejected by the caller
/// (`cme-memory`), not here — this module is a thin persistence layer.
pub fn upsert_link(conn: &Connection, link: &Link) -> CortexResult<()> {
    conn.execute(
        "INSERT INTO memory_links (source_id, target_id, link_type, weight, created_at, traversal_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(source_id, target_id) DO UPDATE SET
            link_type = excluded.link_type, weight = excluded.weight",
        params![
            link.source_id,
            link.target_id,
            link.link_type.as_str(),
            link.weight,
            link.created_at.to_rfc3339(),
            link.traversal_count as i64,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn delete_link(conn: &Connection, source_id: &str, target_id: &str) -> CortexResult<bool> {
    let rows = conn
        .execute(
            "DELETE FROM memory_links WHERE source_id = ?1 AND target_id = ?2",
            params![source_id, target_id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows > 0)
}

pub fn delete_links_for_memory(conn: &Connection, memory_id: &str) -> CortexResult<()> {
    conn.execute(
        "DELETE FROM memory_links WHERE source_id = ?1 OR target_id = ?1",
        params![memory_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// All links touching `memory_id`, as outgoing and incoming pairs.
pub fn get_links_for_memory(conn: &Connection, memory_id: &str) -> CortexResult<Vec<Link>> {
    let mut stmt = conn
        .prepare(
            "SELECT source_id, target_id, link_type, weight, created_at, traversal_count
             FROM memory_links WHERE source_id = ?1 OR target_id = ?1",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows: Vec<CortexResult<Link>> = stmt
        .query_map(params![memory_id], row_to_link)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    rows.into_iter().collect()
}

/// All links whose `source_id` is in `ids`, for graph expansion. Used by
/// `cme-graph`'s BFS one hop at a time.
pub fn get_outgoing_links(conn: &Connection, ids: &[String]) -> CortexResult<Vec<Link>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
    let sql = format!(
        "SELECT source_id, target_id, link_type, weight, created_at, traversal_count
         FROM memory_links WHERE source_id IN ({placeholders})"
    );
    let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
    let params: Vec<&dyn rusqlite::ToSql> = ids.iter().map(|id| id as &dyn rusqlite::ToSql).collect();

    let rows: Vec<CortexResult<Link>> = stmt
        .query_map(params.as_slice(), row_to_link)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    rows.into_iter().collect()
}

pub fn bump_traversal_count(conn: &Connection, source_id: &str, target_id: &str) -> CortexResult<()> {
    conn.execute(
        "UPDATE memory_links SET traversal_count = traversal_count + 1
         WHERE source_id = ?1 AND target_id = ?2",
        params![source_id, target_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

fn row_to_link(row: &rusqlite::Row<'_>) -> Result<CortexResult<Link>, rusqlite::Error> {
    let link_type_str: String = row.get(2)?;
    let created_at_str: String = row.get(4)?;
    Ok((|| -> CortexResult<Link> {
        Ok(Link {
            source_id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
            target_id: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
            link_type: LinkType::parse(&link_type_str).ok_or_else(|| {
                to_storage_err(format!("invalid link_type '{link_type_str}'"))
            })?,
            weight: row.get(3).map_err(|e| to_storage_err(e.to_string()))?,
            created_at: parse_dt(&created_at_str)?,
            traversal_count: row.get::<_, i64>(5).map_err(|e| to_storage_err(e.to_string()))? as u64,
        })
    })())
}

fn parse_dt(s: &str) -> CortexResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| to_storage_err(format!("parse datetime '{s}': {e}")))
}

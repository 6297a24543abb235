//! Persistence for consolidation runs: the summary-insertion side is
//! `memory_crud::insert_memory` plus `memory_crud::apply_consolidation_to_original`;
//! this module owns the audit trail in `consolidation_history`.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use cme_core::errors::CortexResult;
use cme_core::memory::ConsolidationHistoryEntry;

use crate::to_storage_err;

pub fn insert_history(conn: &Connection, entry: &ConsolidationHistoryEntry) -> CortexResult<()> {
    let ids_json = serde_json::to_string(&entry.consolidated_memory_ids)
        .map_err(|e| to_storage_err(e.to_string()))?;

    conn.execute(
        "INSERT INTO consolidation_history
            (id, user_id, summary_memory_id, consolidated_memory_ids, similarity_threshold, cluster_size, consolidated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.id,
            entry.user_id,
            entry.summary_memory_id,
            ids_json,
            entry.similarity_threshold,
            entry.cluster_size as i64,
            entry.consolidated_at.to_rfc3339(),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_history_for_user(
    conn: &Connection,
    user_id: &str,
    limit: usize,
) -> CortexResult<Vec<ConsolidationHistoryEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, user_id, summary_memory_id, consolidated_memory_ids, similarity_threshold, cluster_size, consolidated_at
             FROM consolidation_history WHERE user_id = ?1 ORDER BY consolidated_at DESC LIMIT ?2",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows: Vec<CortexResult<ConsolidationHistoryEntry>> = stmt
        .query_map(params![user_id, limit as i64], row_to_entry)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    rows.into_iter().collect()
}

fn row_to_entry(
    row: &rusqlite::Row<'_>,
) -> Result<CortexResult<ConsolidationHistoryEntry>, rusqlite::Error> {
    let ids_json: String = row.get(3)?;
    let consolidated_at_str: String = row.get(6)?;
    let cluster_size: i64 = row.get(5)?;

    let parsed: CortexResult<ConsolidationHistoryEntry> = (|| {
        let consolidated_memory_ids: Vec<String> =
            serde_json::from_str(&ids_json).map_err(|e| to_storage_err(e.to_string()))?;
        let consolidated_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&consolidated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| to_storage_err(format!("parse datetime '{consolidated_at_str}': {e}")))?;

        Ok(ConsolidationHistoryEntry {
            id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
            user_id: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
            summary_memory_id: row.get(2).map_err(|e| to_storage_err(e.to_string()))?,
            consolidated_memory_ids,
            similarity_threshold: row.get(4).map_err(|e| to_storage_err(e.to_string()))?,
            cluster_size: cluster_size as usize,
            consolidated_at,
        })
    })();
    Ok(parsed)
}

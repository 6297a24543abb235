//! Per-memory metadata (keywords, tags, category, importance) and the
//! structured filter query that backs metadata-driven retrieval.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;

use cme_core::errors::CortexResult;
use cme_core::memory::Metadata;

use crate::to_storage_err;

/// Whether a multi-value filter requires every term to match (`All`) or
/// any one of them (`Any`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    All,
    Any,
}

/// Structured metadata filter. Every field is optional; an unset field
/// imposes no constraint. Categories are always disjunctive (OR'd).
#[derive(Debug, Clone, Default)]
pub struct MetadataFilter {
    pub categories: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
    pub keyword_mode: Option<SetMode>,
    pub tags: Option<Vec<String>>,
    pub tag_mode: Option<SetMode>,
    pub importance_min: Option<f64>,
    pub importance_max: Option<f64>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

pub fn upsert_metadata(conn: &Connection, memory_id: &str, metadata: &Metadata) -> CortexResult<()> {
    let keywords_json = serde_json::to_string(&metadata.keywords.iter().collect::<Vec<_>>())
        .map_err(|e| to_storage_err(e.to_string()))?;
    let tags_json = serde_json::to_string(&metadata.tags.iter().collect::<Vec<_>>())
        .map_err(|e| to_storage_err(e.to_string()))?;

    conn.execute(
        "INSERT INTO memory_metadata
            (memory_id, keywords, tags, category, context, importance, is_atomic, parent_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(memory_id) DO UPDATE SET
            keywords = excluded.keywords, tags = excluded.tags, category = excluded.category,
            context = excluded.context, importance = excluded.importance,
            is_atomic = excluded.is_atomic, parent_id = excluded.parent_id",
        params![
            memory_id,
            keywords_json,
            tags_json,
            metadata.category,
            metadata.context,
            metadata.importance,
            metadata.is_atomic as i64,
            metadata.parent_id,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_metadata(conn: &Connection, memory_id: &str) -> CortexResult<Option<Metadata>> {
    conn.query_row(
        "SELECT keywords, tags, category, context, importance, is_atomic, parent_id
         FROM memory_metadata WHERE memory_id = ?1",
        params![memory_id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        },
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))?
    .map(|(keywords_json, tags_json, category, context, importance, is_atomic, parent_id)| {
        let keywords: Vec<String> =
            serde_json::from_str(&keywords_json).map_err(|e| to_storage_err(e.to_string()))?;
        let tags: Vec<String> =
            serde_json::from_str(&tags_json).map_err(|e| to_storage_err(e.to_string()))?;
        Ok(Metadata {
            keywords: BTreeSet::from_iter(keywords),
            tags: BTreeSet::from_iter(tags),
            category,
            context,
            importance,
            is_atomic: is_atomic != 0,
            parent_id,
        })
    })
    .transpose()
}

pub fn delete_metadata_for_memory(conn: &Connection, memory_id: &str) -> CortexResult<()> {
    conn.execute("DELETE FROM memory_metadata WHERE memory_id = ?1", params![memory_id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Find memory ids for `user_id` matching `filter`, ordered by
/// `memories.created_at` descending.
pub fn find_by_metadata(
    conn: &Connection,
    user_id: &str,
    filter: &MetadataFilter,
) -> CortexResult<Vec<String>> {
    let mut sql = String::from(
        "SELECT m.id FROM memories m JOIN memory_metadata md ON md.memory_id = m.id
         WHERE m.user_id = ?1 AND m.strength > 0",
    );
    let mut bind_strings: Vec<String> = Vec::new();

    if let Some(categories) = &filter.categories {
        if categories.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = categories.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        sql.push_str(&format!(" AND md.category IN ({placeholders})"));
        bind_strings.extend(categories.iter().cloned());
    }

    if let Some(min) = filter.importance_min {
        sql.push_str(&format!(" AND md.importance >= {min}"));
    }
    if let Some(max) = filter.importance_max {
        sql.push_str(&format!(" AND md.importance <= {max}"));
    }
    if let Some(after) = &filter.created_after {
        sql.push_str(" AND m.created_at >= ?");
        bind_strings.push(after.to_rfc3339());
    }
    if let Some(before) = &filter.created_before {
        sql.push_str(" AND m.created_at <= ?");
        bind_strings.push(before.to_rfc3339());
    }
    if let Some(keywords) = &filter.keywords {
        push_set_predicate(&mut sql, "md.keywords", keywords, filter.keyword_mode.unwrap_or(SetMode::Any));
        bind_strings.extend(keywords.iter().cloned());
    }
    if let Some(tags) = &filter.tags {
        push_set_predicate(&mut sql, "md.tags", tags, filter.tag_mode.unwrap_or(SetMode::Any));
        bind_strings.extend(tags.iter().cloned());
    }

    sql.push_str(" ORDER BY m.created_at DESC");

    let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
    let mut all_params: Vec<&dyn rusqlite::ToSql> = vec![&user_id];
    for s in &bind_strings {
        all_params.push(s);
    }

    let rows = stmt
        .query_map(all_params.as_slice(), |row| row.get::<_, String>(0))
        .map_err(|e| to_storage_err(e.to_string()))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// `All`: every term must appear in the JSON array column. `Any`: at least
/// one term must appear. Uses `json_each` (SQLite's bundled JSON1
/// extension) rather than substring matching, so `"c"` doesn't spuriously
/// match `"css"`.
fn push_set_predicate(sql: &mut String, column: &str, terms: &[String], mode: SetMode) {
    if terms.is_empty() {
        return;
    }
    let exists_clauses: Vec<String> = terms
        .iter()
        .map(|_| format!("EXISTS (SELECT 1 FROM json_each({column}) WHERE json_each.value = ?)"))
        .collect();
    let joiner = match mode {
        SetMode::All => " AND ",
        SetMode::Any => " OR ",
    };
    sql.push_str(&format!(" AND ({})", exists_clauses.join(joiner)));
}

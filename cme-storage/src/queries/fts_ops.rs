//! Full-text search execution against the `memories_fts` shadow table.
//! Query parsing (boolean operators, phrases, escaping) lives in
//! `cme-fulltext`; this module only runs an already-built FTS5 `MATCH`
//! expression and shapes the results.

use rusqlite::{params, Connection};

use cme_core::errors::CortexResult;

use crate::to_storage_err;

/// One full-text hit: the memory id, a BM25-derived rank (lower is more
/// relevant, matching FTS5's own convention), and a generated snippet.
#[derive(Debug, Clone)]
pub struct FtsHit {
    pub memory_id: String,
    pub rank: f64,
    pub snippet: String,
}

/// Run `match_expr` (already compiled by `cme_fulltext::parse`) against
/// `memories_fts`, scoped to `user_id`, returning up to `limit` hits
/// ordered by rank.
pub fn search_fts(
    conn: &Connection,
    user_id: &str,
    match_expr: &str,
    limit: usize,
) -> CortexResult<Vec<FtsHit>> {
    let mut stmt = conn
        .prepare(
            "SELECT f.id, bm25(memories_fts) AS rank,
                    snippet(memories_fts, 1, '[', ']', '...', 10)
             FROM memories_fts f
             JOIN memories m ON m.id = f.id
             WHERE memories_fts MATCH ?1 AND m.user_id = ?2 AND m.strength > 0
             ORDER BY rank
             LIMIT ?3",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows = stmt
        .query_map(params![match_expr, user_id, limit as i64], |row| {
            Ok(FtsHit {
                memory_id: row.get(0)?,
                rank: row.get(1)?,
                snippet: row.get(2)?,
            })
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

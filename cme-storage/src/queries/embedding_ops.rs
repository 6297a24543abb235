//! Per-sector embedding vectors: store, fetch, and brute-force cosine
//! nearest-neighbor search over `memory_embeddings`.

use rusqlite::{params, Connection, OptionalExtension};

use cme_core::errors::CortexResult;
use cme_core::memory::Sector;

use crate::to_storage_err;

fn vector_to_blob(v: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(v.len() * 4);
    for x in v {
        bytes.extend_from_slice(&x.to_le_bytes());
    }
    bytes
}

fn blob_to_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Upsert the embedding for one (memory, sector, namespace).
pub fn upsert_embedding(
    conn: &Connection,
    memory_id: &str,
    sector: Sector,
    namespace: &str,
    vector: &[f32],
) -> CortexResult<()> {
    conn.execute(
        "INSERT INTO memory_embeddings (memory_id, sector, namespace, vector)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(memory_id, sector, namespace) DO UPDATE SET vector = excluded.vector",
        params![memory_id, sector.as_str(), namespace, vector_to_blob(vector)],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_embedding(
    conn: &Connection,
    memory_id: &str,
    sector: Sector,
    namespace: &str,
) -> CortexResult<Option<Vec<f32>>> {
    conn.query_row(
        "SELECT vector FROM memory_embeddings WHERE memory_id = ?1 AND sector = ?2 AND namespace = ?3",
        params![memory_id, sector.as_str(), namespace],
        |row| row.get::<_, Vec<u8>>(0),
    )
    .optional()
    .map(|opt| opt.map(|blob| blob_to_vector(&blob)))
    .map_err(|e| to_storage_err(e.to_string()))
}

pub fn delete_embeddings_for_memory(conn: &Connection, memory_id: &str) -> CortexResult<()> {
    conn.execute(
        "DELETE FROM memory_embeddings WHERE memory_id = ?1",
        params![memory_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f64
}

/// Brute-force cosine nearest-neighbor search within one sector/namespace,
/// scoped to a user. Ties break on `memory_id` ascending for a deterministic
/// order.
pub fn vector_similarity_search(
    conn: &Connection,
    user_id: &str,
    sector: Sector,
    namespace: &str,
    query: &[f32],
    top_k: usize,
) -> CortexResult<Vec<(String, f64)>> {
    let mut stmt = conn
        .prepare(
            "SELECT e.memory_id, e.vector FROM memory_embeddings e
             JOIN memories m ON m.id = e.memory_id
             WHERE e.sector = ?1 AND e.namespace = ?2 AND m.user_id = ?3 AND m.strength > 0",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows = stmt
        .query_map(params![sector.as_str(), namespace, user_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut scored = Vec::new();
    for row in rows {
        let (memory_id, blob) = row.map_err(|e| to_storage_err(e.to_string()))?;
        let vector = blob_to_vector(&blob);
        if vector.len() != query.len() {
            return Err(cme_core::CortexError::StorageError(
                cme_core::errors::StorageError::DimensionMismatch {
                    expected: query.len(),
                    found: vector.len(),
                },
            ));
        }
        let score = cosine_similarity(query, &vector);
        scored.push((memory_id, score));
    }

    scored.sort_by(|a, b| match b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal) {
        std::cmp::Ordering::Equal => a.0.cmp(&b.0),
        other => other,
    });
    scored.truncate(top_k);
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_round_trips_vector() {
        let v = vec![0.1f32, -0.5, 2.0];
        let blob = vector_to_blob(&v);
        let back = blob_to_vector(&blob);
        assert_eq!(v, back);
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![1.0f32, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        let a = vec![1.0f32, 0.0];
        let b = vec![0.0f32, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }
}

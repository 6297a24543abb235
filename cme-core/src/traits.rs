//! Interfaces to the two external collaborators named in the system
//! overview: the embedding-vector producer and the text summariser.
//! Both are out of scope to implement for real; the engine only depends
//! on these traits plus a deterministic fallback used in tests.

use crate::errors::CortexResult;
use crate::memory::Sector;

/// A single embedding vector, stored as `f32` to match typical embedding
/// model output and to keep the on-disk BLOB compact.
pub type Embedding = Vec<f32>;

/// Maps `(text, sector)` to a fixed-dimension vector. Implementations are
/// expected to be network-bound; callers retry idempotent calls up to a
/// configured bound (see `EmbeddingError::RetriesExhausted`).
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str, sector: Sector) -> CortexResult<Embedding>;

    /// Convenience for C6's create/update path: embed all five sectors.
    async fn embed_all_sectors(&self, text: &str) -> CortexResult<Vec<(Sector, Embedding)>> {
        let mut out = Vec::with_capacity(Sector::ALL.len());
        for sector in Sector::ALL {
            out.push((sector, self.embed(text, sector).await?));
        }
        Ok(out)
    }

    fn dimension(&self) -> usize;
}

/// Produces a short natural-language summary from a cluster's texts and an
/// extracted topic. Errors from this trait are never retried within a
/// consolidation run — the cluster is skipped and others proceed.
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        instruction: &str,
        texts: &[String],
        topic: &str,
    ) -> CortexResult<String>;
}

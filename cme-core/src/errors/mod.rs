mod consolidation_error;
mod cortex_error;
mod embedding_error;
mod search_error;
mod storage_error;

pub use consolidation_error::ConsolidationError;
pub use cortex_error::{CortexError, CortexResult};
pub use embedding_error::EmbeddingError;
pub use search_error::SearchError;
pub use storage_error::StorageError;

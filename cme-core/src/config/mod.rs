pub mod consolidation_config;
pub mod graph_config;
pub mod search_config;
pub mod similarity_config;
pub mod storage_config;

use serde::{Deserialize, Serialize};

pub use consolidation_config::ConsolidationConfig;
pub use graph_config::GraphConfig;
pub use search_config::SearchConfig;
pub use similarity_config::SimilarityConfig;
pub use storage_config::StorageConfig;

/// Top-level configuration aggregating all subsystem configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CortexConfig {
    pub storage: StorageConfig,
    pub search: SearchConfig,
    pub similarity: SimilarityConfig,
    pub consolidation: ConsolidationConfig,
    pub graph: GraphConfig,
}

impl CortexConfig {
    /// Load config from a TOML string, falling back to defaults for missing fields.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_deserialize_from_empty_toml() {
        let cfg = CortexConfig::from_toml("").expect("empty toml uses defaults");
        assert_eq!(cfg.storage.vector_dimension, 768);
        assert!(cfg.similarity.is_valid());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let cfg = CortexConfig::from_toml(
            r#"
            [consolidation]
            min_cluster_size = 8
            "#,
        )
        .unwrap();
        assert_eq!(cfg.consolidation.min_cluster_size, 8);
        assert_eq!(cfg.consolidation.similarity_threshold, 0.75);
    }
}

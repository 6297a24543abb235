use serde::{Deserialize, Serialize};

/// Weights and parameters for the composite similarity calculator (C4).
/// Weights must sum to 1.0 within `WEIGHT_SUM_EPSILON`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    pub weight_keyword_overlap: f64,
    pub weight_tag_overlap: f64,
    pub weight_content_similarity: f64,
    pub weight_category_match: f64,
    pub weight_temporal_proximity: f64,
    /// Half-life, in minutes, of the temporal-proximity decay.
    pub temporal_half_life_minutes: f64,
}

pub const WEIGHT_SUM_EPSILON: f64 = 1e-6;

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            weight_keyword_overlap: 0.30,
            weight_tag_overlap: 0.25,
            weight_content_similarity: 0.20,
            weight_category_match: 0.15,
            weight_temporal_proximity: 0.10,
            temporal_half_life_minutes: 11.5,
        }
    }
}

impl SimilarityConfig {
    pub fn weight_sum(&self) -> f64 {
        self.weight_keyword_overlap
            + self.weight_tag_overlap
            + self.weight_content_similarity
            + self.weight_category_match
            + self.weight_temporal_proximity
    }

    pub fn is_valid(&self) -> bool {
        (self.weight_sum() - 1.0).abs() <= WEIGHT_SUM_EPSILON
    }

    /// `exp(-ln(2) / half_life * elapsed_minutes)`, i.e. the decay constant
    /// `lambda` implied by the configured half-life.
    pub fn temporal_lambda(&self) -> f64 {
        std::f64::consts::LN_2 / self.temporal_half_life_minutes
    }
}

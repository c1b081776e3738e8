use serde::{Deserialize, Serialize};

use super::round_to;

/// Weights and bounds of the composite score.
///
/// The defaults are product-tuned values; deployments may override them through
/// configuration, but [`ScoringPolicy::validate`] must accept the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub community_ai_weight: f64,
    pub community_rating_scale: f64,
    pub community_rating_weight: f64,
    pub unsafe_report_penalty: f64,
    pub safe_report_bonus: f64,
    pub third_party_ai_weight: f64,
    pub third_party_rich_weight: f64,
    pub third_party_sparse_weight: f64,
    /// Relevant third-party reviews needed before the rich weight applies (exclusive).
    pub rich_review_threshold: u32,
    pub raw_divisor: f64,
    pub min_score: f64,
    pub max_score: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            community_ai_weight: 7.0,
            community_rating_scale: 2.0,
            community_rating_weight: 3.0,
            unsafe_report_penalty: 15.0,
            safe_report_bonus: 2.0,
            third_party_ai_weight: 8.0,
            third_party_rich_weight: 4.0,
            third_party_sparse_weight: 2.0,
            rich_review_threshold: 3,
            raw_divisor: 10.0,
            min_score: 1.0,
            max_score: 10.0,
        }
    }
}

impl ScoringPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        let weights = [
            ("community_ai_weight", self.community_ai_weight),
            ("community_rating_scale", self.community_rating_scale),
            ("community_rating_weight", self.community_rating_weight),
            ("unsafe_report_penalty", self.unsafe_report_penalty),
            ("safe_report_bonus", self.safe_report_bonus),
            ("third_party_ai_weight", self.third_party_ai_weight),
            ("third_party_rich_weight", self.third_party_rich_weight),
            ("third_party_sparse_weight", self.third_party_sparse_weight),
        ];

        for (field, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(PolicyError::NegativeWeight { field });
            }
        }

        if !self.raw_divisor.is_finite() || self.raw_divisor <= 0.0 {
            return Err(PolicyError::NonPositiveDivisor);
        }

        if !(self.min_score.is_finite() && self.max_score.is_finite())
            || self.min_score > self.max_score
        {
            return Err(PolicyError::InvertedBounds {
                min: self.min_score,
                max: self.max_score,
            });
        }

        Ok(())
    }

    pub(crate) fn rating_weight_for(&self, relevant_count: u32) -> f64 {
        if relevant_count > self.rich_review_threshold {
            self.third_party_rich_weight
        } else {
            self.third_party_sparse_weight
        }
    }

    pub(crate) fn finalize(&self, raw: f64) -> f64 {
        let scaled = raw / self.raw_divisor;
        round_to(scaled.clamp(self.min_score, self.max_score), 1)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("scoring weight {field} must be a non-negative number")]
    NegativeWeight { field: &'static str },
    #[error("scoring divisor must be positive")]
    NonPositiveDivisor,
    #[error("score bounds are inverted ({min} > {max})")]
    InvertedBounds { min: f64, max: f64 },
}

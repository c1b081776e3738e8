//! Composite WiseBites safety score.
//!
//! The engine blends an externally computed AI safety score with community and
//! third-party review signals. It is pure: the same [`ScoreInputs`] always yield the
//! same result, and persisting a computed score is left to callers.

mod band;
mod policy;
mod router;
mod rules;


pub use band::SafetyBand;
pub use policy::{PolicyError, ScoringPolicy};
pub use router::score_router;

use serde::{Deserialize, Serialize};

/// The two facts a community review contributes to the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSignal {
    pub rating: u8,
    pub felt_safe: bool,
}

/// Aggregated signals available for one restaurant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreInputs {
    pub ai_score: Option<f64>,
    #[serde(default)]
    pub relevant_count: Option<u32>,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub community: Vec<ReviewSignal>,
}

/// Which branch of the formula produced the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorePath {
    Community,
    ThirdPartyOnly,
    Insufficient,
}

impl ScorePath {
    pub const fn label(self) -> &'static str {
        match self {
            ScorePath::Community => "community reviews",
            ScorePath::ThirdPartyOnly => "third-party reviews only",
            ScorePath::Insufficient => "insufficient data",
        }
    }
}

/// Signals that can contribute points to the raw score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSignal {
    AiSafety,
    CommunityRating,
    UnsafeReports,
    SafeReports,
    ThirdPartyRating,
}

/// Discrete contribution to the raw score so results can be audited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub signal: ScoreSignal,
    pub points: f64,
    pub notes: String,
}

/// Full trail of a score computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub path: ScorePath,
    pub components: Vec<ScoreComponent>,
    pub raw: f64,
    pub score: Option<f64>,
    pub band: Option<SafetyBand>,
}

impl ScoreBreakdown {
    fn insufficient() -> Self {
        Self {
            path: ScorePath::Insufficient,
            components: Vec::new(),
            raw: 0.0,
            score: None,
            band: None,
        }
    }

    pub fn summary(&self) -> String {
        match self.score {
            Some(score) => format!("{score:.1} from {}", self.path.label()),
            None => "analysis not available yet".to_string(),
        }
    }
}

/// Stateless scorer applying a [`ScoringPolicy`].
#[derive(Debug, Clone, Default)]
pub struct ScoreEngine {
    policy: ScoringPolicy,
}

impl ScoreEngine {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Composite score in `[min_score, max_score]` rounded to one decimal, or `None`
    /// when there is not enough signal to display one.
    pub fn score(&self, inputs: &ScoreInputs) -> Option<f64> {
        self.explain(inputs).score
    }

    pub fn explain(&self, inputs: &ScoreInputs) -> ScoreBreakdown {
        let Some(ai_score) = inputs.ai_score.filter(|value| value.is_finite()) else {
            return ScoreBreakdown::insufficient();
        };

        let relevant_count = inputs.relevant_count.unwrap_or(0);
        if inputs.community.is_empty() && relevant_count == 0 {
            return ScoreBreakdown::insufficient();
        }

        let (path, components) = if inputs.community.is_empty() {
            let average_rating = if inputs.average_rating.is_finite() {
                inputs.average_rating
            } else {
                0.0
            };
            (
                ScorePath::ThirdPartyOnly,
                rules::third_party_components(ai_score, relevant_count, average_rating, &self.policy),
            )
        } else {
            (
                ScorePath::Community,
                rules::community_components(ai_score, &inputs.community, &self.policy),
            )
        };

        let raw: f64 = components.iter().map(|component| component.points).sum();
        let score = self.policy.finalize(raw);

        ScoreBreakdown {
            path,
            components,
            raw,
            score: Some(score),
            band: Some(SafetyBand::from_score(score)),
        }
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

//! Third-party review ingestion and AI safety analysis.
//!
//! A [`ReviewRefresher`] serves a restaurant's analysis from the store while it is
//! fresh, and otherwise pulls reviews from a [`ReviewSource`], scores them with a
//! [`ReviewAnalyzer`], and persists the aggregates together with the composite score.

mod groq;
mod refresh;
mod router;
mod serpapi;

#[cfg(test)]
mod tests;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::community::{PlaceId, ThirdPartyReview};
use crate::error::IntegrationError;

pub use groq::{build_prompt, parse_completion, GroqAnalyzer, MAX_PROMPT_REVIEWS};
pub use refresh::{
    RefreshError, ReportSource, ReviewLookup, ReviewRefresher, ReviewsReport,
    ANALYSIS_UNAVAILABLE_SUMMARY, NO_REVIEWS_SUMMARY,
};
pub use router::analysis_router;
pub use serpapi::{parse_reviews, SerpApiReviewSource, SERPAPI_SOURCE_LABEL};

/// Safety score (0-10) and short explanation produced from review texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisVerdict {
    pub score: Option<f64>,
    pub summary: String,
}

/// Where third-party reviews come from.
pub trait ReviewSource: Send + Sync {
    fn fetch_reviews(
        &self,
        place_id: &PlaceId,
    ) -> impl Future<Output = Result<Vec<ThirdPartyReview>, IntegrationError>> + Send;
}

/// Turns review texts into a celiac-safety verdict. Only called with at least one review.
pub trait ReviewAnalyzer: Send + Sync {
    fn analyze(
        &self,
        reviews: &[ThirdPartyReview],
    ) -> impl Future<Output = Result<AnalysisVerdict, IntegrationError>> + Send;
}

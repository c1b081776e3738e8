use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{AnalysisVerdict, ReviewAnalyzer, ReviewSource};
use crate::community::{PlaceId, Restaurant, ReviewStore, StoreError, ThirdPartyReview};
use crate::places::extract_city;
use crate::scoring::{round_to, ScoreEngine};

pub const NO_REVIEWS_SUMMARY: &str = "No reviews available to analyze.";
pub const ANALYSIS_UNAVAILABLE_SUMMARY: &str = "AI analysis currently unavailable.";

const UNKNOWN: &str = "Unknown";

/// Restaurant to refresh, with the details the caller already knows from search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLookup {
    pub place_id: PlaceId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

impl ReviewLookup {
    pub fn new(place_id: PlaceId) -> Self {
        Self {
            place_id,
            name: None,
            address: None,
            city: None,
            rating: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSource {
    Cache,
    Fresh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewsReport {
    pub place_id: PlaceId,
    pub reviews: Vec<ThirdPartyReview>,
    pub relevant_count: u32,
    pub average_safety_rating: f64,
    pub ai_safety_score: Option<f64>,
    pub ai_summary: Option<String>,
    pub wise_bites_score: Option<f64>,
    pub source: ReportSource,
}

impl ReviewsReport {
    fn from_restaurant(restaurant: Restaurant, source: ReportSource) -> Self {
        Self {
            place_id: restaurant.place_id,
            reviews: restaurant.reviews,
            relevant_count: restaurant.relevant_count,
            average_safety_rating: restaurant.average_safety_rating,
            ai_safety_score: restaurant.ai_safety_score,
            ai_summary: restaurant.ai_summary,
            wise_bites_score: restaurant.wise_bites_score,
            source,
        }
    }
}

/// Cache-first pipeline: fetch third-party reviews, analyse them, persist the aggregates.
pub struct ReviewRefresher<S, R, A> {
    store: Arc<S>,
    source: R,
    analyzer: A,
    engine: Arc<ScoreEngine>,
    freshness: Duration,
}

impl<S, R, A> ReviewRefresher<S, R, A>
where
    S: ReviewStore + 'static,
    R: ReviewSource + 'static,
    A: ReviewAnalyzer + 'static,
{
    pub fn new(
        store: Arc<S>,
        source: R,
        analyzer: A,
        engine: Arc<ScoreEngine>,
        freshness: Duration,
    ) -> Self {
        Self {
            store,
            source,
            analyzer,
            engine,
            freshness,
        }
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    pub async fn refresh(
        &self,
        lookup: ReviewLookup,
        now: DateTime<Utc>,
    ) -> Result<ReviewsReport, RefreshError> {
        let place_id = lookup.place_id.clone();
        if place_id.0.trim().is_empty() {
            return Err(RefreshError::MissingPlaceId);
        }

        let cached = self.store.restaurant(&place_id)?;
        if let Some(restaurant) = cached.as_ref().filter(|r| r.is_fresh(now, self.freshness)) {
            debug!(place_id = %place_id, "serving cached review analysis");
            return Ok(ReviewsReport::from_restaurant(
                restaurant.clone(),
                ReportSource::Cache,
            ));
        }

        let fetched = match self.source.fetch_reviews(&place_id).await {
            Ok(reviews) => reviews,
            Err(err) => {
                warn!(place_id = %place_id, error = %err, "review source failed; continuing without reviews");
                Vec::new()
            }
        };
        let reviews: Vec<ThirdPartyReview> = fetched
            .into_iter()
            .filter(|review| !review.text.trim().is_empty())
            .collect();
        let relevant_count = u32::try_from(reviews.len()).unwrap_or(u32::MAX);
        let average_safety_rating = average_rating(&reviews);

        let verdict = self.analyse(&place_id, &reviews).await;

        let mut restaurant = merge_lookup(cached, lookup);
        restaurant.reviews = reviews;
        restaurant.relevant_count = relevant_count;
        restaurant.average_safety_rating = average_safety_rating;
        restaurant.ai_safety_score = verdict.score;
        restaurant.ai_summary = Some(verdict.summary);
        restaurant.last_analyzed = Some(now);

        let community = self.store.reviews_for_place(&place_id)?;
        restaurant.wise_bites_score = self.engine.score(&restaurant.score_inputs(&community));

        let restaurant = self.store.upsert_restaurant(restaurant)?;
        info!(
            place_id = %place_id,
            relevant_count,
            ai_score = ?restaurant.ai_safety_score,
            score = ?restaurant.wise_bites_score,
            "refreshed review analysis"
        );

        Ok(ReviewsReport::from_restaurant(restaurant, ReportSource::Fresh))
    }

    async fn analyse(&self, place_id: &PlaceId, reviews: &[ThirdPartyReview]) -> AnalysisVerdict {
        if reviews.is_empty() {
            return AnalysisVerdict {
                score: None,
                summary: NO_REVIEWS_SUMMARY.to_string(),
            };
        }

        match self.analyzer.analyze(reviews).await {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!(place_id = %place_id, error = %err, "review analysis failed");
                AnalysisVerdict {
                    score: None,
                    summary: ANALYSIS_UNAVAILABLE_SUMMARY.to_string(),
                }
            }
        }
    }
}

fn average_rating(reviews: &[ThirdPartyReview]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let total: f64 = reviews.iter().map(|review| review.rating).sum();
    round_to(total / reviews.len() as f64, 1)
}

/// Lookup details win over the stored record; the stored record wins over placeholders.
fn merge_lookup(existing: Option<Restaurant>, lookup: ReviewLookup) -> Restaurant {
    let ReviewLookup {
        place_id,
        name,
        address,
        city,
        rating,
    } = lookup;

    let mut restaurant = existing.unwrap_or_else(|| Restaurant::new(place_id, UNKNOWN, UNKNOWN));
    if let Some(name) = name.filter(|name| !name.trim().is_empty()) {
        restaurant.name = name;
    }
    if let Some(address) = address.filter(|address| !address.trim().is_empty()) {
        restaurant.address = address;
    }
    if let Some(rating) = rating.filter(|rating| rating.is_finite()) {
        restaurant.rating = rating;
    }

    restaurant.city = city
        .filter(|city| !city.trim().is_empty())
        .or_else(|| restaurant.city.take())
        .or_else(|| {
            if restaurant.address == UNKNOWN {
                None
            } else {
                extract_city(&restaurant.address)
            }
        });
    restaurant
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("place_id is required")]
    MissingPlaceId,
    #[error(transparent)]
    Store(#[from] StoreError),
}

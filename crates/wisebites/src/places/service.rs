use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::geo::{distance_miles, extract_city, Coordinates};
use super::ranking::rank_results;
use super::{PlaceCandidate, PlaceSearch};
use crate::community::{PlaceId, Restaurant, ReviewStore, StoreError};
use crate::error::IntegrationError;
use crate::scoring::{SafetyBand, ScoreEngine};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub user_lat: Option<f64>,
    #[serde(default)]
    pub user_lon: Option<f64>,
}

/// One place in a search response, enriched with any fresh cached analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub place_id: PlaceId,
    pub name: String,
    pub address: String,
    pub city: Option<String>,
    pub rating: f64,
    pub location: Option<Coordinates>,
    pub distance_miles: Option<f64>,
    pub is_open_now: Option<bool>,
    pub hours_schedule: Vec<String>,
    pub ai_safety_score: Option<f64>,
    pub ai_summary: Option<String>,
    pub relevant_count: u32,
    pub is_cached: bool,
    pub wise_bites_score: Option<f64>,
    pub band: Option<SafetyBand>,
}

impl SearchResult {
    fn from_candidate(candidate: PlaceCandidate, origin: Option<Coordinates>) -> Self {
        let distance = match (origin, candidate.location) {
            (Some(origin), Some(location)) => Some(distance_miles(origin, location)),
            _ => None,
        };
        Self {
            city: extract_city(&candidate.address),
            place_id: candidate.place_id,
            name: candidate.name,
            address: candidate.address,
            rating: candidate.rating,
            location: candidate.location,
            distance_miles: distance,
            is_open_now: candidate.open_now,
            hours_schedule: candidate.hours,
            ai_safety_score: None,
            ai_summary: None,
            relevant_count: 0,
            is_cached: false,
            wise_bites_score: None,
            band: None,
        }
    }
}

/// Restaurant search: resolve where the user is, ask the places provider, join cached analyses.
pub struct SearchService<S, P> {
    store: Arc<S>,
    places: P,
    engine: Arc<ScoreEngine>,
    freshness: Duration,
}

impl<S, P> SearchService<S, P>
where
    S: ReviewStore + 'static,
    P: PlaceSearch + 'static,
{
    pub fn new(store: Arc<S>, places: P, engine: Arc<ScoreEngine>, freshness: Duration) -> Self {
        Self {
            store,
            places,
            engine,
            freshness,
        }
    }

    pub async fn search(
        &self,
        request: SearchRequest,
        now: DateTime<Utc>,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidRequest("query is required".to_string()));
        }

        let mut location = non_blank(request.location.as_deref());
        let mut origin = match (request.user_lat, request.user_lon) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)).filter(Coordinates::is_valid),
            _ => None,
        };

        if origin.is_none() {
            if let Some(place) = location.as_deref() {
                origin = self.geocode(place).await;
            }
        }
        if origin.is_none() {
            if let Some(address) = non_blank(request.address.as_deref()) {
                origin = self.geocode(&address).await;
                if origin.is_some() {
                    location = Some(address);
                }
            }
        }

        let text = match (origin, location.as_deref()) {
            (Some(_), _) => format!("{query} gluten-free"),
            (None, Some(place)) => format!("{query} gluten-free in {place}"),
            (None, None) => {
                return Err(SearchError::InvalidRequest(
                    "Must provide location or address".to_string(),
                ))
            }
        };

        let candidates = self.places.search_text(&text, origin).await?;
        debug!(query = %text, results = candidates.len(), "place search completed");

        let mut results: Vec<SearchResult> = candidates
            .into_iter()
            .map(|candidate| SearchResult::from_candidate(candidate, origin))
            .collect();
        self.join_cached(&mut results, now)?;
        rank_results(&mut results, origin.is_some());
        Ok(results)
    }

    async fn geocode(&self, address: &str) -> Option<Coordinates> {
        match self.places.geocode(address).await {
            Ok(coordinates) => coordinates.filter(Coordinates::is_valid),
            Err(err) => {
                warn!(error = %err, "geocoding failed; searching without coordinates");
                None
            }
        }
    }

    fn join_cached(&self, results: &mut [SearchResult], now: DateTime<Utc>) -> Result<(), StoreError> {
        if results.is_empty() {
            return Ok(());
        }
        let place_ids: Vec<PlaceId> = results.iter().map(|result| result.place_id.clone()).collect();
        let cached: HashMap<PlaceId, Restaurant> = self
            .store
            .restaurants(&place_ids)?
            .into_iter()
            .filter(|restaurant| restaurant.is_fresh(now, self.freshness))
            .map(|restaurant| (restaurant.place_id.clone(), restaurant))
            .collect();

        for result in results.iter_mut() {
            let Some(restaurant) = cached.get(&result.place_id) else {
                continue;
            };
            let community = self.store.reviews_for_place(&result.place_id)?;
            let score = self.engine.score(&restaurant.score_inputs(&community));

            result.ai_safety_score = restaurant.ai_safety_score;
            result.ai_summary = restaurant.ai_summary.clone();
            result.relevant_count = restaurant.relevant_count;
            result.is_cached = true;
            result.wise_bites_score = score;
            result.band = score.map(SafetyBand::from_score);
            if result.city.is_none() {
                result.city = restaurant.city.clone();
            }
        }
        Ok(())
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Upstream(#[from] IntegrationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

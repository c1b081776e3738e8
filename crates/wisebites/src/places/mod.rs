//! Gluten-free restaurant search near a location.

mod cache;
mod geo;
mod google;
mod ranking;
mod router;
mod service;

#[cfg(test)]
mod tests;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::community::PlaceId;
use crate::error::IntegrationError;

pub use cache::{CachedPlaces, UPSTREAM_CACHE_CAPACITY};
pub use geo::{distance_miles, extract_city, haversine_miles, Coordinates, EARTH_RADIUS_MILES};
pub use google::{
    parse_geocode_response, parse_search_response, GooglePlacesClient, BIAS_RADIUS_METERS,
    MAX_RESULT_COUNT, MIN_RATING,
};
pub use ranking::rank_results;
pub use router::search_router;
pub use service::{SearchError, SearchRequest, SearchResult, SearchService};

/// Place returned by a provider's text search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub place_id: PlaceId,
    pub name: String,
    pub address: String,
    pub rating: f64,
    pub location: Option<Coordinates>,
    pub open_now: Option<bool>,
    pub hours: Vec<String>,
}

pub trait PlaceSearch: Send + Sync {
    /// Text search, optionally biased towards a point.
    fn search_text(
        &self,
        text: &str,
        bias: Option<Coordinates>,
    ) -> impl Future<Output = Result<Vec<PlaceCandidate>, IntegrationError>> + Send;

    /// Resolve a free-form address; `Ok(None)` when nothing matches.
    fn geocode(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<Coordinates>, IntegrationError>> + Send;
}

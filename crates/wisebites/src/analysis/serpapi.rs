use reqwest::Client;
use serde::Deserialize;

use super::ReviewSource;
use crate::community::{PlaceId, ThirdPartyReview};
use crate::error::IntegrationError;

const SERVICE: &str = "serpapi";
const SERPAPI_URL: &str = "https://serpapi.com/search";

/// Source label stored on every review fetched through SerpApi.
pub const SERPAPI_SOURCE_LABEL: &str = "Google (via SerpApi)";

/// Google Maps reviews fetched through SerpApi, filtered to gluten topics.
#[derive(Debug, Clone)]
pub struct SerpApiReviewSource {
    api_key: Option<String>,
    endpoint: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    reviews: Vec<SerpApiReview>,
}

#[derive(Debug, Deserialize)]
struct SerpApiReview {
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    user: Option<SerpApiUser>,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SerpApiUser {
    #[serde(default)]
    name: Option<String>,
}

impl SerpApiReviewSource {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            endpoint: SERPAPI_URL.to_string(),
            client: Client::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl ReviewSource for SerpApiReviewSource {
    async fn fetch_reviews(&self, place_id: &PlaceId) -> Result<Vec<ThirdPartyReview>, IntegrationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(IntegrationError::MissingCredentials("SERPAPI_KEY"))?;

        tracing::debug!(place_id = %place_id, "requesting reviews from serpapi");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("engine", "google_maps_reviews"),
                ("place_id", place_id.0.as_str()),
                ("api_key", api_key),
                ("query", "gluten celiac"),
                ("sort_by", "qualityScore"),
                ("hl", "en"),
            ])
            .send()
            .await
            .map_err(|source| IntegrationError::Transport {
                service: SERVICE,
                source,
            })?;

        let body = response
            .text()
            .await
            .map_err(|source| IntegrationError::Transport {
                service: SERVICE,
                source,
            })?;

        parse_reviews(&body)
    }
}

/// Map a SerpApi `google_maps_reviews` payload onto stored reviews.
///
/// Reviews without text are kept here; the refresher decides relevance.
pub fn parse_reviews(body: &str) -> Result<Vec<ThirdPartyReview>, IntegrationError> {
    let response: SerpApiResponse =
        serde_json::from_str(body).map_err(|err| IntegrationError::Decode {
            service: SERVICE,
            message: err.to_string(),
        })?;

    if let Some(message) = response.error {
        return Err(IntegrationError::Upstream {
            service: SERVICE,
            message,
        });
    }

    Ok(response
        .reviews
        .into_iter()
        .map(|review| ThirdPartyReview {
            source: SERPAPI_SOURCE_LABEL.to_string(),
            text: review.snippet.unwrap_or_default().trim().to_string(),
            rating: review.rating.unwrap_or(0.0),
            author: review
                .user
                .and_then(|user| user.name)
                .unwrap_or_else(|| "Anonymous".to_string()),
            date: review.date.unwrap_or_default(),
        })
        .collect())
}

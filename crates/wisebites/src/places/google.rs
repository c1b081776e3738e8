use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::geo::Coordinates;
use super::{PlaceCandidate, PlaceSearch};
use crate::community::PlaceId;
use crate::error::IntegrationError;

const PLACES_SERVICE: &str = "google places";
const GEOCODE_SERVICE: &str = "google geocoding";

const SEARCH_TEXT_URL: &str = "https://places.googleapis.com/v1/places:searchText";
const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

const FIELD_MASK: &str = "places.displayName,places.formattedAddress,places.rating,places.id,\
places.location,places.regularOpeningHours,places.businessStatus";

pub const MIN_RATING: f64 = 3.5;
pub const MAX_RESULT_COUNT: u32 = 10;
pub const BIAS_RADIUS_METERS: f64 = 5000.0;

/// Google Places (v1 text search) and Geocoding client.
#[derive(Debug, Clone)]
pub struct GooglePlacesClient {
    api_key: Option<String>,
    search_endpoint: String,
    geocode_endpoint: String,
    client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchTextRequest<'a> {
    text_query: &'a str,
    min_rating: f64,
    max_result_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    location_bias: Option<LocationBias>,
}

#[derive(Debug, Serialize)]
struct LocationBias {
    circle: Circle,
}

#[derive(Debug, Serialize)]
struct Circle {
    center: LatLng,
    radius: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct SearchTextResponse {
    #[serde(default)]
    places: Vec<GooglePlace>,
    #[serde(default)]
    error: Option<GoogleError>,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GooglePlace {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    display_name: Option<DisplayName>,
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    location: Option<LatLng>,
    #[serde(default)]
    regular_opening_hours: Option<OpeningHours>,
}

#[derive(Debug, Deserialize)]
struct DisplayName {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpeningHours {
    #[serde(default)]
    open_now: Option<bool>,
    #[serde(default)]
    weekday_descriptions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: GeocodeLocation,
}

#[derive(Debug, Deserialize)]
struct GeocodeLocation {
    lat: f64,
    lng: f64,
}

impl GooglePlacesClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            search_endpoint: SEARCH_TEXT_URL.to_string(),
            geocode_endpoint: GEOCODE_URL.to_string(),
            client: Client::new(),
        }
    }

    pub fn with_endpoints(
        mut self,
        search_endpoint: impl Into<String>,
        geocode_endpoint: impl Into<String>,
    ) -> Self {
        self.search_endpoint = search_endpoint.into();
        self.geocode_endpoint = geocode_endpoint.into();
        self
    }

    fn api_key(&self) -> Result<&str, IntegrationError> {
        self.api_key
            .as_deref()
            .ok_or(IntegrationError::MissingCredentials("GOOGLE_API_KEY"))
    }
}

impl PlaceSearch for GooglePlacesClient {
    async fn search_text(
        &self,
        text: &str,
        bias: Option<Coordinates>,
    ) -> Result<Vec<PlaceCandidate>, IntegrationError> {
        let api_key = self.api_key()?;
        let request = SearchTextRequest {
            text_query: text,
            min_rating: MIN_RATING,
            max_result_count: MAX_RESULT_COUNT,
            location_bias: bias.map(|center| LocationBias {
                circle: Circle {
                    center: LatLng {
                        latitude: center.lat,
                        longitude: center.lng,
                    },
                    radius: BIAS_RADIUS_METERS,
                },
            }),
        };

        let response = self
            .client
            .post(&self.search_endpoint)
            .header("X-Goog-Api-Key", api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&request)
            .send()
            .await
            .map_err(|source| IntegrationError::Transport {
                service: PLACES_SERVICE,
                source,
            })?;

        let body = response
            .text()
            .await
            .map_err(|source| IntegrationError::Transport {
                service: PLACES_SERVICE,
                source,
            })?;

        parse_search_response(&body)
    }

    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, IntegrationError> {
        let api_key = self.api_key()?;
        let response = self
            .client
            .get(&self.geocode_endpoint)
            .query(&[("address", address), ("key", api_key)])
            .send()
            .await
            .map_err(|source| IntegrationError::Transport {
                service: GEOCODE_SERVICE,
                source,
            })?;

        let body = response
            .text()
            .await
            .map_err(|source| IntegrationError::Transport {
                service: GEOCODE_SERVICE,
                source,
            })?;

        parse_geocode_response(&body)
    }
}

/// Map a `places:searchText` payload onto candidates. Places without an id are dropped.
pub fn parse_search_response(body: &str) -> Result<Vec<PlaceCandidate>, IntegrationError> {
    let response: SearchTextResponse =
        serde_json::from_str(body).map_err(|err| IntegrationError::Decode {
            service: PLACES_SERVICE,
            message: err.to_string(),
        })?;

    if let Some(error) = response.error {
        return Err(IntegrationError::Upstream {
            service: PLACES_SERVICE,
            message: error.message,
        });
    }

    Ok(response
        .places
        .into_iter()
        .filter_map(|place| {
            let id = place.id.filter(|id| !id.is_empty())?;
            let hours = place.regular_opening_hours;
            Some(PlaceCandidate {
                place_id: PlaceId(id),
                name: place
                    .display_name
                    .map(|name| name.text)
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| "Unknown".to_string()),
                address: place.formatted_address.unwrap_or_default(),
                rating: place.rating.unwrap_or(0.0),
                location: place
                    .location
                    .map(|loc| Coordinates::new(loc.latitude, loc.longitude)),
                open_now: hours.as_ref().and_then(|hours| hours.open_now),
                hours: hours
                    .map(|hours| hours.weekday_descriptions)
                    .unwrap_or_default(),
            })
        })
        .collect())
}

/// First geocoding match, `None` when the address is unknown.
pub fn parse_geocode_response(body: &str) -> Result<Option<Coordinates>, IntegrationError> {
    let response: GeocodeResponse =
        serde_json::from_str(body).map_err(|err| IntegrationError::Decode {
            service: GEOCODE_SERVICE,
            message: err.to_string(),
        })?;

    match response.status.as_str() {
        "OK" | "ZERO_RESULTS" | "" => Ok(response
            .results
            .into_iter()
            .next()
            .map(|result| Coordinates::new(result.geometry.location.lat, result.geometry.location.lng))),
        status => Err(IntegrationError::Upstream {
            service: GEOCODE_SERVICE,
            message: response
                .error_message
                .unwrap_or_else(|| status.to_string()),
        }),
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::*;
use crate::community::{InMemoryStore, Restaurant, ReviewStore};
use crate::scoring::ScoreEngine;

type SearchLog = Arc<Mutex<Vec<(String, Option<Coordinates>)>>>;

const ORIGIN: Coordinates = Coordinates {
    lat: 33.749,
    lng: -84.388,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn candidate(id: &str, rating: f64, location: Option<(f64, f64)>) -> PlaceCandidate {
    PlaceCandidate {
        place_id: PlaceId(id.to_string()),
        name: format!("Place {id}"),
        address: "12 Peach St, Atlanta, GA 30308".to_string(),
        rating,
        location: location.map(|(lat, lng)| Coordinates::new(lat, lng)),
        open_now: Some(true),
        hours: vec!["Monday: 11:00 AM - 9:00 PM".to_string()],
    }
}

fn candidates() -> Vec<PlaceCandidate> {
    vec![
        candidate("ChIJ-a", 4.2, Some((33.7748, -84.2963))),
        candidate("ChIJ-b", 4.8, Some((33.76, -84.39))),
        candidate("ChIJ-c", 4.0, None),
        candidate("ChIJ-d", 3.9, Some((33.80, -84.40))),
    ]
}

struct StubPlaces {
    candidates: Vec<PlaceCandidate>,
    geocodes: HashMap<String, Coordinates>,
    searches: SearchLog,
    fail: bool,
}

impl PlaceSearch for StubPlaces {
    async fn search_text(
        &self,
        text: &str,
        bias: Option<Coordinates>,
    ) -> Result<Vec<PlaceCandidate>, IntegrationError> {
        self.searches
            .lock()
            .expect("search log")
            .push((text.to_string(), bias));
        if self.fail {
            return Err(IntegrationError::Upstream {
                service: "google places",
                message: "API key not valid".to_string(),
            });
        }
        Ok(self.candidates.clone())
    }

    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, IntegrationError> {
        Ok(self.geocodes.get(address).copied())
    }
}

fn cached_restaurant(id: &str, analysed_at: DateTime<Utc>) -> Restaurant {
    let mut restaurant = Restaurant::new(PlaceId(id.to_string()), format!("Place {id}"), "12 Peach St, Atlanta, GA 30308");
    restaurant.ai_safety_score = Some(8.0);
    restaurant.ai_summary = Some("Trained staff.".to_string());
    restaurant.relevant_count = 5;
    restaurant.average_safety_rating = 4.2;
    restaurant.last_analyzed = Some(analysed_at);
    restaurant
}

fn build(fail: bool) -> (SearchService<InMemoryStore, StubPlaces>, SearchLog) {
    build_at(fail, now())
}

/// Seeds one analysis 3 days before `anchor` and one 40 days before it.
fn build_at(fail: bool, anchor: DateTime<Utc>) -> (SearchService<InMemoryStore, StubPlaces>, SearchLog) {
    let store = Arc::new(InMemoryStore::default());
    store
        .upsert_restaurant(cached_restaurant("ChIJ-a", anchor - Duration::days(3)))
        .expect("seed fresh");
    store
        .upsert_restaurant(cached_restaurant("ChIJ-d", anchor - Duration::days(40)))
        .expect("seed stale");

    let searches: SearchLog = Arc::default();
    let mut geocodes = HashMap::new();
    geocodes.insert("Midtown Atlanta".to_string(), ORIGIN);
    geocodes.insert("12 Peach St, Atlanta, GA 30308".to_string(), ORIGIN);

    let places = StubPlaces {
        candidates: candidates(),
        geocodes,
        searches: searches.clone(),
        fail,
    };
    let service = SearchService::new(
        store,
        places,
        Arc::new(ScoreEngine::default()),
        Duration::days(30),
    );
    (service, searches)
}

fn ids(results: &[SearchResult]) -> Vec<&str> {
    results.iter().map(|result| result.place_id.0.as_str()).collect()
}

#[tokio::test]
async fn explicit_coordinates_bias_the_search_and_rank_by_score_then_distance() {
    let (service, searches) = build(false);
    let request = SearchRequest {
        query: "pizza".to_string(),
        user_lat: Some(ORIGIN.lat),
        user_lon: Some(ORIGIN.lng),
        ..SearchRequest::default()
    };

    let results = service.search(request, now()).await.expect("search");

    assert_eq!(ids(&results), vec!["ChIJ-a", "ChIJ-b", "ChIJ-d", "ChIJ-c"]);
    let log = searches.lock().expect("search log");
    assert_eq!(log[0].0, "pizza gluten-free");
    assert_eq!(log[0].1, Some(ORIGIN));

    let scored = &results[0];
    assert!(scored.is_cached);
    assert_eq!(scored.wise_bites_score, Some(8.1));
    assert_eq!(scored.ai_safety_score, Some(8.0));
    assert_eq!(scored.relevant_count, 5);
    assert_eq!(scored.city.as_deref(), Some("Atlanta, GA"));

    let stale = &results[2];
    assert!(!stale.is_cached);
    assert_eq!(stale.wise_bites_score, None);
    assert!(results[3].distance_miles.is_none());
    assert!(results[1].distance_miles.expect("distance") < 1.0);
}

#[tokio::test]
async fn named_location_is_geocoded_first() {
    let (service, searches) = build(false);
    let request = SearchRequest {
        query: "tacos".to_string(),
        location: Some("Midtown Atlanta".to_string()),
        ..SearchRequest::default()
    };

    let results = service.search(request, now()).await.expect("search");

    assert_eq!(results[0].place_id.0, "ChIJ-a");
    let log = searches.lock().expect("search log");
    assert_eq!(log[0], ("tacos gluten-free".to_string(), Some(ORIGIN)));
}

#[tokio::test]
async fn unresolvable_location_searches_by_text_and_ranks_by_rating() {
    let (service, searches) = build(false);
    let request = SearchRequest {
        query: "thai".to_string(),
        location: Some("Atlanta, GA".to_string()),
        ..SearchRequest::default()
    };

    let results = service.search(request, now()).await.expect("search");

    assert_eq!(ids(&results), vec!["ChIJ-b", "ChIJ-a", "ChIJ-c", "ChIJ-d"]);
    assert!(results.iter().all(|result| result.distance_miles.is_none()));
    let log = searches.lock().expect("search log");
    assert_eq!(log[0], ("thai gluten-free in Atlanta, GA".to_string(), None));
}

#[tokio::test]
async fn street_address_stands_in_for_the_location() {
    let (service, searches) = build(false);
    let request = SearchRequest {
        query: "bakery".to_string(),
        address: Some("12 Peach St, Atlanta, GA 30308".to_string()),
        ..SearchRequest::default()
    };

    service.search(request, now()).await.expect("search");

    let log = searches.lock().expect("search log");
    assert_eq!(log[0], ("bakery gluten-free".to_string(), Some(ORIGIN)));
}

#[tokio::test]
async fn a_location_or_address_is_required() {
    let (service, searches) = build(false);

    let missing = service
        .search(
            SearchRequest {
                query: "sushi".to_string(),
                ..SearchRequest::default()
            },
            now(),
        )
        .await;
    match missing {
        Err(SearchError::InvalidRequest(message)) => {
            assert_eq!(message, "Must provide location or address")
        }
        other => panic!("expected invalid request, got {other:?}"),
    }

    let unknown_address = service
        .search(
            SearchRequest {
                query: "sushi".to_string(),
                address: Some("nowhere in particular".to_string()),
                ..SearchRequest::default()
            },
            now(),
        )
        .await;
    assert!(matches!(unknown_address, Err(SearchError::InvalidRequest(_))));

    let blank_query = service
        .search(
            SearchRequest {
                query: "  ".to_string(),
                location: Some("Atlanta, GA".to_string()),
                ..SearchRequest::default()
            },
            now(),
        )
        .await;
    assert!(matches!(blank_query, Err(SearchError::InvalidRequest(_))));

    assert!(searches.lock().expect("search log").is_empty());
}

#[tokio::test]
async fn provider_failures_surface_as_upstream_errors() {
    let (service, _searches) = build(true);
    let request = SearchRequest {
        query: "pizza".to_string(),
        location: Some("Atlanta, GA".to_string()),
        ..SearchRequest::default()
    };

    let result = service.search(request, now()).await;
    assert!(matches!(result, Err(SearchError::Upstream(_))));
}

#[tokio::test]
async fn repeated_searches_reuse_cached_provider_answers() {
    let searches: SearchLog = Arc::default();
    let places = StubPlaces {
        candidates: candidates(),
        geocodes: HashMap::from([("Midtown Atlanta".to_string(), ORIGIN)]),
        searches: searches.clone(),
        fail: false,
    };
    let service = SearchService::new(
        Arc::new(InMemoryStore::default()),
        CachedPlaces::new(places),
        Arc::new(ScoreEngine::default()),
        Duration::days(30),
    );
    let request = SearchRequest {
        query: "tacos".to_string(),
        location: Some("Midtown Atlanta".to_string()),
        ..SearchRequest::default()
    };

    let first = service.search(request.clone(), now()).await.expect("search");
    let second = service.search(request, now()).await.expect("search");

    assert_eq!(first, second);
    assert_eq!(searches.lock().expect("search log").len(), 1);
}

#[tokio::test]
async fn search_route_maps_bad_requests_and_results() {
    // The handler reads the wall clock, so seed relative to it.
    let (service, _searches) = build_at(false, Utc::now());
    let app = search_router(Arc::new(service));

    let ok = Request::builder()
        .method(Method::POST)
        .uri("/api/search")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "query": "pizza", "user_lat": ORIGIN.lat, "user_lon": ORIGIN.lng }).to_string(),
        ))
        .expect("build request");
    let response = app.clone().oneshot(ok).await.expect("route response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    let payload: Value = serde_json::from_slice(&body).expect("json payload");
    assert_eq!(payload["results"][0]["place_id"], "ChIJ-a");
    assert_eq!(payload["results"][0]["band"], "good");

    let bad = Request::builder()
        .method(Method::POST)
        .uri("/api/search")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "query": "pizza" }).to_string()))
        .expect("build request");
    let response = app.oneshot(bad).await.expect("route response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn search_payload_maps_onto_candidates() {
    let body = json!({
        "places": [
            {
                "id": "ChIJ-x",
                "displayName": { "text": "Celiac Kitchen", "languageCode": "en" },
                "formattedAddress": "1 Elm St, Decatur, GA 30030, USA",
                "rating": 4.7,
                "location": { "latitude": 33.77, "longitude": -84.29 },
                "regularOpeningHours": {
                    "openNow": false,
                    "weekdayDescriptions": ["Monday: Closed"]
                }
            },
            { "displayName": { "text": "No id" } },
            { "id": "ChIJ-y" }
        ]
    })
    .to_string();

    let places = parse_search_response(&body).expect("parsed");
    assert_eq!(places.len(), 2);
    assert_eq!(places[0].name, "Celiac Kitchen");
    assert_eq!(places[0].location, Some(Coordinates::new(33.77, -84.29)));
    assert_eq!(places[0].open_now, Some(false));
    assert_eq!(places[0].hours, vec!["Monday: Closed".to_string()]);
    assert_eq!(places[1].name, "Unknown");
    assert_eq!(places[1].rating, 0.0);
    assert!(places[1].hours.is_empty());
}

#[test]
fn search_error_payload_is_upstream() {
    let body = json!({ "error": { "code": 403, "message": "API key not valid." } }).to_string();
    assert!(matches!(
        parse_search_response(&body),
        Err(IntegrationError::Upstream { message, .. }) if message == "API key not valid."
    ));
}

#[test]
fn geocode_payloads() {
    let found = json!({
        "status": "OK",
        "results": [{ "geometry": { "location": { "lat": 33.75, "lng": -84.39 } } }]
    })
    .to_string();
    assert_eq!(
        parse_geocode_response(&found).expect("parsed"),
        Some(Coordinates::new(33.75, -84.39))
    );

    let empty = json!({ "status": "ZERO_RESULTS", "results": [] }).to_string();
    assert_eq!(parse_geocode_response(&empty).expect("parsed"), None);

    let denied = json!({ "status": "REQUEST_DENIED", "error_message": "key expired" }).to_string();
    assert!(matches!(
        parse_geocode_response(&denied),
        Err(IntegrationError::Upstream { message, .. }) if message == "key expired"
    ));
}

#[test]
fn rating_order_applies_without_an_origin() {
    let mut results: Vec<SearchResult> = Vec::new();
    for (id, rating, score) in [("low", 3.6, Some(9.0)), ("high", 4.9, None)] {
        results.push(SearchResult {
            place_id: PlaceId(id.to_string()),
            name: id.to_string(),
            address: String::new(),
            city: None,
            rating,
            location: None,
            distance_miles: None,
            is_open_now: None,
            hours_schedule: Vec::new(),
            ai_safety_score: None,
            ai_summary: None,
            relevant_count: 0,
            is_cached: false,
            wise_bites_score: score,
            band: None,
        });
    }

    rank_results(&mut results, false);
    assert_eq!(ids(&results), vec!["high", "low"]);

    rank_results(&mut results, true);
    assert_eq!(ids(&results), vec!["low", "high"]);
}

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::*;
use crate::community::{
    CommunityReview, InMemoryStore, Restaurant, ReviewId, ReviewStore, SafetyFlags, StarRating,
    UserId,
};
use crate::error::IntegrationError;
use crate::scoring::ScoreEngine;

const PLACE: &str = "ChIJ-corner-cafe";

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn review(text: &str, rating: f64) -> ThirdPartyReview {
    ThirdPartyReview {
        source: SERPAPI_SOURCE_LABEL.to_string(),
        text: text.to_string(),
        rating,
        author: "Sam".to_string(),
        date: "2 weeks ago".to_string(),
    }
}

fn lookup() -> ReviewLookup {
    ReviewLookup {
        place_id: PlaceId(PLACE.to_string()),
        name: Some("Corner Cafe".to_string()),
        address: Some("12 Peach St, Atlanta, GA 30308".to_string()),
        city: None,
        rating: Some(4.4),
    }
}

struct StubSource {
    reviews: Option<Vec<ThirdPartyReview>>,
    calls: Arc<AtomicUsize>,
}

impl ReviewSource for StubSource {
    async fn fetch_reviews(&self, _place_id: &PlaceId) -> Result<Vec<ThirdPartyReview>, IntegrationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reviews
            .clone()
            .ok_or(IntegrationError::MissingCredentials("SERPAPI_KEY"))
    }
}

struct StubAnalyzer {
    score: Option<f64>,
    seen: Arc<AtomicUsize>,
}

impl ReviewAnalyzer for StubAnalyzer {
    async fn analyze(&self, reviews: &[ThirdPartyReview]) -> Result<AnalysisVerdict, IntegrationError> {
        self.seen.store(reviews.len(), Ordering::SeqCst);
        match self.score {
            Some(score) => Ok(AnalysisVerdict {
                score: Some(score),
                summary: "Separate prep area and a dedicated fryer.".to_string(),
            }),
            None => Err(IntegrationError::Upstream {
                service: "groq",
                message: "503: overloaded".to_string(),
            }),
        }
    }
}

struct Harness {
    refresher: ReviewRefresher<InMemoryStore, StubSource, StubAnalyzer>,
    store: Arc<InMemoryStore>,
    source_calls: Arc<AtomicUsize>,
    analyzer_seen: Arc<AtomicUsize>,
}

fn harness(reviews: Option<Vec<ThirdPartyReview>>, ai_score: Option<f64>) -> Harness {
    let store = Arc::new(InMemoryStore::default());
    let source_calls = Arc::new(AtomicUsize::new(0));
    let analyzer_seen = Arc::new(AtomicUsize::new(0));
    let refresher = ReviewRefresher::new(
        store.clone(),
        StubSource {
            reviews,
            calls: source_calls.clone(),
        },
        StubAnalyzer {
            score: ai_score,
            seen: analyzer_seen.clone(),
        },
        Arc::new(ScoreEngine::default()),
        Duration::days(30),
    );
    Harness {
        refresher,
        store,
        source_calls,
        analyzer_seen,
    }
}

fn sample_reviews() -> Vec<ThirdPartyReview> {
    vec![
        review("Dedicated fryer, never got sick.", 5.0),
        review("Staff asked about cross-contamination.", 4.0),
        review("   ", 1.0),
    ]
}

#[tokio::test]
async fn fresh_refresh_aggregates_and_persists() {
    let h = harness(Some(sample_reviews()), Some(8.0));

    let report = h.refresher.refresh(lookup(), at(2, 12)).await.expect("refresh");

    assert_eq!(report.source, ReportSource::Fresh);
    assert_eq!(report.relevant_count, 2);
    assert_eq!(report.average_safety_rating, 4.5);
    assert_eq!(report.ai_safety_score, Some(8.0));
    // 8*8 + 4.5*2 = 73
    assert_eq!(report.wise_bites_score, Some(7.3));
    assert_eq!(h.analyzer_seen.load(Ordering::SeqCst), 2);

    let stored = h
        .store
        .restaurant(&PlaceId(PLACE.to_string()))
        .expect("lookup")
        .expect("persisted");
    assert_eq!(stored.name, "Corner Cafe");
    assert_eq!(stored.city.as_deref(), Some("Atlanta, GA"));
    assert_eq!(stored.rating, 4.4);
    assert_eq!(stored.last_analyzed, Some(at(2, 12)));
    assert_eq!(stored.reviews.len(), 2);
}

#[tokio::test]
async fn fresh_records_are_served_from_cache() {
    let h = harness(Some(sample_reviews()), Some(8.0));
    h.refresher.refresh(lookup(), at(2, 12)).await.expect("first refresh");

    let cached = h
        .refresher
        .refresh(ReviewLookup::new(PlaceId(PLACE.to_string())), at(20, 12))
        .await
        .expect("cached refresh");

    assert_eq!(cached.source, ReportSource::Cache);
    assert_eq!(cached.wise_bites_score, Some(7.3));
    assert_eq!(h.source_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stale_records_are_refetched() {
    let h = harness(Some(sample_reviews()), Some(8.0));
    h.refresher.refresh(lookup(), at(2, 12)).await.expect("first refresh");

    let report = h
        .refresher
        .refresh(ReviewLookup::new(PlaceId(PLACE.to_string())), at(2, 12) + Duration::days(30))
        .await
        .expect("stale refresh");

    assert_eq!(report.source, ReportSource::Fresh);
    assert_eq!(h.source_calls.load(Ordering::SeqCst), 2);

    let stored = h
        .store
        .restaurant(&PlaceId(PLACE.to_string()))
        .expect("lookup")
        .expect("persisted");
    assert_eq!(stored.name, "Corner Cafe", "stored details survive a bare lookup");
}

#[tokio::test]
async fn source_failure_yields_no_score() {
    let h = harness(None, Some(8.0));

    let report = h.refresher.refresh(lookup(), at(2, 12)).await.expect("refresh");

    assert_eq!(report.relevant_count, 0);
    assert_eq!(report.average_safety_rating, 0.0);
    assert_eq!(report.ai_safety_score, None);
    assert_eq!(report.ai_summary.as_deref(), Some(NO_REVIEWS_SUMMARY));
    assert_eq!(report.wise_bites_score, None);
    assert_eq!(h.analyzer_seen.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn analyzer_failure_keeps_aggregates_without_score() {
    let h = harness(Some(sample_reviews()), None);

    let report = h.refresher.refresh(lookup(), at(2, 12)).await.expect("refresh");

    assert_eq!(report.relevant_count, 2);
    assert_eq!(report.ai_safety_score, None);
    assert_eq!(report.ai_summary.as_deref(), Some(ANALYSIS_UNAVAILABLE_SUMMARY));
    assert_eq!(report.wise_bites_score, None);
}

#[tokio::test]
async fn community_reviews_take_part_in_the_refreshed_score() {
    let h = harness(Some(sample_reviews()), Some(8.0));
    h.store
        .insert_review(CommunityReview {
            id: ReviewId("rev-seed".to_string()),
            place_id: PlaceId(PLACE.to_string()),
            user_id: UserId("u1".to_string()),
            rating: StarRating::try_from(5).expect("valid rating"),
            comment: None,
            images: Vec::new(),
            flags: SafetyFlags {
                felt_safe: true,
                ..SafetyFlags::default()
            },
            created_at: at(1, 8),
            updated_at: at(1, 8),
        })
        .expect("seed review");

    let report = h.refresher.refresh(lookup(), at(2, 12)).await.expect("refresh");

    // 8*7 + 5*2*3 + 2 = 88
    assert_eq!(report.wise_bites_score, Some(8.8));
}

#[tokio::test]
async fn lookup_city_wins_over_extracted_city() {
    let h = harness(Some(sample_reviews()), Some(8.0));
    let mut with_city = lookup();
    with_city.city = Some("Decatur, GA".to_string());

    h.refresher.refresh(with_city, at(2, 12)).await.expect("refresh");

    let stored: Restaurant = h
        .store
        .restaurant(&PlaceId(PLACE.to_string()))
        .expect("lookup")
        .expect("persisted");
    assert_eq!(stored.city.as_deref(), Some("Decatur, GA"));
}

#[tokio::test]
async fn blank_place_id_is_rejected() {
    let h = harness(Some(sample_reviews()), Some(8.0));

    let result = h
        .refresher
        .refresh(ReviewLookup::new(PlaceId("  ".to_string())), at(2, 12))
        .await;

    assert!(matches!(result, Err(RefreshError::MissingPlaceId)));
    assert_eq!(h.source_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn reviews_route_returns_the_report() {
    let h = harness(Some(sample_reviews()), Some(8.0));
    let app = analysis_router(Arc::new(h.refresher));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/reviews")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "place_id": PLACE, "name": "Corner Cafe" }).to_string()))
        .expect("build request");
    let response = app.clone().oneshot(request).await.expect("route response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    let payload: Value = serde_json::from_slice(&body).expect("json payload");
    assert_eq!(payload["source"], "fresh");
    assert_eq!(payload["relevant_count"], 2);
    assert_eq!(payload["reviews"][0]["source"], SERPAPI_SOURCE_LABEL);

    let blank = Request::builder()
        .method(Method::POST)
        .uri("/api/reviews")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "place_id": "" }).to_string()))
        .expect("build request");
    let response = app.oneshot(blank).await.expect("route response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn completion_is_parsed_into_a_verdict() {
    let body = json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": "{\"score\": 9, \"summary\": \"Dedicated gluten-free kitchen.\"}"
            }
        }]
    })
    .to_string();

    let verdict = parse_completion(&body).expect("parsed");
    assert_eq!(verdict.score, Some(9.0));
    assert_eq!(verdict.summary, "Dedicated gluten-free kitchen.");
}

#[test]
fn completion_defaults_fill_missing_keys() {
    let body = json!({
        "choices": [{ "message": { "content": "{}" } }]
    })
    .to_string();

    let verdict = parse_completion(&body).expect("parsed");
    assert_eq!(verdict.score, Some(5.0));
    assert_eq!(verdict.summary, "Analysis failed.");
}

#[test]
fn completion_without_choices_is_a_decode_error() {
    let result = parse_completion(&json!({ "choices": [] }).to_string());
    assert!(matches!(
        result,
        Err(IntegrationError::Decode { service: "groq", .. })
    ));

    let result = parse_completion(
        &json!({ "choices": [{ "message": { "content": "safe enough" } }] }).to_string(),
    );
    assert!(matches!(result, Err(IntegrationError::Decode { .. })));
}

#[test]
fn prompt_lists_at_most_fifteen_reviews() {
    let reviews: Vec<ThirdPartyReview> = (0..20)
        .map(|i| review(&format!("review number {i}"), 4.0))
        .collect();

    let prompt = build_prompt(&reviews);

    assert!(prompt.starts_with("Here are the reviews:\n- review number 0"));
    assert_eq!(prompt.matches("\n- ").count(), MAX_PROMPT_REVIEWS);
    assert!(!prompt.contains("review number 15"));
}

#[test]
fn serpapi_payload_maps_onto_reviews() {
    let body = json!({
        "reviews": [
            {
                "snippet": "They have a dedicated fryer.",
                "rating": 5,
                "user": { "name": "Jo" },
                "date": "a month ago"
            },
            { "rating": 2 }
        ]
    })
    .to_string();

    let reviews = parse_reviews(&body).expect("parsed");
    assert_eq!(reviews.len(), 2);
    assert_eq!(reviews[0].text, "They have a dedicated fryer.");
    assert_eq!(reviews[0].rating, 5.0);
    assert_eq!(reviews[0].author, "Jo");
    assert_eq!(reviews[1].text, "");
    assert_eq!(reviews[1].author, "Anonymous");
}

#[test]
fn serpapi_error_payload_is_an_upstream_error() {
    let body = json!({ "error": "Invalid API key." }).to_string();
    match parse_reviews(&body) {
        Err(IntegrationError::Upstream { service, message }) => {
            assert_eq!(service, "serpapi");
            assert_eq!(message, "Invalid API key.");
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

use crate::infra::{AppState, Services};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use wisebites::analysis::{analysis_router, ReviewAnalyzer, ReviewSource};
use wisebites::community::{community_router, ProfileStore, ReviewStore};
use wisebites::places::{search_router, PlaceSearch};
use wisebites::scoring::score_router;

pub(crate) fn with_service_routes<S, R, A, P>(services: &Services<S, R, A, P>) -> Router
where
    S: ReviewStore + ProfileStore + 'static,
    R: ReviewSource + 'static,
    A: ReviewAnalyzer + 'static,
    P: PlaceSearch + 'static,
{
    community_router(services.community.clone())
        .merge(analysis_router(services.refresher.clone()))
        .merge(search_router(services.search.clone()))
        .merge(score_router(services.engine.clone()))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

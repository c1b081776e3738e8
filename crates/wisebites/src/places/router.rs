use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use tracing::error;

use super::service::{SearchError, SearchRequest, SearchService};
use super::PlaceSearch;
use crate::community::ReviewStore;
use crate::error::{error_response, rejection_response};

pub fn search_router<S, P>(service: Arc<SearchService<S, P>>) -> Router
where
    S: ReviewStore + 'static,
    P: PlaceSearch + 'static,
{
    Router::new()
        .route("/api/search", post(search_handler::<S, P>))
        .with_state(service)
}

pub(crate) async fn search_handler<S, P>(
    State(service): State<Arc<SearchService<S, P>>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Response
where
    S: ReviewStore + 'static,
    P: PlaceSearch + 'static,
{
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match service.search(request, Utc::now()).await {
        Ok(results) => (StatusCode::OK, Json(json!({ "results": results }))).into_response(),
        Err(SearchError::InvalidRequest(message)) => {
            error_response(StatusCode::BAD_REQUEST, message)
        }
        Err(err) => {
            error!(error = %err, "restaurant search failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use tracing::error;

use super::refresh::{RefreshError, ReviewLookup, ReviewRefresher};
use super::{ReviewAnalyzer, ReviewSource};
use crate::community::ReviewStore;
use crate::error::{error_response, rejection_response};

pub fn analysis_router<S, R, A>(refresher: Arc<ReviewRefresher<S, R, A>>) -> Router
where
    S: ReviewStore + 'static,
    R: ReviewSource + 'static,
    A: ReviewAnalyzer + 'static,
{
    Router::new()
        .route("/api/reviews", post(reviews_handler::<S, R, A>))
        .with_state(refresher)
}

pub(crate) async fn reviews_handler<S, R, A>(
    State(refresher): State<Arc<ReviewRefresher<S, R, A>>>,
    payload: Result<Json<ReviewLookup>, JsonRejection>,
) -> Response
where
    S: ReviewStore + 'static,
    R: ReviewSource + 'static,
    A: ReviewAnalyzer + 'static,
{
    let Json(lookup) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match refresher.refresh(lookup, Utc::now()).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(RefreshError::MissingPlaceId) => {
            error_response(StatusCode::BAD_REQUEST, RefreshError::MissingPlaceId.to_string())
        }
        Err(err) => {
            error!(error = %err, "review refresh failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use super::{ScoreEngine, ScoreInputs};
use crate::error::{error_response, rejection_response};

/// Stateless scoring endpoint: raw inputs in, full breakdown out.
pub fn score_router(engine: Arc<ScoreEngine>) -> Router {
    Router::new()
        .route("/api/score", post(score_handler))
        .with_state(engine)
}

pub(crate) async fn score_handler(
    State(engine): State<Arc<ScoreEngine>>,
    payload: Result<Json<ScoreInputs>, JsonRejection>,
) -> Response {
    let Json(inputs) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    if let Some(signal) = inputs
        .community
        .iter()
        .find(|signal| !(1..=5).contains(&signal.rating))
    {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("community rating must be between 1 and 5, got {}", signal.rating),
        );
    }

    let breakdown = engine.explain(&inputs);
    (StatusCode::OK, Json(breakdown)).into_response()
}

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use tracing::error;

use super::domain::{PlaceId, ProfileUpdate, ReviewId, ReviewSubmission, SavedList, UserId};
use super::repository::{ProfileStore, ReviewStore, StoreError};
use super::service::{CommunityError, CommunityService};
use crate::error::{error_response, rejection_response};

/// Header carrying the id of the user authenticated by the upstream gateway.
pub const USER_HEADER: &str = "x-user-id";

pub fn community_router<S>(service: Arc<CommunityService<S>>) -> Router
where
    S: ReviewStore + ProfileStore + 'static,
{
    Router::new()
        .route("/api/restaurants/:place_id", get(detail_handler::<S>))
        .route(
            "/api/restaurants/:place_id/reviews",
            post(submit_handler::<S>),
        )
        .route(
            "/api/reviews/:review_id",
            put(update_handler::<S>).delete(delete_handler::<S>),
        )
        .route("/api/me/reviews", get(my_reviews_handler::<S>))
        .route(
            "/api/me/profile",
            get(profile_handler::<S>).put(update_profile_handler::<S>),
        )
        .route("/api/me/saved/:list", get(saved_handler::<S>))
        .route(
            "/api/me/saved/:list/:place_id",
            put(save_handler::<S>).delete(unsave_handler::<S>),
        )
        .with_state(service)
}

pub(crate) fn current_user(headers: &HeaderMap) -> Result<UserId, Response> {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| UserId(value.to_string()))
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "sign in required"))
}

fn parse_list(raw: &str) -> Result<SavedList, Response> {
    raw.parse::<SavedList>()
        .map_err(|message| error_response(StatusCode::NOT_FOUND, message))
}

fn community_error_response(err: CommunityError) -> Response {
    let status = match &err {
        CommunityError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CommunityError::ReviewNotFound(_) | CommunityError::RestaurantNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        CommunityError::Forbidden(_) => StatusCode::FORBIDDEN,
        CommunityError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
        CommunityError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        CommunityError::Store(StoreError::Unavailable(_)) => {
            error!(error = %err, "community store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, err.to_string())
}

pub(crate) async fn detail_handler<S>(
    State(service): State<Arc<CommunityService<S>>>,
    Path(place_id): Path<String>,
) -> Response
where
    S: ReviewStore + ProfileStore + 'static,
{
    match service.restaurant_detail(&PlaceId(place_id)) {
        Ok(detail) => (StatusCode::OK, Json(detail)).into_response(),
        Err(err) => community_error_response(err),
    }
}

pub(crate) async fn submit_handler<S>(
    State(service): State<Arc<CommunityService<S>>>,
    Path(place_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<ReviewSubmission>, JsonRejection>,
) -> Response
where
    S: ReviewStore + ProfileStore + 'static,
{
    let user_id = match current_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let Json(submission) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.submit_review(&user_id, &PlaceId(place_id), submission, Utc::now()) {
        Ok(receipt) => {
            let status = if receipt.replaced {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            (status, Json(receipt.review)).into_response()
        }
        Err(err) => community_error_response(err),
    }
}

pub(crate) async fn update_handler<S>(
    State(service): State<Arc<CommunityService<S>>>,
    Path(review_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<ReviewSubmission>, JsonRejection>,
) -> Response
where
    S: ReviewStore + ProfileStore + 'static,
{
    let user_id = match current_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let Json(submission) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.update_review(&user_id, &ReviewId(review_id), submission, Utc::now()) {
        Ok(review) => (StatusCode::OK, Json(review)).into_response(),
        Err(err) => community_error_response(err),
    }
}

pub(crate) async fn delete_handler<S>(
    State(service): State<Arc<CommunityService<S>>>,
    Path(review_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: ReviewStore + ProfileStore + 'static,
{
    let user_id = match current_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    match service.delete_review(&user_id, &ReviewId(review_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => community_error_response(err),
    }
}

pub(crate) async fn my_reviews_handler<S>(
    State(service): State<Arc<CommunityService<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: ReviewStore + ProfileStore + 'static,
{
    let user_id = match current_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    match service.reviews_for_user(&user_id) {
        Ok(reviews) => (StatusCode::OK, Json(json!({ "reviews": reviews }))).into_response(),
        Err(err) => community_error_response(err),
    }
}

pub(crate) async fn profile_handler<S>(
    State(service): State<Arc<CommunityService<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: ReviewStore + ProfileStore + 'static,
{
    let user_id = match current_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    match service.profile(&user_id) {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(err) => community_error_response(err),
    }
}

pub(crate) async fn update_profile_handler<S>(
    State(service): State<Arc<CommunityService<S>>>,
    headers: HeaderMap,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Response
where
    S: ReviewStore + ProfileStore + 'static,
{
    let user_id = match current_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let Json(update) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.update_profile(&user_id, update, Utc::now()) {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(err) => community_error_response(err),
    }
}

pub(crate) async fn saved_handler<S>(
    State(service): State<Arc<CommunityService<S>>>,
    Path(list): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: ReviewStore + ProfileStore + 'static,
{
    let user_id = match current_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let list = match parse_list(&list) {
        Ok(list) => list,
        Err(response) => return response,
    };

    match service.saved_places(&user_id, list) {
        Ok(places) => (
            StatusCode::OK,
            Json(json!({ "list": list.label(), "places": places })),
        )
            .into_response(),
        Err(err) => community_error_response(err),
    }
}

pub(crate) async fn save_handler<S>(
    State(service): State<Arc<CommunityService<S>>>,
    Path((list, place_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response
where
    S: ReviewStore + ProfileStore + 'static,
{
    let user_id = match current_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let list = match parse_list(&list) {
        Ok(list) => list,
        Err(response) => return response,
    };

    match service.save_place(&user_id, list, &PlaceId(place_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => community_error_response(err),
    }
}

pub(crate) async fn unsave_handler<S>(
    State(service): State<Arc<CommunityService<S>>>,
    Path((list, place_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response
where
    S: ReviewStore + ProfileStore + 'static,
{
    let user_id = match current_user(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    let list = match parse_list(&list) {
        Ok(list) => list,
        Err(response) => return response,
    };

    match service.remove_saved_place(&user_id, list, &PlaceId(place_id)) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => community_error_response(err),
    }
}

use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::community::domain::{
    CommunityReview, PlaceId, Restaurant, ReviewId, ReviewSubmission, SafetyFlags, SavedList,
    UserId, UserProfile,
};
use crate::community::repository::{ProfileStore, ReviewStore, StoreError};
use crate::community::{community_router, CommunityService, InMemoryStore};
use crate::scoring::ScoreEngine;

pub(super) const PLACE: &str = "ChIJ-gf-bistro";

pub(super) fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn place() -> PlaceId {
    PlaceId(PLACE.to_string())
}

pub(super) fn user(id: &str) -> UserId {
    UserId(id.to_string())
}

/// Analysed restaurant: AI 8.0, five relevant reviews averaging 4.2.
pub(super) fn analysed_restaurant() -> Restaurant {
    let mut restaurant = Restaurant::new(place(), "Gluten Free Bistro", "12 Peach St, Atlanta, GA 30308");
    restaurant.city = Some("Atlanta, GA".to_string());
    restaurant.rating = 4.6;
    restaurant.ai_safety_score = Some(8.0);
    restaurant.ai_summary = Some("Dedicated fryer and trained staff.".to_string());
    restaurant.relevant_count = 5;
    restaurant.average_safety_rating = 4.2;
    restaurant.wise_bites_score = Some(8.1);
    restaurant.last_analyzed = Some(at(1, 9));
    restaurant
}

pub(super) fn submission(rating: u8, felt_safe: bool) -> ReviewSubmission {
    ReviewSubmission {
        rating,
        comment: Some("  Staff knew exactly what cross-contact means.  ".to_string()),
        images: Vec::new(),
        flags: SafetyFlags {
            has_gf_menu: true,
            staff_knowledgeable: true,
            has_dedicated_fryer: false,
            felt_safe,
            dedicated_gluten_free: false,
        },
    }
}

pub(super) fn build_service() -> (CommunityService<InMemoryStore>, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::default());
    store
        .upsert_restaurant(analysed_restaurant())
        .expect("seed restaurant");
    let service = CommunityService::new(store.clone(), Arc::new(ScoreEngine::default()));
    (service, store)
}

pub(super) fn router_with_service(service: CommunityService<InMemoryStore>) -> axum::Router {
    community_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Store whose every call fails, for error-path coverage.
pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, StoreError> {
    Err(StoreError::Unavailable("database offline".to_string()))
}

impl ReviewStore for UnavailableStore {
    fn upsert_restaurant(&self, _restaurant: Restaurant) -> Result<Restaurant, StoreError> {
        offline()
    }

    fn restaurant(&self, _place_id: &PlaceId) -> Result<Option<Restaurant>, StoreError> {
        offline()
    }

    fn restaurants(&self, _place_ids: &[PlaceId]) -> Result<Vec<Restaurant>, StoreError> {
        offline()
    }

    fn insert_review(&self, _review: CommunityReview) -> Result<CommunityReview, StoreError> {
        offline()
    }

    fn replace_review(&self, _review: CommunityReview) -> Result<(), StoreError> {
        offline()
    }

    fn review(&self, _id: &ReviewId) -> Result<Option<CommunityReview>, StoreError> {
        offline()
    }

    fn review_by_author(
        &self,
        _user_id: &UserId,
        _place_id: &PlaceId,
    ) -> Result<Option<CommunityReview>, StoreError> {
        offline()
    }

    fn delete_review(&self, _id: &ReviewId) -> Result<CommunityReview, StoreError> {
        offline()
    }

    fn reviews_for_place(&self, _place_id: &PlaceId) -> Result<Vec<CommunityReview>, StoreError> {
        offline()
    }

    fn reviews_by_user(&self, _user_id: &UserId) -> Result<Vec<CommunityReview>, StoreError> {
        offline()
    }
}

impl ProfileStore for UnavailableStore {
    fn profile(&self, _user_id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        offline()
    }

    fn profiles(&self, _user_ids: &[UserId]) -> Result<Vec<UserProfile>, StoreError> {
        offline()
    }

    fn save_profile(&self, _profile: UserProfile) -> Result<UserProfile, StoreError> {
        offline()
    }

    fn saved_places(&self, _user_id: &UserId, _list: SavedList) -> Result<Vec<PlaceId>, StoreError> {
        offline()
    }

    fn save_place(
        &self,
        _user_id: &UserId,
        _list: SavedList,
        _place_id: &PlaceId,
    ) -> Result<(), StoreError> {
        offline()
    }

    fn remove_saved_place(
        &self,
        _user_id: &UserId,
        _list: SavedList,
        _place_id: &PlaceId,
    ) -> Result<bool, StoreError> {
        offline()
    }
}

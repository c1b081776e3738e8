//! Community reviews, user profiles, and saved restaurant lists.
//!
//! Restaurants are keyed by their external place id. Reviews are unique per
//! (user, place); submitting twice replaces the first review, and every mutation
//! refreshes the restaurant's cached composite score.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    CommunityReview, CommunitySummary, DietaryPreference, PlaceId, ProfileUpdate, ProfileView,
    Restaurant, RestaurantDetail, ReviewId, ReviewSubmission, ReviewValidationError, ReviewView,
    SafetyFlags, SavedList, SavedPlaceView, StarRating, ThirdPartyReview, UserId, UserProfile,
    UserReviewView,
};
pub use repository::{ProfileStore, ReviewStore, StoreError};
pub use router::{community_router, USER_HEADER};
pub use service::{CommunityError, CommunityService, ReviewReceipt};
pub use store::InMemoryStore;

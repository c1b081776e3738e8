use super::domain::{
    CommunityReview, PlaceId, Restaurant, ReviewId, SavedList, UserId, UserProfile,
};

/// Storage for restaurant records and community reviews.
///
/// Implementations must reject a second review for the same (user, place) pair
/// with [`StoreError::Conflict`].
pub trait ReviewStore: Send + Sync {
    fn upsert_restaurant(&self, restaurant: Restaurant) -> Result<Restaurant, StoreError>;
    fn restaurant(&self, place_id: &PlaceId) -> Result<Option<Restaurant>, StoreError>;
    fn restaurants(&self, place_ids: &[PlaceId]) -> Result<Vec<Restaurant>, StoreError>;

    fn insert_review(&self, review: CommunityReview) -> Result<CommunityReview, StoreError>;
    fn replace_review(&self, review: CommunityReview) -> Result<(), StoreError>;
    fn review(&self, id: &ReviewId) -> Result<Option<CommunityReview>, StoreError>;
    fn review_by_author(
        &self,
        user_id: &UserId,
        place_id: &PlaceId,
    ) -> Result<Option<CommunityReview>, StoreError>;
    fn delete_review(&self, id: &ReviewId) -> Result<CommunityReview, StoreError>;
    /// Newest first.
    fn reviews_for_place(&self, place_id: &PlaceId) -> Result<Vec<CommunityReview>, StoreError>;
    /// Newest first.
    fn reviews_by_user(&self, user_id: &UserId) -> Result<Vec<CommunityReview>, StoreError>;
}

/// Storage for user profiles and saved restaurant lists.
pub trait ProfileStore: Send + Sync {
    fn profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError>;
    fn profiles(&self, user_ids: &[UserId]) -> Result<Vec<UserProfile>, StoreError>;
    fn save_profile(&self, profile: UserProfile) -> Result<UserProfile, StoreError>;

    fn saved_places(&self, user_id: &UserId, list: SavedList) -> Result<Vec<PlaceId>, StoreError>;
    fn save_place(
        &self,
        user_id: &UserId,
        list: SavedList,
        place_id: &PlaceId,
    ) -> Result<(), StoreError>;
    /// Returns whether the place was on the list.
    fn remove_saved_place(
        &self,
        user_id: &UserId,
        list: SavedList,
        place_id: &PlaceId,
    ) -> Result<bool, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

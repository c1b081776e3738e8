use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::domain::{
    CommunityReview, CommunitySummary, PlaceId, ProfileUpdate, ProfileView, RestaurantDetail,
    ReviewDraft, ReviewId, ReviewSubmission, ReviewValidationError, ReviewView, SavedList,
    SavedPlaceView, UserId, UserProfile, UserReviewView,
};
use super::repository::{ProfileStore, ReviewStore, StoreError};
use crate::scoring::{SafetyBand, ScoreEngine};

/// Review, profile, and saved-list operations on top of a store.
pub struct CommunityService<S> {
    store: Arc<S>,
    engine: Arc<ScoreEngine>,
}

static REVIEW_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_review_id() -> ReviewId {
    let id = REVIEW_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReviewId(format!("rev-{id:06}"))
}

/// Result of a submission: the stored review and whether it replaced an earlier one.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewReceipt {
    pub review: CommunityReview,
    pub replaced: bool,
}

impl<S> CommunityService<S>
where
    S: ReviewStore + ProfileStore + 'static,
{
    pub fn new(store: Arc<S>, engine: Arc<ScoreEngine>) -> Self {
        Self { store, engine }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Create the author's review for a place, or replace the one they already wrote.
    pub fn submit_review(
        &self,
        user_id: &UserId,
        place_id: &PlaceId,
        submission: ReviewSubmission,
        now: DateTime<Utc>,
    ) -> Result<ReviewReceipt, CommunityError> {
        let draft = submission.validate()?;

        let receipt = match self.store.review_by_author(user_id, place_id)? {
            Some(existing) => {
                let review = apply_draft(existing, draft, now);
                self.store.replace_review(review.clone())?;
                ReviewReceipt {
                    review,
                    replaced: true,
                }
            }
            None => {
                let review = CommunityReview {
                    id: next_review_id(),
                    place_id: place_id.clone(),
                    user_id: user_id.clone(),
                    rating: draft.rating,
                    comment: draft.comment,
                    images: draft.images,
                    flags: draft.flags,
                    created_at: now,
                    updated_at: now,
                };
                let review = self.store.insert_review(review)?;
                ReviewReceipt {
                    review,
                    replaced: false,
                }
            }
        };

        self.refresh_score(place_id)?;
        Ok(receipt)
    }

    /// Full replace of an existing review by its author.
    pub fn update_review(
        &self,
        user_id: &UserId,
        review_id: &ReviewId,
        submission: ReviewSubmission,
        now: DateTime<Utc>,
    ) -> Result<CommunityReview, CommunityError> {
        let draft = submission.validate()?;
        let existing = self.owned_review(user_id, review_id)?;
        let place_id = existing.place_id.clone();

        let review = apply_draft(existing, draft, now);
        self.store.replace_review(review.clone())?;
        self.refresh_score(&place_id)?;
        Ok(review)
    }

    pub fn delete_review(
        &self,
        user_id: &UserId,
        review_id: &ReviewId,
    ) -> Result<(), CommunityError> {
        let existing = self.owned_review(user_id, review_id)?;
        self.store.delete_review(&existing.id)?;
        self.refresh_score(&existing.place_id)?;
        Ok(())
    }

    pub fn reviews_for_user(&self, user_id: &UserId) -> Result<Vec<UserReviewView>, CommunityError> {
        let reviews = self.store.reviews_by_user(user_id)?;
        let place_ids: Vec<PlaceId> = reviews.iter().map(|review| review.place_id.clone()).collect();
        let restaurants: HashMap<PlaceId, _> = self
            .store
            .restaurants(&place_ids)?
            .into_iter()
            .map(|restaurant| (restaurant.place_id.clone(), restaurant))
            .collect();

        Ok(reviews
            .into_iter()
            .map(|review| {
                let restaurant = restaurants.get(&review.place_id);
                UserReviewView {
                    restaurant_name: restaurant.map(|r| r.name.clone()),
                    city: restaurant.and_then(|r| r.city.clone()),
                    address: restaurant.map(|r| r.address.clone()),
                    review,
                }
            })
            .collect())
    }

    pub fn restaurant_detail(&self, place_id: &PlaceId) -> Result<RestaurantDetail, CommunityError> {
        let restaurant = self
            .store
            .restaurant(place_id)?
            .ok_or_else(|| CommunityError::RestaurantNotFound(place_id.clone()))?;
        let reviews = self.store.reviews_for_place(place_id)?;

        let breakdown = self.engine.explain(&restaurant.score_inputs(&reviews));
        let community = CommunitySummary::from_reviews(&reviews);

        let author_ids: Vec<UserId> = reviews.iter().map(|review| review.user_id.clone()).collect();
        let preferences: HashMap<UserId, _> = self
            .store
            .profiles(&author_ids)?
            .into_iter()
            .map(|profile| (profile.user_id, profile.dietary_preference))
            .collect();

        let reviews = reviews
            .into_iter()
            .map(|review| ReviewView {
                author_preference: preferences.get(&review.user_id).copied().flatten(),
                review,
            })
            .collect();

        Ok(RestaurantDetail {
            restaurant,
            score: breakdown.score,
            band: breakdown.score.map(SafetyBand::from_score),
            community,
            reviews,
        })
    }

    /// Recompute and cache the composite score. No-op for places never analysed.
    pub fn refresh_score(&self, place_id: &PlaceId) -> Result<Option<f64>, CommunityError> {
        let Some(mut restaurant) = self.store.restaurant(place_id)? else {
            debug!(place_id = %place_id, "no restaurant record; skipping score refresh");
            return Ok(None);
        };

        let reviews = self.store.reviews_for_place(place_id)?;
        let score = self.engine.score(&restaurant.score_inputs(&reviews));
        if restaurant.wise_bites_score != score {
            restaurant.wise_bites_score = score;
            self.store.upsert_restaurant(restaurant)?;
        }
        Ok(score)
    }

    pub fn profile(&self, user_id: &UserId) -> Result<ProfileView, CommunityError> {
        let profile = self
            .store
            .profile(user_id)?
            .unwrap_or_else(|| UserProfile::empty(user_id.clone()));
        Ok(ProfileView {
            complete: profile.is_complete(),
            profile,
        })
    }

    pub fn update_profile(
        &self,
        user_id: &UserId,
        update: ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<ProfileView, CommunityError> {
        let mut profile = self
            .store
            .profile(user_id)?
            .unwrap_or_else(|| UserProfile::empty(user_id.clone()));

        profile.full_name = update
            .full_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        profile.birthday = update.birthday;
        profile.dietary_preference = update.dietary_preference;
        profile.updated_at = Some(now);

        let profile = self.store.save_profile(profile)?;
        Ok(ProfileView {
            complete: profile.is_complete(),
            profile,
        })
    }

    pub fn saved_places(
        &self,
        user_id: &UserId,
        list: SavedList,
    ) -> Result<Vec<SavedPlaceView>, CommunityError> {
        let place_ids = self.store.saved_places(user_id, list)?;
        let mut restaurants: HashMap<PlaceId, _> = self
            .store
            .restaurants(&place_ids)?
            .into_iter()
            .map(|restaurant| (restaurant.place_id.clone(), restaurant))
            .collect();

        Ok(place_ids
            .into_iter()
            .map(|place_id| SavedPlaceView {
                restaurant: restaurants.remove(&place_id),
                place_id,
            })
            .collect())
    }

    /// A place lives on at most one list; saving it moves it off the other.
    pub fn save_place(
        &self,
        user_id: &UserId,
        list: SavedList,
        place_id: &PlaceId,
    ) -> Result<(), CommunityError> {
        self.store
            .remove_saved_place(user_id, list.opposite(), place_id)?;
        self.store.save_place(user_id, list, place_id)?;
        Ok(())
    }

    pub fn remove_saved_place(
        &self,
        user_id: &UserId,
        list: SavedList,
        place_id: &PlaceId,
    ) -> Result<bool, CommunityError> {
        Ok(self.store.remove_saved_place(user_id, list, place_id)?)
    }

    fn owned_review(
        &self,
        user_id: &UserId,
        review_id: &ReviewId,
    ) -> Result<CommunityReview, CommunityError> {
        let review = self
            .store
            .review(review_id)?
            .ok_or_else(|| CommunityError::ReviewNotFound(review_id.clone()))?;
        if &review.user_id != user_id {
            return Err(CommunityError::Forbidden(review_id.clone()));
        }
        Ok(review)
    }
}

fn apply_draft(
    mut review: CommunityReview,
    draft: ReviewDraft,
    now: DateTime<Utc>,
) -> CommunityReview {
    review.rating = draft.rating;
    review.comment = draft.comment;
    review.images = draft.images;
    review.flags = draft.flags;
    review.updated_at = now;
    review
}

/// Error raised by the community service.
#[derive(Debug, thiserror::Error)]
pub enum CommunityError {
    #[error(transparent)]
    Validation(#[from] ReviewValidationError),
    #[error("review {0} not found")]
    ReviewNotFound(ReviewId),
    #[error("restaurant {0} not found")]
    RestaurantNotFound(PlaceId),
    #[error("review {0} belongs to another user")]
    Forbidden(ReviewId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

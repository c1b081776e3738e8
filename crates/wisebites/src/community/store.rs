use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    CommunityReview, PlaceId, Restaurant, ReviewId, SavedList, UserId, UserProfile,
};
use super::repository::{ProfileStore, ReviewStore, StoreError};

#[derive(Default)]
struct StoreState {
    restaurants: HashMap<PlaceId, Restaurant>,
    reviews: HashMap<ReviewId, CommunityReview>,
    authored: HashMap<(UserId, PlaceId), ReviewId>,
    profiles: HashMap<UserId, UserProfile>,
    saved: HashMap<(UserId, SavedList), Vec<PlaceId>>,
}

/// Process-local store backing both store traits. Clones share state.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    fn state(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }
}

fn newest_first(mut reviews: Vec<CommunityReview>) -> Vec<CommunityReview> {
    reviews.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.0.cmp(&a.id.0))
    });
    reviews
}

impl ReviewStore for InMemoryStore {
    fn upsert_restaurant(&self, restaurant: Restaurant) -> Result<Restaurant, StoreError> {
        let mut state = self.state()?;
        state
            .restaurants
            .insert(restaurant.place_id.clone(), restaurant.clone());
        Ok(restaurant)
    }

    fn restaurant(&self, place_id: &PlaceId) -> Result<Option<Restaurant>, StoreError> {
        Ok(self.state()?.restaurants.get(place_id).cloned())
    }

    fn restaurants(&self, place_ids: &[PlaceId]) -> Result<Vec<Restaurant>, StoreError> {
        let state = self.state()?;
        Ok(place_ids
            .iter()
            .filter_map(|place_id| state.restaurants.get(place_id).cloned())
            .collect())
    }

    fn insert_review(&self, review: CommunityReview) -> Result<CommunityReview, StoreError> {
        let mut state = self.state()?;
        let key = (review.user_id.clone(), review.place_id.clone());
        if state.authored.contains_key(&key) || state.reviews.contains_key(&review.id) {
            return Err(StoreError::Conflict);
        }
        state.authored.insert(key, review.id.clone());
        state.reviews.insert(review.id.clone(), review.clone());
        Ok(review)
    }

    fn replace_review(&self, review: CommunityReview) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let previous_key = match state.reviews.get(&review.id) {
            Some(existing) => (existing.user_id.clone(), existing.place_id.clone()),
            None => return Err(StoreError::NotFound),
        };

        let key = (review.user_id.clone(), review.place_id.clone());
        if key != previous_key {
            if state.authored.contains_key(&key) {
                return Err(StoreError::Conflict);
            }
            state.authored.remove(&previous_key);
            state.authored.insert(key, review.id.clone());
        }

        state.reviews.insert(review.id.clone(), review);
        Ok(())
    }

    fn review(&self, id: &ReviewId) -> Result<Option<CommunityReview>, StoreError> {
        Ok(self.state()?.reviews.get(id).cloned())
    }

    fn review_by_author(
        &self,
        user_id: &UserId,
        place_id: &PlaceId,
    ) -> Result<Option<CommunityReview>, StoreError> {
        let state = self.state()?;
        let key = (user_id.clone(), place_id.clone());
        Ok(state
            .authored
            .get(&key)
            .and_then(|id| state.reviews.get(id))
            .cloned())
    }

    fn delete_review(&self, id: &ReviewId) -> Result<CommunityReview, StoreError> {
        let mut state = self.state()?;
        let removed = state.reviews.remove(id).ok_or(StoreError::NotFound)?;
        state
            .authored
            .remove(&(removed.user_id.clone(), removed.place_id.clone()));
        Ok(removed)
    }

    fn reviews_for_place(&self, place_id: &PlaceId) -> Result<Vec<CommunityReview>, StoreError> {
        let state = self.state()?;
        let reviews = state
            .reviews
            .values()
            .filter(|review| &review.place_id == place_id)
            .cloned()
            .collect();
        Ok(newest_first(reviews))
    }

    fn reviews_by_user(&self, user_id: &UserId) -> Result<Vec<CommunityReview>, StoreError> {
        let state = self.state()?;
        let reviews = state
            .reviews
            .values()
            .filter(|review| &review.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(reviews))
    }
}

impl ProfileStore for InMemoryStore {
    fn profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.state()?.profiles.get(user_id).cloned())
    }

    fn profiles(&self, user_ids: &[UserId]) -> Result<Vec<UserProfile>, StoreError> {
        let state = self.state()?;
        Ok(user_ids
            .iter()
            .filter_map(|user_id| state.profiles.get(user_id).cloned())
            .collect())
    }

    fn save_profile(&self, profile: UserProfile) -> Result<UserProfile, StoreError> {
        let mut state = self.state()?;
        state
            .profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(profile)
    }

    fn saved_places(&self, user_id: &UserId, list: SavedList) -> Result<Vec<PlaceId>, StoreError> {
        let state = self.state()?;
        Ok(state
            .saved
            .get(&(user_id.clone(), list))
            .cloned()
            .unwrap_or_default())
    }

    fn save_place(
        &self,
        user_id: &UserId,
        list: SavedList,
        place_id: &PlaceId,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let entries = state.saved.entry((user_id.clone(), list)).or_default();
        if !entries.contains(place_id) {
            entries.push(place_id.clone());
        }
        Ok(())
    }

    fn remove_saved_place(
        &self,
        user_id: &UserId,
        list: SavedList,
        place_id: &PlaceId,
    ) -> Result<bool, StoreError> {
        let mut state = self.state()?;
        let Some(entries) = state.saved.get_mut(&(user_id.clone(), list)) else {
            return Ok(false);
        };
        let before = entries.len();
        entries.retain(|entry| entry != place_id);
        Ok(entries.len() != before)
    }
}

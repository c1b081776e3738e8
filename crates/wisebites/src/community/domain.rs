use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::{round_to, ReviewSignal, SafetyBand, ScoreInputs};

/// External place identifier (Google place id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaceId(pub String);

/// Authenticated user identifier supplied by the upstream auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewId(pub String);

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Star rating constrained to 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StarRating(u8);

impl StarRating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for StarRating {
    type Error = ReviewValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ReviewValidationError::RatingOutOfRange(value))
        }
    }
}

impl From<StarRating> for u8 {
    fn from(value: StarRating) -> Self {
        value.0
    }
}

/// Structured gluten-safety answers attached to a community review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyFlags {
    pub has_gf_menu: bool,
    pub staff_knowledgeable: bool,
    pub has_dedicated_fryer: bool,
    pub felt_safe: bool,
    pub dedicated_gluten_free: bool,
}

/// Ingested review from an external source. Read-only for this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThirdPartyReview {
    pub source: String,
    pub text: String,
    pub rating: f64,
    pub author: String,
    /// Relative date as published by the source ("3 weeks ago").
    pub date: String,
}

/// Cached restaurant record with its aggregated review signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub place_id: PlaceId,
    pub name: String,
    pub address: String,
    pub city: Option<String>,
    pub rating: f64,
    pub ai_safety_score: Option<f64>,
    pub ai_summary: Option<String>,
    pub relevant_count: u32,
    pub average_safety_rating: f64,
    pub wise_bites_score: Option<f64>,
    #[serde(default)]
    pub reviews: Vec<ThirdPartyReview>,
    pub last_analyzed: Option<DateTime<Utc>>,
}

impl Restaurant {
    pub fn new(place_id: PlaceId, name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            place_id,
            name: name.into(),
            address: address.into(),
            city: None,
            rating: 0.0,
            ai_safety_score: None,
            ai_summary: None,
            relevant_count: 0,
            average_safety_rating: 0.0,
            wise_bites_score: None,
            reviews: Vec::new(),
            last_analyzed: None,
        }
    }

    /// Whether the AI analysis is recent enough to serve without recomputing.
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.last_analyzed
            .map(|analyzed| now - analyzed < window)
            .unwrap_or(false)
    }

    pub fn score_inputs(&self, community: &[CommunityReview]) -> ScoreInputs {
        ScoreInputs {
            ai_score: self.ai_safety_score,
            relevant_count: Some(self.relevant_count),
            average_rating: self.average_safety_rating,
            community: community.iter().map(CommunityReview::signal).collect(),
        }
    }
}

/// A review written by a platform user. One per (user, place).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityReview {
    pub id: ReviewId,
    pub place_id: PlaceId,
    pub user_id: UserId,
    pub rating: StarRating,
    pub comment: Option<String>,
    pub images: Vec<String>,
    pub flags: SafetyFlags,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommunityReview {
    pub fn signal(&self) -> ReviewSignal {
        ReviewSignal {
            rating: self.rating.value(),
            felt_safe: self.flags.felt_safe,
        }
    }
}

/// Raw review payload as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSubmission {
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub flags: SafetyFlags,
}

/// Submission that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewDraft {
    pub rating: StarRating,
    pub comment: Option<String>,
    pub images: Vec<String>,
    pub flags: SafetyFlags,
}

pub const MAX_REVIEW_IMAGES: usize = 4;
pub const MAX_COMMENT_CHARS: usize = 2000;

impl ReviewSubmission {
    pub fn validate(self) -> Result<ReviewDraft, ReviewValidationError> {
        let rating = StarRating::try_from(self.rating)?;

        let comment = self
            .comment
            .map(|comment| comment.trim().to_string())
            .filter(|comment| !comment.is_empty());
        if let Some(comment) = &comment {
            let chars = comment.chars().count();
            if chars > MAX_COMMENT_CHARS {
                return Err(ReviewValidationError::CommentTooLong { chars });
            }
        }

        let images: Vec<String> = self
            .images
            .into_iter()
            .map(|image| image.trim().to_string())
            .filter(|image| !image.is_empty())
            .collect();
        if images.len() > MAX_REVIEW_IMAGES {
            return Err(ReviewValidationError::TooManyImages {
                count: images.len(),
            });
        }

        Ok(ReviewDraft {
            rating,
            comment,
            images,
            flags: self.flags,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReviewValidationError {
    #[error("rating must be between 1 and 5 stars, got {0}")]
    RatingOutOfRange(u8),
    #[error("comment is {chars} characters; the limit is 2000")]
    CommentTooLong { chars: usize },
    #[error("{count} images attached; at most 4 are allowed")]
    TooManyImages { count: usize },
}

/// Gluten-related dietary need recorded on a user's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietaryPreference {
    Celiac,
    Intolerance,
    Allergy,
    Other,
}

impl DietaryPreference {
    pub const fn label(self) -> &'static str {
        match self {
            DietaryPreference::Celiac => "Celiac Disease",
            DietaryPreference::Intolerance => "Gluten Intolerant",
            DietaryPreference::Allergy => "Wheat Allergy",
            DietaryPreference::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub full_name: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub dietary_preference: Option<DietaryPreference>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            full_name: None,
            birthday: None,
            dietary_preference: None,
            updated_at: None,
        }
    }

    /// Profiles without a dietary preference still need onboarding.
    pub fn is_complete(&self) -> bool {
        self.dietary_preference.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
    #[serde(default)]
    pub dietary_preference: Option<DietaryPreference>,
}

/// Per-user list of saved restaurants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavedList {
    Favorites,
    Dislikes,
}

impl SavedList {
    pub const fn label(self) -> &'static str {
        match self {
            SavedList::Favorites => "favorites",
            SavedList::Dislikes => "dislikes",
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            SavedList::Favorites => SavedList::Dislikes,
            SavedList::Dislikes => SavedList::Favorites,
        }
    }
}

impl FromStr for SavedList {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "favorites" | "favourites" => Ok(SavedList::Favorites),
            "dislikes" => Ok(SavedList::Dislikes),
            other => Err(format!("unknown saved list '{other}'")),
        }
    }
}

/// Tallies of the structured safety answers across a restaurant's community reviews.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub review_count: usize,
    pub average_rating: Option<f64>,
    pub gf_menu_reports: usize,
    pub knowledgeable_staff_reports: usize,
    pub dedicated_fryer_reports: usize,
    pub felt_safe_reports: usize,
    pub felt_unsafe_reports: usize,
    pub dedicated_gluten_free_reports: usize,
    /// True when a strict majority of reviewers report a fully gluten-free kitchen.
    pub dedicated_gluten_free: bool,
}

impl CommunitySummary {
    pub fn from_reviews(reviews: &[CommunityReview]) -> Self {
        let count_where = |predicate: fn(&SafetyFlags) -> bool| {
            reviews
                .iter()
                .filter(|review| predicate(&review.flags))
                .count()
        };

        let review_count = reviews.len();
        let average_rating = if review_count == 0 {
            None
        } else {
            let total: u32 = reviews
                .iter()
                .map(|review| u32::from(review.rating.value()))
                .sum();
            Some(round_to(f64::from(total) / review_count as f64, 1))
        };

        let felt_safe_reports = count_where(|flags| flags.felt_safe);
        let dedicated_gluten_free_reports = count_where(|flags| flags.dedicated_gluten_free);

        Self {
            review_count,
            average_rating,
            gf_menu_reports: count_where(|flags| flags.has_gf_menu),
            knowledgeable_staff_reports: count_where(|flags| flags.staff_knowledgeable),
            dedicated_fryer_reports: count_where(|flags| flags.has_dedicated_fryer),
            felt_safe_reports,
            felt_unsafe_reports: review_count - felt_safe_reports,
            dedicated_gluten_free_reports,
            dedicated_gluten_free: review_count > 0
                && dedicated_gluten_free_reports * 2 > review_count,
        }
    }
}

/// Community review joined with the author's dietary preference, when known.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: CommunityReview,
    pub author_preference: Option<DietaryPreference>,
}

/// A user's own review joined with the reviewed restaurant's details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserReviewView {
    #[serde(flatten)]
    pub review: CommunityReview,
    pub restaurant_name: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
}

/// Everything the restaurant page needs in one payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestaurantDetail {
    pub restaurant: Restaurant,
    pub score: Option<f64>,
    pub band: Option<SafetyBand>,
    pub community: CommunitySummary,
    pub reviews: Vec<ReviewView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub complete: bool,
}

/// Saved list entry; the restaurant is absent if it was never analysed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedPlaceView {
    pub place_id: PlaceId,
    pub restaurant: Option<Restaurant>,
}

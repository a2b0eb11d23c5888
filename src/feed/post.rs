//! Feed post domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::CompanionReply;

// ============================================================================
// Categories and workout metadata
// ============================================================================

/// Broad workout category a post can be tagged with.
///
/// Categories drive companion routing: each companion character claims
/// one or more categories as specialties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostCategory {
    Strength,
    Cardio,
    Yoga,
    Nutrition,
    Recovery,
    Milestone,
}

/// Structured workout details attached to a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutMeta {
    /// Activity name as the author entered it ("Leg day", "Tempo run").
    pub activity: String,
    /// Session length in minutes.
    pub duration_min: u32,
    /// Estimated energy burned, when the author tracked it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<u32>,
    /// Distance covered in kilometers, for distance-based activities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl WorkoutMeta {
    /// Create workout metadata with just an activity and duration.
    pub fn new(activity: &str, duration_min: u32) -> Self {
        Self {
            activity: activity.to_string(),
            duration_min,
            calories: None,
            distance_km: None,
        }
    }

    /// Attach a calorie estimate.
    pub fn with_calories(mut self, calories: u32) -> Self {
        self.calories = Some(calories);
        self
    }

    /// Attach a distance in kilometers.
    pub fn with_distance(mut self, distance_km: f64) -> Self {
        self.distance_km = Some(distance_km);
        self
    }

    /// One-line summary used in generation prompts and list cells,
    /// e.g. `Leg day — 45 min · 520 kcal`.
    pub fn summary(&self) -> String {
        let mut summary = format!("{} — {} min", self.activity, self.duration_min);
        if let Some(distance_km) = self.distance_km {
            summary.push_str(&format!(" · {distance_km:.1} km"));
        }
        if let Some(calories) = self.calories {
            summary.push_str(&format!(" · {calories} kcal"));
        }
        summary
    }
}

// ============================================================================
// Post
// ============================================================================

/// A single post on the social feed.
///
/// Posts are plain values; the owning collection is
/// [`FeedStore`](crate::feed::FeedStore) and counters change only
/// through its update operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Unique post id. Minted locally for drafts, supplied by the
    /// backend for synced posts.
    pub id: String,
    /// Display name of the author.
    pub author: String,
    /// Post body text.
    pub content: String,
    /// Like count.
    pub likes: u32,
    /// Comment count.
    pub comments: u32,
    /// Attached photo, when the author added one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Creation time, UTC.
    pub created_at: DateTime<Utc>,
    /// Workout category, when the author tagged one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<PostCategory>,
    /// Structured workout details, when tracked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workout: Option<WorkoutMeta>,
    /// Companion reply computed upstream (e.g. server-side), if any.
    /// Seeding it into the cache is explicit, never automatic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset_reply: Option<CompanionReply>,
}

impl Post {
    /// Create a fresh post with a minted id and the current time.
    pub fn new(author: &str, content: &str) -> Self {
        Self::new_with_id(&Uuid::new_v4().to_string(), author, content)
    }

    /// Create a post under an existing id, e.g. one assigned by the
    /// backend.
    pub fn new_with_id(id: &str, author: &str, content: &str) -> Self {
        Self {
            id: id.to_string(),
            author: author.to_string(),
            content: content.to_string(),
            likes: 0,
            comments: 0,
            image_url: None,
            created_at: Utc::now(),
            category: None,
            workout: None,
            preset_reply: None,
        }
    }

    /// Tag the post with a workout category.
    pub fn with_category(mut self, category: PostCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Attach structured workout details.
    pub fn with_workout(mut self, workout: WorkoutMeta) -> Self {
        self.workout = Some(workout);
        self
    }

    /// Attach a photo URL.
    pub fn with_image(mut self, image_url: &str) -> Self {
        self.image_url = Some(image_url.to_string());
        self
    }

    /// Backdate the post. Sample feeds and tests use this to get
    /// realistic timestamps.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Attach an upstream-computed companion reply.
    pub fn with_preset_reply(mut self, reply: CompanionReply) -> Self {
        self.preset_reply = Some(reply);
        self
    }

    /// Compact age label for feed cells: `just now`, `12m`, `3h`,
    /// `2d`, `5w`.
    pub fn relative_age(&self) -> String {
        age_label(self.created_at, Utc::now())
    }
}

/// Render the distance between `created` and `now` as a compact label.
///
/// Future timestamps (clock skew between device and backend) collapse
/// to `just now` rather than going negative.
fn age_label(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(created);
    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = elapsed.num_hours();
    if hours < 24 {
        return format!("{hours}h");
    }
    let days = elapsed.num_days();
    if days < 7 {
        return format!("{days}d");
    }
    format!("{}w", days / 7)
}

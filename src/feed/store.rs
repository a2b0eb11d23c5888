//! Owning collection for feed posts.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::CompanionReply;
use crate::feed::{Post, PostCategory, WorkoutMeta};

/// In-memory feed, newest post first, one post per id.
///
/// `FeedStore` is a cheap clone-handle over shared state: clone it
/// freely and hand copies to whatever needs the feed. All mutation
/// goes through the explicit update operations here so counters never
/// drift between holders.
#[derive(Debug, Clone, Default)]
pub struct FeedStore {
    posts: Arc<RwLock<Vec<Post>>>,
}

impl FeedStore {
    /// Create an empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a feed from existing posts, sorted newest first.
    /// Duplicate ids collapse to the newest copy.
    pub fn with_posts(mut posts: Vec<Post>) -> Self {
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let mut seen = HashSet::new();
        posts.retain(|post| seen.insert(post.id.clone()));
        Self {
            posts: Arc::new(RwLock::new(posts)),
        }
    }

    /// A small seeded feed for demos and previews.
    ///
    /// One post carries an upstream-computed companion reply so the
    /// cache seeding path has something to pick up.
    pub fn sample() -> Self {
        let now = Utc::now();
        let posts = vec![
            Post::new_with_id("sample-squat-pr", "Jordan", "New squat PR: 140kg for a double. Been chasing this for months.")
                .with_category(PostCategory::Strength)
                .with_workout(WorkoutMeta::new("Leg day", 65).with_calories(520))
                .with_created_at(now - Duration::minutes(18)),
            Post::new_with_id("sample-tempo-run", "Priya", "Tempo Tuesday in the rain. Legs felt heavy but held the pace.")
                .with_category(PostCategory::Cardio)
                .with_workout(WorkoutMeta::new("Tempo run", 38).with_distance(8.2).with_calories(410))
                .with_image("https://cdn.spotter.app/feed/tempo-run.jpg")
                .with_created_at(now - Duration::hours(3)),
            Post::new_with_id("sample-sunrise-flow", "Mateo", "Sunrise flow on the balcony. Hips finally opening up again.")
                .with_category(PostCategory::Yoga)
                .with_workout(WorkoutMeta::new("Vinyasa flow", 30))
                .with_created_at(now - Duration::hours(9)),
            Post::new_with_id("sample-meal-prep", "Elena", "Sunday meal prep: five days of lunches in ninety minutes.")
                .with_category(PostCategory::Nutrition)
                .with_preset_reply(CompanionReply::new(
                    "sample-meal-prep",
                    "sage",
                    "Five lunches banked is five good decisions already made. Nice work.",
                ))
                .with_created_at(now - Duration::days(1)),
            Post::new_with_id("sample-hundred-days", "Chris", "Day 100 of showing up. Started with ten minute walks, today I ran my first full 5k.")
                .with_category(PostCategory::Milestone)
                .with_created_at(now - Duration::days(2)),
        ];
        Self::with_posts(posts)
    }

    /// Publish a post to the top of the feed and return its id.
    ///
    /// Re-publishing an id already on the feed replaces the earlier
    /// copy; ids stay unique.
    pub async fn publish(&self, post: Post) -> String {
        let id = post.id.clone();
        debug!(post_id = %id, author = %post.author, "publishing post");
        let mut posts = self.posts.write().await;
        posts.retain(|existing| existing.id != id);
        posts.insert(0, post);
        id
    }

    /// Look up a post by id.
    pub async fn get(&self, post_id: &str) -> Option<Post> {
        self.posts
            .read()
            .await
            .iter()
            .find(|post| post.id == post_id)
            .cloned()
    }

    /// Clone the whole feed, newest first.
    pub async fn snapshot(&self) -> Vec<Post> {
        self.posts.read().await.clone()
    }

    /// Posts tagged with the given category, newest first.
    pub async fn by_category(&self, category: PostCategory) -> Vec<Post> {
        self.posts
            .read()
            .await
            .iter()
            .filter(|post| post.category == Some(category))
            .cloned()
            .collect()
    }

    /// Increment a post's like counter. Returns `false` when the id is
    /// unknown.
    pub async fn record_like(&self, post_id: &str) -> bool {
        self.update(post_id, |post| post.likes += 1).await
    }

    /// Undo a like. Saturates at zero.
    pub async fn remove_like(&self, post_id: &str) -> bool {
        self.update(post_id, |post| post.likes = post.likes.saturating_sub(1))
            .await
    }

    /// Increment a post's comment counter. Returns `false` when the id
    /// is unknown.
    pub async fn record_comment(&self, post_id: &str) -> bool {
        self.update(post_id, |post| post.comments += 1).await
    }

    /// Number of posts on the feed.
    pub async fn len(&self) -> usize {
        self.posts.read().await.len()
    }

    /// Whether the feed has no posts.
    pub async fn is_empty(&self) -> bool {
        self.posts.read().await.is_empty()
    }

    async fn update(&self, post_id: &str, apply: impl FnOnce(&mut Post)) -> bool {
        let mut posts = self.posts.write().await;
        match posts.iter_mut().find(|post| post.id == post_id) {
            Some(post) => {
                apply(post);
                true
            }
            None => false,
        }
    }
}

//! Spotter companion response engine.
//!
//! The in-process core of the Spotter social fitness app: a feed of
//! workout posts, a roster of AI companion characters, and a
//! single-flight cache that generates and memoizes one companion reply
//! per post through an OpenAI-compatible completion API.
//!
//! Everything is built explicitly at the composition root; there are
//! no ambient singletons. Clone the handles ([`ResponseCache`],
//! [`FeedStore`]) and pass them to whatever needs them.
//!
//! # Example
//!
//! ```no_run
//! # tokio_test::block_on(async {
//! use std::sync::Arc;
//! use spotter::{CompanionConfig, FeedStore, GenerationOptions, OpenAiProvider, ResponseCache};
//!
//! let config = CompanionConfig::from_env();
//! let provider = Arc::new(OpenAiProvider::from_config(&config).unwrap());
//! let cache = ResponseCache::new(provider, GenerationOptions::from_config(&config));
//!
//! let feed = FeedStore::sample();
//! let posts = feed.snapshot().await;
//! cache.seed_all(&posts);
//! for post in &posts {
//!     cache.submit_prefetch(post);
//! }
//!
//! let reply = cache.ensure_loaded(&posts[0]).await.unwrap();
//! println!("{}: {}", reply.character_id, reply.text);
//! # });
//! ```

pub mod cache;
pub mod characters;
pub mod config;
pub mod error;
pub mod feed;
pub mod providers;

pub use cache::{CacheStats, CompanionReply, ResponseCache};
pub use characters::CompanionProfile;
pub use config::CompanionConfig;
pub use error::{Result, SpotterError};
pub use feed::{FeedStore, Post, PostCategory, WorkoutMeta};
pub use providers::{
    Completion, CompletionProvider, GenerationOptions, GenerationRequest, OpenAiProvider, Usage,
};

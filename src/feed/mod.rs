//! The social feed: post model and owning store.

pub mod post;
pub mod store;

pub use post::{Post, PostCategory, WorkoutMeta};
pub use store::FeedStore;

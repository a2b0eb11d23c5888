//! Companion reply caching with single-flight generation.

pub mod response_cache;

pub use response_cache::{CacheStats, CompanionReply, ResponseCache};

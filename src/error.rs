//! Crate-wide error type and result alias.

use thiserror::Error;

/// All failure classes surfaced by the companion engine.
///
/// The enum is `Clone` (every payload is a `String`) so a settled
/// generation flight can hand the same outcome to each caller that
/// joined it. A cache lookup miss is not an error; it is `None`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpotterError {
    /// Configuration problem: missing credentials, malformed settings.
    #[error("config error: {0}")]
    Config(String),

    /// The completion service failed the generation call (network error,
    /// malformed response, server-side failure).
    #[error("reply generation failed: {0}")]
    Generation(String),

    /// The completion service rejected our credentials (HTTP 401/403).
    #[error("completion service rejected credentials: {0}")]
    Unauthorized(String),

    /// The completion service rate-limited the request (HTTP 429).
    #[error("completion service rate limit: {0}")]
    RateLimited(String),
}

impl SpotterError {
    /// Whether a later identical call could plausibly succeed.
    ///
    /// Credential and configuration problems need operator action;
    /// transient generation failures and rate limits do not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SpotterError::Generation(_) | SpotterError::RateLimited(_))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SpotterError>;

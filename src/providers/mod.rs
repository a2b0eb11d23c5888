//! Completion provider seam.
//!
//! [`CompletionProvider`] is the boundary between the companion engine
//! and whatever AI completion service backs it. The cache only sees
//! this trait, so tests swap in mock providers and deployments swap in
//! gateways without touching cache logic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::characters::CompanionProfile;
use crate::config::CompanionConfig;
use crate::error::{Result, SpotterError};
use crate::feed::Post;

pub mod openai;

pub use openai::OpenAiProvider;

// ============================================================================
// Request types
// ============================================================================

/// Options controlling a single generation call.
///
/// `None` fields defer to the provider's own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Override the provider's default model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Completion length cap in tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationOptions {
    /// Options with every field deferred to the provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options derived from loaded configuration. The model stays
    /// deferred since the provider is built with the configured model
    /// already.
    pub fn from_config(config: &CompanionConfig) -> Self {
        Self {
            model: None,
            temperature: Some(config.temperature),
            max_tokens: Some(config.max_tokens),
        }
    }
}

/// A fully assembled generation request for one companion reply.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// System prompt establishing the companion's voice.
    pub system: String,
    /// User prompt carrying the post the companion reacts to.
    pub prompt: String,
    /// Per-call options.
    pub options: GenerationOptions,
}

impl GenerationRequest {
    /// Build the request for a companion answering a post.
    ///
    /// The system prompt is the companion's persona; the user prompt
    /// carries the author, the post body, and the workout summary when
    /// the post tracked one.
    pub fn for_post(post: &Post, companion: &CompanionProfile, options: GenerationOptions) -> Self {
        let mut prompt = format!("{} posted: {}", post.author, post.content);
        if let Some(workout) = &post.workout {
            prompt.push_str(&format!("\nWorkout: {}", workout.summary()));
        }
        Self {
            system: companion.persona.to_string(),
            prompt,
            options,
        }
    }
}

// ============================================================================
// Response types
// ============================================================================

/// Token accounting reported by a provider, when available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Build usage from prompt and completion counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// A provider's answer to a generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Generated reply text.
    pub text: String,
    /// Token accounting, when the provider reported it.
    pub usage: Option<Usage>,
}

impl Completion {
    /// A text-only completion.
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            usage: None,
        }
    }

    /// Attach token accounting.
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}

// ============================================================================
// The provider trait
// ============================================================================

/// The boundary to an AI completion service.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate one companion reply for the given request.
    async fn complete(&self, request: GenerationRequest) -> Result<Completion>;

    /// Model used when the request does not override it.
    fn default_model(&self) -> &str;

    /// Short provider name for logs.
    fn name(&self) -> &str;
}

/// Map an HTTP status and message from a completion API to the right
/// error class.
pub(crate) fn status_error(status: u16, message: String) -> SpotterError {
    match status {
        401 | 403 => SpotterError::Unauthorized(message),
        429 => SpotterError::RateLimited(message),
        _ => SpotterError::Generation(message),
    }
}

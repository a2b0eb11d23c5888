//! Environment-driven configuration.
//!
//! Settings load from environment variables (a local `.env` file is
//! honored) with sensible defaults for everything except credentials.
//! API keys are never defaulted and never hardcoded: a missing key
//! surfaces as a [`SpotterError::Config`](crate::error::SpotterError)
//! when the provider is built, not here.

use std::env;
use std::fmt;
use std::str::FromStr;

use tracing::warn;

// ============================================================================
// Defaults
// ============================================================================

/// Default OpenAI-compatible API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default completion model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default sampling temperature. Companion replies should sound warm,
/// not deterministic.
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

/// Default completion length cap. Replies are one or two short
/// sentences under a feed post, not essays.
pub const DEFAULT_MAX_TOKENS: u32 = 160;

// ============================================================================
// Configuration
// ============================================================================

/// Runtime configuration for the companion engine.
///
/// Built once at the composition root and passed by reference to the
/// components that need it. Nothing in this crate reads configuration
/// from ambient global state after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanionConfig {
    /// Base URL of the OpenAI-compatible completion API.
    pub api_base: String,
    /// API key, if one was configured. `None` is valid here; building
    /// a provider without a key is the error.
    pub api_key: Option<String>,
    /// Model requested for reply generation.
    pub model: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Sampling temperature passed to the completion API.
    pub temperature: f32,
    /// Maximum completion tokens per reply.
    pub max_tokens: u32,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl CompanionConfig {
    /// Load configuration from the environment.
    ///
    /// Recognized variables:
    ///
    /// | Variable                | Default                        |
    /// |-------------------------|--------------------------------|
    /// | `SPOTTER_API_BASE`      | `https://api.openai.com/v1`    |
    /// | `SPOTTER_API_KEY`       | falls back to `OPENAI_API_KEY` |
    /// | `SPOTTER_MODEL`         | `gpt-4o-mini`                  |
    /// | `SPOTTER_TIMEOUT_SECS`  | `30`                           |
    /// | `SPOTTER_TEMPERATURE`   | `0.8`                          |
    /// | `SPOTTER_MAX_TOKENS`    | `160`                          |
    ///
    /// Malformed numeric values are logged and replaced by defaults
    /// rather than failing startup.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_base = env::var("SPOTTER_API_BASE")
            .ok()
            .map(|base| base.trim_end_matches('/').to_string())
            .filter(|base| !base.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let api_key = env::var("SPOTTER_API_KEY")
            .or_else(|_| env::var("OPENAI_API_KEY"))
            .ok()
            .filter(|key| !key.is_empty());

        let model = env::var("SPOTTER_MODEL")
            .ok()
            .filter(|model| !model.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self {
            api_base,
            api_key,
            model,
            timeout_secs: parsed_var("SPOTTER_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
            temperature: parsed_var("SPOTTER_TEMPERATURE", DEFAULT_TEMPERATURE),
            max_tokens: parsed_var("SPOTTER_MAX_TOKENS", DEFAULT_MAX_TOKENS),
        }
    }

    /// Replace the configured model.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Replace the configured API key.
    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }
}

/// Read and parse a numeric environment variable, falling back to
/// `default` (with a warning) when the value does not parse.
fn parsed_var<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy + fmt::Display,
{
    match env::var(name) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    variable = name,
                    value = %raw,
                    fallback = %default,
                    "ignoring unparseable configuration value"
                );
                default
            }
        },
        Err(_) => default,
    }
}

//! OpenAI-compatible chat completion provider.
//!
//! Speaks the `/chat/completions` REST shape used by OpenAI and the
//! many compatible gateways, so pointing `SPOTTER_API_BASE` at a proxy
//! is enough to switch backends.
//!
//! Auth priority: config key → SPOTTER_API_KEY → OPENAI_API_KEY

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::{CompanionConfig, DEFAULT_API_BASE, DEFAULT_TIMEOUT_SECS};
use crate::error::{Result, SpotterError};

use super::{status_error, Completion, CompletionProvider, GenerationRequest, Usage};

// ── Auth ─────────────────────────────────────────────────────────────────────

/// Resolve the API key in priority order: explicit config value first,
/// then the environment. Empty strings count as missing.
pub fn resolve_api_key(explicit_key: Option<&str>, env_key: Option<&str>) -> Option<String> {
    if let Some(k) = explicit_key.filter(|k| !k.is_empty()) {
        return Some(k.to_string());
    }
    if let Some(k) = env_key.filter(|k| !k.is_empty()) {
        return Some(k.to_string());
    }
    None
}

/// Read `SPOTTER_API_KEY`, falling back to `OPENAI_API_KEY`.
fn env_api_key() -> Option<String> {
    std::env::var("SPOTTER_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .ok()
}

// ── Provider ──────────────────────────────────────────────────────────────────

/// Provider that speaks the OpenAI chat completion REST API directly.
///
/// Use [`OpenAiProvider::from_config`] at the composition root, or
/// [`OpenAiProvider::new_with_key`] for testing / manual construction.
pub struct OpenAiProvider {
    api_base: String,
    api_key: String,
    model: String,
    client: Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_base", &self.api_base)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiProvider {
    /// Build a provider against the default API base.
    pub fn new_with_key(api_key: &str, model: &str) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: Self::build_client(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Point the provider at a different OpenAI-compatible base URL.
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Build from loaded configuration, resolving the API key in
    /// priority order.
    ///
    /// # Errors
    ///
    /// Returns [`SpotterError::Config`] when no key is configured in
    /// either the config or the environment.
    pub fn from_config(config: &CompanionConfig) -> Result<Self> {
        let api_key = resolve_api_key(config.api_key.as_deref(), env_api_key().as_deref())
            .ok_or_else(|| {
                SpotterError::Config(
                    "no completion API key configured; set SPOTTER_API_KEY or OPENAI_API_KEY"
                        .to_string(),
                )
            })?;

        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            client: Self::build_client(config.timeout_secs),
        })
    }

    fn build_client(timeout_secs: u64) -> Client {
        Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build HTTP client")
    }

    /// Build the `/chat/completions` request body for one generation.
    pub fn build_request_body(&self, request: &GenerationRequest) -> Value {
        let model = request.options.model.as_deref().unwrap_or(&self.model);
        let mut body = json!({
            "model": model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt }
            ]
        });
        if let Some(temperature) = request.options.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = request.options.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }

    /// Extract the reply text from a chat completion response.
    ///
    /// Whitespace-only content counts as missing: a companion reply
    /// that says nothing is a failed generation, not a cacheable value.
    pub fn extract_text(response: &Value) -> Option<String> {
        response["choices"][0]["message"]["content"]
            .as_str()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    }

    /// Parse token usage from a response if available.
    fn extract_usage(response: &Value) -> Option<Usage> {
        let usage = response.get("usage")?;
        let prompt = usage["prompt_tokens"].as_u64()? as u32;
        let completion = usage["completion_tokens"].as_u64()? as u32;
        Some(Usage::new(prompt, completion))
    }

    /// Build the full API URL for chat completions.
    fn api_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, request: GenerationRequest) -> Result<Completion> {
        let body = self.build_request_body(&request);
        let model = request.options.model.as_deref().unwrap_or(&self.model);

        debug!(model, "chat completion request");

        let response = self
            .client
            .post(self.api_url())
            .header("Content-Type", "application/json")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SpotterError::Generation(format!("completion request failed: {}", e)))?;

        if response.status().is_success() {
            let json: Value = response.json().await.map_err(|e| {
                SpotterError::Generation(format!("failed to parse completion response: {}", e))
            })?;

            let text = Self::extract_text(&json).ok_or_else(|| {
                SpotterError::Generation("completion response contained no text".to_string())
            })?;
            let usage = Self::extract_usage(&json);

            let mut completion = Completion::text(&text);
            if let Some(u) = usage {
                completion = completion.with_usage(u);
            }
            return Ok(completion);
        }

        let status = response.status().as_u16();
        let error_text = response.text().await.unwrap_or_default();

        // Try to extract a useful message from the error body.
        let body_msg = serde_json::from_str::<Value>(&error_text)
            .ok()
            .and_then(|v| {
                v["error"]["message"]
                    .as_str()
                    .map(|s| format!("completion API error: {}", s))
            })
            .unwrap_or_else(|| format!("completion API error ({}): {}", status, error_text));

        Err(status_error(status, body_msg))
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::GenerationOptions;

    #[test]
    fn test_key_resolution_prefers_explicit_key() {
        let key = resolve_api_key(Some("explicit-key"), Some("env-key"));
        assert_eq!(key.as_deref(), Some("explicit-key"));
    }

    #[test]
    fn test_key_resolution_falls_back_to_env() {
        let key = resolve_api_key(None, Some("env-key"));
        assert_eq!(key.as_deref(), Some("env-key"));
    }

    #[test]
    fn test_key_resolution_skips_empty_values() {
        let key = resolve_api_key(Some(""), Some("env-key"));
        assert_eq!(key.as_deref(), Some("env-key"));
    }

    #[test]
    fn test_key_resolution_returns_none_with_no_credentials() {
        assert!(resolve_api_key(None, None).is_none());
        assert!(resolve_api_key(Some(""), Some("")).is_none());
    }

    #[test]
    fn test_from_config_uses_explicit_key_and_base() {
        let config = CompanionConfig {
            api_base: "https://gateway.example.com/v1/".to_string(),
            api_key: Some("sk-test".to_string()),
            ..CompanionConfig::default()
        };
        let provider = OpenAiProvider::from_config(&config).unwrap();
        assert_eq!(provider.api_url(), "https://gateway.example.com/v1/chat/completions");
        assert_eq!(provider.default_model(), config.model);
    }

    #[test]
    fn test_request_body_uses_provider_model_by_default() {
        let provider = OpenAiProvider::new_with_key("sk-test", "gpt-4o-mini");
        let request = GenerationRequest {
            system: "You are Max.".to_string(),
            prompt: "Jordan posted: leg day".to_string(),
            options: GenerationOptions::new(),
        };

        let body = provider.build_request_body(&request);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are Max.");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Jordan posted: leg day");
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_request_body_honors_option_overrides() {
        let provider = OpenAiProvider::new_with_key("sk-test", "gpt-4o-mini");
        let request = GenerationRequest {
            system: "You are Dash.".to_string(),
            prompt: "Priya posted: tempo run".to_string(),
            options: GenerationOptions {
                model: Some("gpt-4o".to_string()),
                temperature: Some(0.4),
                max_tokens: Some(80),
            },
        };

        let body = provider.build_request_body(&request);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 80);
        assert!((body["temperature"].as_f64().unwrap() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_extract_text_reads_first_choice() {
        let response = json!({
            "choices": [
                { "message": { "role": "assistant", "content": "Great job!" } }
            ]
        });
        assert_eq!(OpenAiProvider::extract_text(&response).as_deref(), Some("Great job!"));
    }

    #[test]
    fn test_extract_text_trims_whitespace() {
        let response = json!({
            "choices": [
                { "message": { "content": "  Strong work today.\n" } }
            ]
        });
        assert_eq!(
            OpenAiProvider::extract_text(&response).as_deref(),
            Some("Strong work today.")
        );
    }

    #[test]
    fn test_extract_text_rejects_empty_and_missing_content() {
        let empty = json!({ "choices": [ { "message": { "content": "   " } } ] });
        assert!(OpenAiProvider::extract_text(&empty).is_none());

        let missing = json!({ "choices": [] });
        assert!(OpenAiProvider::extract_text(&missing).is_none());

        let malformed = json!({ "unexpected": true });
        assert!(OpenAiProvider::extract_text(&malformed).is_none());
    }

    #[test]
    fn test_extract_usage_reads_token_counts() {
        let response = json!({
            "usage": { "prompt_tokens": 120, "completion_tokens": 24, "total_tokens": 144 }
        });
        let usage = OpenAiProvider::extract_usage(&response).unwrap();
        assert_eq!(usage.prompt_tokens, 120);
        assert_eq!(usage.completion_tokens, 24);
        assert_eq!(usage.total_tokens, 144);
    }

    #[test]
    fn test_extract_usage_absent_when_not_reported() {
        assert!(OpenAiProvider::extract_usage(&json!({})).is_none());
    }

    #[test]
    fn test_api_base_trailing_slash_is_trimmed() {
        let provider = OpenAiProvider::new_with_key("sk-test", "gpt-4o-mini")
            .with_api_base("https://proxy.internal/v1/");
        assert_eq!(provider.api_url(), "https://proxy.internal/v1/chat/completions");
    }

    #[test]
    fn test_provider_name_and_default_model() {
        let provider = OpenAiProvider::new_with_key("sk-test", "gpt-4o-mini");
        assert_eq!(provider.name(), "openai-compatible");
        assert_eq!(provider.default_model(), "gpt-4o-mini");
    }

    #[test]
    fn test_debug_redacts_the_api_key() {
        let provider = OpenAiProvider::new_with_key("sk-secret", "gpt-4o-mini");
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}

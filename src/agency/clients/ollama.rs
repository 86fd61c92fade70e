//! Client for Ollama's non-streaming `/api/generate` endpoint.
//!
//! Request body:
//!
//! ```json
//! {"model": "llama3", "prompt": "...", "max_tokens": 512, "temperature": 0.3, "stream": false}
//! ```
//!
//! A successful reply carries the generated text in its `response` field. When
//! that field is missing the whole body is returned as text, and a body that is
//! not JSON at all is returned verbatim; a reply is never discarded for being
//! oddly shaped.

use crate::agency::cancellation::CancellationSignal;
use crate::agency::client_wrapper::{ClientWrapper, GenerationError, GenerationSettings};
use crate::agency::config::{AgencyConfig, OllamaSettings};
use crate::agency::http_client_pool::get_or_create_client;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

pub struct OllamaClient {
    endpoint: String,
    pub model: String,
    timeout: Duration,
    settings: GenerationSettings,
}

impl OllamaClient {
    /// Client for `endpoint` (the full `/api/generate` URL) and `model`, with a
    /// 60 second timeout and default generation settings.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        OllamaClient {
            endpoint: endpoint.into(),
            model: model.into(),
            timeout: OllamaSettings::default().timeout(),
            settings: GenerationSettings::default(),
        }
    }

    pub fn from_settings(ollama: &OllamaSettings, settings: GenerationSettings) -> Self {
        Self::new(ollama.base_url.clone(), ollama.model.clone())
            .with_timeout(ollama.timeout())
            .with_generation_settings(settings)
    }

    pub fn from_config(config: &AgencyConfig) -> Self {
        Self::from_settings(&config.ollama, config.generation.clone())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_generation_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post_generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let http = get_or_create_client(&self.endpoint, self.timeout)
            .map_err(|e| GenerationError::Client(e.to_string()))?;

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            stream: false,
        };

        let response = http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        // Read the body before checking the status so failures can be logged with it.
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            log::error!(
                "OllamaClient::generate: {} returned {}. Body: {}",
                self.endpoint,
                status,
                body
            );
            return Err(GenerationError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().map(str::to_string),
                body,
            });
        }

        Ok(extract_generated_text(&body))
    }
}

#[async_trait]
impl ClientWrapper for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        cancellation: &CancellationSignal,
    ) -> Result<String, GenerationError> {
        tokio::select! {
            biased;
            _ = cancellation.cancelled() => Err(GenerationError::Cancelled),
            result = self.post_generate(prompt) => result,
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn transport_error(err: reqwest::Error) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout
    } else {
        log::error!("OllamaClient::generate transport error: {}", err);
        GenerationError::Transport(err.to_string())
    }
}

/// Pull the generated text out of a successful `/api/generate` body.
///
/// Falls back to the raw body when the `response` field is absent or not a
/// string, and when the body is not JSON.
pub fn extract_generated_text(raw: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) => match value.get("response").and_then(serde_json::Value::as_str) {
            Some(text) => text.to_string(),
            None => raw.to_string(),
        },
        Err(err) => {
            log::debug!("generate response is not JSON ({}), using raw body", err);
            raw.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_the_response_field() {
        let body = r#"{"model":"llama3","response":"Here is the plan.","done":true}"#;
        assert_eq!(extract_generated_text(body), "Here is the plan.");
    }

    #[test]
    fn missing_response_field_yields_the_raw_body() {
        let body = r#"{"done":true}"#;
        assert_eq!(extract_generated_text(body), body);
    }

    #[test]
    fn non_string_response_field_yields_the_raw_body() {
        let body = r#"{"response":42}"#;
        assert_eq!(extract_generated_text(body), body);
    }

    #[test]
    fn malformed_json_is_returned_verbatim() {
        let body = "plain text, not json {";
        assert_eq!(extract_generated_text(body), body);
    }

    #[test]
    fn request_body_has_the_generate_shape() {
        let request = GenerateRequest {
            model: "llama3",
            prompt: "hi",
            max_tokens: 512,
            temperature: 0.3,
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3");
        assert_eq!(json["prompt"], "hi");
        assert_eq!(json["max_tokens"], 512);
        assert_eq!(json["stream"], false);
        assert!((json["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn from_config_carries_endpoint_and_model() {
        let config = AgencyConfig::default();
        let client = OllamaClient::from_config(&config);
        assert_eq!(client.endpoint(), config.ollama.base_url);
        assert_eq!(client.model_name(), "llama3");
    }
}

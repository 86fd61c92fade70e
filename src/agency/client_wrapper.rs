use crate::agency::cancellation::CancellationSignal;
use async_trait::async_trait;
use std::error::Error;
use std::fmt;

/// A ClientWrapper is a wrapper around a text-generation backend.
/// It turns one fully assembled prompt into one reply. It does not keep any
/// conversation state; prompt assembly belongs to the
/// [`ContextWindow`](crate::context_window::ContextWindow).
///
/// Implementations report failures as a [`GenerationError`] instead of
/// panicking or hiding them; the agent decides how to present them.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Send `prompt` to the backend and return the generated text.
    ///
    /// Implementations should stop early and return
    /// [`GenerationError::Cancelled`] once `cancellation` fires, when the
    /// underlying I/O allows it.
    async fn generate(
        &self,
        prompt: &str,
        cancellation: &CancellationSignal,
    ) -> Result<String, GenerationError>;

    /// Model identifier sent with every request.
    fn model_name(&self) -> &str;
}

/// Generation parameters sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature. Kept low so runs are close to reproducible.
    pub temperature: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.3,
        }
    }
}

/// Why a generation call produced no usable text.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// The backend answered with a non-success status.
    Status {
        status: u16,
        reason: Option<String>,
        body: String,
    },
    /// The backend could not be reached or the connection broke mid-request.
    Transport(String),
    /// The request did not complete within the configured timeout.
    Timeout,
    /// Cancellation was requested while the call was in flight.
    Cancelled,
    /// The client itself could not be set up (bad endpoint, TLS init, ...).
    Client(String),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Status { status, reason, .. } => match reason {
                Some(reason) => write!(f, "HTTP {} {}", status, reason),
                None => write!(f, "HTTP {}", status),
            },
            GenerationError::Transport(msg) => write!(f, "Transport failure: {}", msg),
            GenerationError::Timeout => write!(f, "Request timed out"),
            GenerationError::Cancelled => write!(f, "Request cancelled"),
            GenerationError::Client(msg) => write!(f, "Client setup failed: {}", msg),
        }
    }
}

impl Error for GenerationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_mentions_code_and_reason() {
        let err = GenerationError::Status {
            status: 500,
            reason: Some("Internal Server Error".to_string()),
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 500 Internal Server Error");
    }

    #[test]
    fn default_settings_favor_determinism() {
        let settings = GenerationSettings::default();
        assert_eq!(settings.max_tokens, 512);
        assert!(settings.temperature < 0.5);
    }
}

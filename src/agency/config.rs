//! Configuration for Agency.
//!
//! [`AgencyConfig`] gathers the handful of knobs the pipeline needs: where the
//! generation backend lives, which model to ask, how long to wait for it, the
//! generation parameters and how many past turns an agent sees. Callers build
//! it however they like; no config-file format is imposed.
//!
//! # Example
//!
//! ```rust
//! use agency::AgencyConfig;
//!
//! // Defaults: a local Ollama on port 11434 running llama3.
//! let config = AgencyConfig::default();
//! assert_eq!(config.ollama.model, "llama3");
//!
//! // Or start from the environment (AGENCY_OLLAMA_URL, AGENCY_OLLAMA_MODEL, ...).
//! let config = AgencyConfig::from_env();
//! ```

use crate::agency::client_wrapper::GenerationSettings;
use crate::agency::context_window::{ContextWindow, DEFAULT_CONTEXT_MESSAGES};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_OLLAMA_URL: &str = "AGENCY_OLLAMA_URL";
pub const ENV_OLLAMA_MODEL: &str = "AGENCY_OLLAMA_MODEL";
pub const ENV_OLLAMA_TIMEOUT_SECS: &str = "AGENCY_OLLAMA_TIMEOUT_SECS";
pub const ENV_CONTEXT_MESSAGES: &str = "AGENCY_CONTEXT_MESSAGES";

/// Where and how to reach an Ollama-compatible `/api/generate` endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct OllamaSettings {
    /// Full URL of the generate endpoint.
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl OllamaSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/api/generate".to_string(),
            model: "llama3".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Global configuration for an Agency pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AgencyConfig {
    pub ollama: OllamaSettings,
    pub generation: GenerationSettings,
    /// How many trailing messages an LLM-backed agent sees.
    pub context_messages: usize,
}

impl Default for AgencyConfig {
    fn default() -> Self {
        Self {
            ollama: OllamaSettings::default(),
            generation: GenerationSettings::default(),
            context_messages: DEFAULT_CONTEXT_MESSAGES,
        }
    }
}

impl AgencyConfig {
    /// Defaults overridden by any `AGENCY_*` environment variables that are set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `AGENCY_*` key.
    ///
    /// Values that fail to parse are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_OLLAMA_URL).filter(|v| !v.trim().is_empty()) {
            config.ollama.base_url = url;
        }
        if let Some(model) = lookup(ENV_OLLAMA_MODEL).filter(|v| !v.trim().is_empty()) {
            config.ollama.model = model;
        }
        if let Some(secs) = parse_var(&lookup, ENV_OLLAMA_TIMEOUT_SECS) {
            config.ollama.timeout_secs = secs;
        }
        match parse_var::<_, usize>(&lookup, ENV_CONTEXT_MESSAGES) {
            Some(0) => log::warn!(
                "ignoring {}=0: the context window needs at least one message",
                ENV_CONTEXT_MESSAGES
            ),
            Some(n) => config.context_messages = n,
            None => {}
        }

        config
    }

    pub fn context_window(&self) -> ContextWindow {
        ContextWindow::new(self.context_messages)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("ignoring {}={:?}: not a valid number", key, raw);
            None
        }
    }
}

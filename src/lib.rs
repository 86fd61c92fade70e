//! # Agency
//!
//! Agency runs a small software-delivery team of LLM-backed agents over a
//! shared, append-only conversation. One prompt goes in; each role takes one
//! turn in a fixed order and the transcript comes out:
//!
//! ```text
//! ProductManager → Architect (optional) → Developer → Tester → ReleaseManager
//! ```
//!
//! The crate provides:
//!
//! * **Messages and roles**: [`message::AgentRole`], [`message::AgentDescriptor`]
//!   and [`message::AgentMessage`]
//! * **Conversation log**: [`conversation::ConversationLog`], an append-only,
//!   thread-safe transcript that hands out snapshots
//! * **Agents**: the [`agent::Agent`] trait, the LLM-backed [`agent::LlmAgent`]
//!   and the offline [`agent::ScriptedAgent`]
//! * **Prompt assembly**: [`context_window::ContextWindow`], which bounds what
//!   an agent sees to its most recent turns
//! * **Backends**: the [`ClientWrapper`] trait and an Ollama implementation in
//!   [`clients::ollama`]
//! * **Orchestration**: [`orchestration::Orchestrator`] with progress events
//!   through [`event::EventHandler`] and cooperative cancellation through
//!   [`cancellation::CancellationSignal`]
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use agency::agent::LlmAgent;
//! use agency::cancellation::CancellationSignal;
//! use agency::clients::ollama::OllamaClient;
//! use agency::message::AgentRole;
//! use agency::orchestration::{AgentRegistry, Orchestrator};
//! use agency::AgencyConfig;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     agency::init_logger();
//!
//!     let config = AgencyConfig::from_env();
//!     let client = Arc::new(OllamaClient::from_config(&config));
//!
//!     let mut registry = AgentRegistry::new();
//!     for role in AgentRole::PIPELINE.iter() {
//!         let agent = LlmAgent::new(*role, client.clone())
//!             .with_context_window(config.context_window());
//!         registry.register(agent)?;
//!     }
//!
//!     let orchestrator = Orchestrator::new(registry);
//!     orchestrator
//!         .start_conversation("Build a payment module", &CancellationSignal::new())
//!         .await?;
//!
//!     for message in orchestrator.get_conversation() {
//!         println!("{} ({}): {}", message.role, message.from, message.content);
//!     }
//!     Ok(())
//! }
//! ```

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// Applications embedding Agency can opt in to `RUST_LOG` driven diagnostics
/// without choosing a logging backend up front.
///
/// ```rust
/// agency::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

// Import the top-level `agency` module.
pub mod agency;

// Re-exporting key items for easier external access.
pub use agency::agent;
pub use agency::agent::{Agent, LlmAgent, ScriptedAgent};
pub use agency::cancellation;
pub use agency::cancellation::CancellationSignal;
pub use agency::client_wrapper;
pub use agency::client_wrapper::{ClientWrapper, GenerationError, GenerationSettings};
pub use agency::clients;
pub use agency::config;
pub use agency::config::AgencyConfig;
pub use agency::context_window;
pub use agency::conversation;
pub use agency::conversation::ConversationLog;
pub use agency::event;
pub use agency::event::{EventHandler, OrchestrationEvent};
pub use agency::http_client_pool;
pub use agency::message;
pub use agency::message::{AgentDescriptor, AgentMessage, AgentRole};
pub use agency::orchestration;
pub use agency::orchestration::{AgentRegistry, OrchestrationError, Orchestrator, RunSummary};

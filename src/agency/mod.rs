// src/agency/mod.rs

pub mod agent;
pub mod cancellation;
pub mod client_wrapper;
pub mod clients;
pub mod config;
pub mod context_window;
pub mod conversation;
pub mod event;
pub mod http_client_pool;
pub mod message;
pub mod orchestration;

// Export the entry points directly so callers can write agency::agency::Orchestrator
// instead of agency::agency::orchestration::Orchestrator.
pub use config::AgencyConfig;
pub use orchestration::Orchestrator;

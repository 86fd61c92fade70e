//! Orchestration event system.
//!
//! Implement [`EventHandler`] to follow a run as it happens: which role is
//! about to speak, which optional roles were skipped, who abstained, and how
//! the run ended. Transports use this to push progress to clients instead of
//! polling [`Orchestrator::get_conversation`](crate::orchestration::Orchestrator::get_conversation).
//!
//! # Event flow
//!
//! ```text
//! RunStarted
//!   ├─ RoleStarted { ProductManager } → AgentResponded | AgentAbstained
//!   ├─ RoleSkipped { Architect }          (no architect registered)
//!   ├─ RoleStarted { Developer }      → AgentResponded | AgentAbstained
//!   ├─ RoleStarted { Tester }         → ...
//!   └─ RoleStarted { ReleaseManager } → ...
//! RunCompleted | RunCancelled | TurnInterrupted
//! ```
//!
//! # Example
//!
//! ```rust
//! use agency::event::{EventHandler, OrchestrationEvent};
//! use async_trait::async_trait;
//!
//! struct PrintHandler;
//!
//! #[async_trait]
//! impl EventHandler for PrintHandler {
//!     async fn on_orchestration_event(&self, event: &OrchestrationEvent) {
//!         if let OrchestrationEvent::AgentResponded { agent_id, .. } = event {
//!             println!("{} spoke", agent_id);
//!         }
//!     }
//! }
//! ```

use crate::agency::message::AgentRole;
use async_trait::async_trait;

/// Events emitted by an [`Orchestrator`](crate::orchestration::Orchestrator)
/// during [`start_conversation`](crate::orchestration::Orchestrator::start_conversation).
///
/// Every variant carries the `run_id` so handlers shared between runs can tell
/// them apart.
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestrationEvent {
    /// Configuration checks passed and the first step is about to run.
    RunStarted {
        run_id: String,
        /// Number of registered agents.
        agent_count: usize,
    },

    /// A registered agent is about to take its turn.
    RoleStarted {
        run_id: String,
        role: AgentRole,
        agent_id: String,
    },

    /// An optional role had no registered agent and was passed over.
    RoleSkipped { run_id: String, role: AgentRole },

    /// The agent's message was appended to the log at `log_index`.
    AgentResponded {
        run_id: String,
        role: AgentRole,
        agent_id: String,
        log_index: usize,
        response_length: usize,
    },

    /// The agent had nothing to add; nothing was appended.
    AgentAbstained {
        run_id: String,
        role: AgentRole,
        agent_id: String,
    },

    /// Every step ran.
    RunCompleted {
        run_id: String,
        messages_appended: usize,
    },

    /// Cancellation emptied `role`'s turn while it was in flight. Ends the run.
    TurnInterrupted {
        run_id: String,
        role: AgentRole,
        agent_id: String,
        messages_appended: usize,
    },

    /// Cancellation was observed before `next_role` could start.
    RunCancelled {
        run_id: String,
        next_role: AgentRole,
        messages_appended: usize,
    },
}

/// Receiver of [`OrchestrationEvent`]s. The default implementation ignores them.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_orchestration_event(&self, _event: &OrchestrationEvent) {}
}

//! Agent System
//!
//! An [`Agent`] looks at the conversation so far, optionally takes an
//! instruction from the orchestrator, and contributes at most one
//! [`AgentMessage`]. Returning `None` means "nothing to add"; it is not a
//! failure.
//!
//! Agents never see the [`ConversationLog`](crate::conversation::ConversationLog)
//! itself, only a read-only snapshot, and they never let backend trouble escape:
//! a failed generation call becomes a diagnostic message in the transcript.
//!
//! Two implementations ship with the crate:
//!
//! - [`LlmAgent`]: a descriptor composed with an [`LlmTurn`], the reusable
//!   "system prompt + context window + generation call" behavior.
//! - [`ScriptedAgent`]: deterministic role templates, handy offline and in tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use agency::agent::{Agent, LlmAgent};
//! use agency::cancellation::CancellationSignal;
//! use agency::clients::ollama::OllamaClient;
//! use agency::message::AgentRole;
//! use std::sync::Arc;
//!
//! # async {
//! let client = Arc::new(OllamaClient::new("http://localhost:11434/api/generate", "llama3"));
//! let tester = LlmAgent::new(AgentRole::Tester, client);
//!
//! let reply = tester.handle(&[], None, &CancellationSignal::new()).await;
//! # };
//! ```

use crate::agency::cancellation::CancellationSignal;
use crate::agency::client_wrapper::{ClientWrapper, GenerationError};
use crate::agency::context_window::ContextWindow;
use crate::agency::message::{AgentDescriptor, AgentMessage, AgentRole};
use async_trait::async_trait;
use std::sync::Arc;

/// A role-bound unit that produces at most one message per turn.
#[async_trait]
pub trait Agent: Send + Sync {
    fn descriptor(&self) -> &AgentDescriptor;

    /// Take one turn.
    ///
    /// `conversation` holds every message appended so far, oldest first.
    async fn handle(
        &self,
        conversation: &[AgentMessage],
        instruction: Option<&str>,
        cancellation: &CancellationSignal,
    ) -> Option<AgentMessage>;
}

/// Reusable LLM-backed turn: builds the prompt and calls the backend.
///
/// The turn is agnostic of who owns it; [`LlmAgent`] composes it with a
/// descriptor, but any custom agent can hold one too.
pub struct LlmTurn {
    system_prompt: String,
    context: ContextWindow,
    client: Arc<dyn ClientWrapper>,
    uses_instruction: bool,
}

impl LlmTurn {
    /// Turn using `role`'s system prompt and instruction policy and the default
    /// 12-message context window.
    pub fn for_role(role: AgentRole, client: Arc<dyn ClientWrapper>) -> Self {
        Self {
            system_prompt: role.system_prompt().to_string(),
            context: ContextWindow::default(),
            client,
            uses_instruction: role.consumes_instruction(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_context_window(mut self, context: ContextWindow) -> Self {
        self.context = context;
        self
    }

    /// Override whether the orchestrator's instruction is put into the prompt.
    pub fn with_instruction_usage(mut self, uses_instruction: bool) -> Self {
        self.uses_instruction = uses_instruction;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// The exact prompt [`generate`](Self::generate) would send.
    pub fn prompt(&self, conversation: &[AgentMessage], instruction: Option<&str>) -> String {
        let instruction = if self.uses_instruction {
            instruction
        } else {
            None
        };
        self.context
            .build(&self.system_prompt, instruction, conversation)
    }

    /// Call the backend and return the raw outcome.
    pub async fn generate(
        &self,
        conversation: &[AgentMessage],
        instruction: Option<&str>,
        cancellation: &CancellationSignal,
    ) -> Result<String, GenerationError> {
        let prompt = self.prompt(conversation, instruction);
        log::debug!(
            "LlmTurn::generate: {} chars to model {}",
            prompt.len(),
            self.client.model_name()
        );
        self.client.generate(&prompt, cancellation).await
    }
}

/// Content recorded in the transcript when a generation call fails.
///
/// Status failures read `"<Role> Error: HTTP <code> <reason>"`; everything else
/// reads `"<Role> Exception: <summary>"`.
pub fn diagnostic_content(role: AgentRole, err: &GenerationError) -> String {
    match err {
        GenerationError::Status { .. } => format!("{} Error: {}", role, err),
        _ => format!("{} Exception: {}", role, err),
    }
}

/// Map a generation outcome to the message the agent contributes.
///
/// Returns `None` only when the call was cancelled on request; every other
/// failure becomes a visible diagnostic, and a blank reply is replaced by a
/// placeholder so no empty turn reaches the log.
pub fn outcome_to_message(
    descriptor: &AgentDescriptor,
    outcome: Result<String, GenerationError>,
) -> Option<AgentMessage> {
    let content = match outcome {
        Ok(text) if text.trim().is_empty() => format!("[{}] Empty response.", descriptor.role),
        Ok(text) => text,
        Err(GenerationError::Cancelled) => {
            log::info!("{} ({}) cancelled mid-call", descriptor.role, descriptor.id);
            return None;
        }
        Err(err) => {
            log::error!(
                "{} ({}) generation failed: {}",
                descriptor.role,
                descriptor.id,
                err
            );
            diagnostic_content(descriptor.role, &err)
        }
    };
    Some(AgentMessage::from_descriptor(descriptor, content))
}

/// An agent whose turns are produced by an [`LlmTurn`].
pub struct LlmAgent {
    descriptor: AgentDescriptor,
    turn: LlmTurn,
}

impl LlmAgent {
    /// Agent with the role's default id, system prompt and context window.
    pub fn new(role: AgentRole, client: Arc<dyn ClientWrapper>) -> Self {
        Self::with_turn(AgentDescriptor::for_role(role), LlmTurn::for_role(role, client))
    }

    pub fn with_turn(descriptor: AgentDescriptor, turn: LlmTurn) -> Self {
        Self { descriptor, turn }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.descriptor.id = id.into();
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.descriptor.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_context_window(mut self, context: ContextWindow) -> Self {
        self.turn = self.turn.with_context_window(context);
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.turn = self.turn.with_system_prompt(system_prompt);
        self
    }

    pub fn turn(&self) -> &LlmTurn {
        &self.turn
    }
}

#[async_trait]
impl Agent for LlmAgent {
    fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    async fn handle(
        &self,
        conversation: &[AgentMessage],
        instruction: Option<&str>,
        cancellation: &CancellationSignal,
    ) -> Option<AgentMessage> {
        let outcome = self
            .turn
            .generate(conversation, instruction, cancellation)
            .await;
        outcome_to_message(&self.descriptor, outcome)
    }
}

/// Deterministic, offline agent with a fixed template per role.
pub struct ScriptedAgent {
    descriptor: AgentDescriptor,
}

impl ScriptedAgent {
    pub fn new(role: AgentRole) -> Self {
        Self {
            descriptor: AgentDescriptor::for_role(role),
        }
    }

    pub fn with_descriptor(descriptor: AgentDescriptor) -> Self {
        Self { descriptor }
    }

    fn reply(&self, instruction: Option<&str>) -> String {
        let instruction = instruction.filter(|i| !i.trim().is_empty());
        match (self.descriptor.role, instruction) {
            (AgentRole::ProductManager, Some(i)) => format!("Product manager refines: {}", i),
            (AgentRole::ProductManager, None) => {
                "Product manager defines the scope: create a small feature - hello world endpoint and tests.".to_string()
            }
            (AgentRole::Architect, Some(i)) => format!("Architect proposes a design for: {}", i),
            (AgentRole::Architect, None) => {
                "Architect proposes: one HTTP controller, a service layer and an in-memory store.".to_string()
            }
            (AgentRole::Developer, Some(i)) => format!("Developer implements: {}", i),
            (AgentRole::Developer, None) => {
                "Developer implements: minimal API controller with a HelloWorld endpoint.".to_string()
            }
            (AgentRole::Tester, _) => {
                "Tester validates: unit tests for the endpoint and an integration test for the happy path.".to_string()
            }
            (AgentRole::ReleaseManager, _) => {
                "Release manager approves: tests pass, changelog updated, ready to deploy.".to_string()
            }
        }
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    async fn handle(
        &self,
        _conversation: &[AgentMessage],
        instruction: Option<&str>,
        _cancellation: &CancellationSignal,
    ) -> Option<AgentMessage> {
        Some(AgentMessage::from_descriptor(
            &self.descriptor,
            self.reply(instruction),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_failures_read_as_errors() {
        let err = GenerationError::Status {
            status: 503,
            reason: Some("Service Unavailable".to_string()),
            body: String::new(),
        };
        assert_eq!(
            diagnostic_content(AgentRole::Tester, &err),
            "Tester Error: HTTP 503 Service Unavailable"
        );
    }

    #[test]
    fn transport_failures_read_as_exceptions() {
        let err = GenerationError::Transport("connection refused".to_string());
        assert_eq!(
            diagnostic_content(AgentRole::Developer, &err),
            "Developer Exception: Transport failure: connection refused"
        );
    }

    #[test]
    fn blank_generation_is_replaced_by_a_placeholder() {
        let d = AgentDescriptor::for_role(AgentRole::ReleaseManager);
        let msg = outcome_to_message(&d, Ok("   ".to_string())).unwrap();
        assert_eq!(msg.content, "[ReleaseManager] Empty response.");
        assert_eq!(msg.from, "rm");
    }

    #[test]
    fn requested_cancellation_abstains() {
        let d = AgentDescriptor::for_role(AgentRole::Developer);
        assert!(outcome_to_message(&d, Err(GenerationError::Cancelled)).is_none());
    }

    #[tokio::test]
    async fn scripted_product_manager_refines_the_instruction() {
        let pm = ScriptedAgent::new(AgentRole::ProductManager);
        let msg = pm
            .handle(&[], Some("Build a payment module"), &CancellationSignal::new())
            .await
            .unwrap();
        assert_eq!(msg.content, "Product manager refines: Build a payment module");
        assert_eq!(msg.role, AgentRole::ProductManager);
    }

    #[tokio::test]
    async fn scripted_developer_falls_back_without_instruction() {
        let dev = ScriptedAgent::new(AgentRole::Developer);
        let msg = dev
            .handle(&[], Some(" "), &CancellationSignal::new())
            .await
            .unwrap();
        assert!(msg.content.contains("HelloWorld"));
    }
}

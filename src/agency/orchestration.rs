//! Role pipeline orchestration.
//!
//! The [`Orchestrator`] turns one initial prompt into a development
//! conversation by running a fixed sequence of roles, one after another:
//!
//! ```text
//! ProductManager → Architect (optional) → Developer → Tester → ReleaseManager
//! ```
//!
//! Each step hands the registered agent a snapshot of the log and an
//! instruction chosen by the [`InstructionPolicy`], then appends the agent's
//! message (if any) **before** the next step starts, so no agent ever observes
//! a turn that happened after its own.
//!
//! # Failure model
//!
//! - A required role with no registered agent is a configuration error: the run
//!   is rejected with [`OrchestrationError::MissingRole`] before any step runs.
//! - The optional Architect role is skipped when absent.
//! - Backend failures never reach the orchestrator; agents turn them into
//!   diagnostic messages.
//! - Cancellation is checked before each step. A turn that comes back empty
//!   after cancellation was requested is reported as
//!   [`OrchestrationError::Interrupted`], never as an abstention. Messages
//!   appended before cancellation was observed stay in the log.
//! - A message is always attributed to the agent that produced it: `from` and
//!   `role` are re-stamped from the registered descriptor.
//!
//! # Logs
//!
//! By default every run gets a fresh [`ConversationLog`], which then becomes the
//! log returned by [`Orchestrator::get_conversation`]. Use
//! [`Orchestrator::with_shared_log`] to accumulate several runs in one log;
//! later runs then see earlier runs' turns in their context. The log is safe to
//! share, but concurrent runs on a shared log interleave their turns.
//!
//! # Example
//!
//! ```rust
//! use agency::agent::ScriptedAgent;
//! use agency::cancellation::CancellationSignal;
//! use agency::message::AgentRole;
//! use agency::orchestration::{AgentRegistry, Orchestrator};
//!
//! # tokio_test_block(async {
//! let mut registry = AgentRegistry::new();
//! for role in [AgentRole::ProductManager, AgentRole::Developer, AgentRole::Tester, AgentRole::ReleaseManager].iter() {
//!     registry.register(ScriptedAgent::new(*role)).unwrap();
//! }
//!
//! let orchestrator = Orchestrator::new(registry);
//! let summary = orchestrator
//!     .start_conversation("Build a payment module", &CancellationSignal::new())
//!     .await
//!     .unwrap();
//!
//! assert_eq!(summary.appended.len(), 4);
//! assert_eq!(orchestrator.get_conversation()[0].from, "pm");
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

use crate::agency::agent::Agent;
use crate::agency::cancellation::CancellationSignal;
use crate::agency::conversation::ConversationLog;
use crate::agency::event::{EventHandler, OrchestrationEvent};
use crate::agency::message::{AgentDescriptor, AgentMessage, AgentRole};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Errors surfaced to the caller of the orchestrator.
///
/// Backend failures are absent on purpose: agents absorb them into the
/// transcript.
///
/// ```
/// use agency::message::AgentRole;
/// use agency::orchestration::OrchestrationError;
///
/// let err = OrchestrationError::MissingRole(AgentRole::Developer);
/// assert_eq!(err.to_string(), "No agent registered for required role Developer");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationError {
    /// A required role has no registered agent. Raised before any step runs.
    MissingRole(AgentRole),

    /// A second agent was registered for a role that already has one.
    DuplicateRole {
        role: AgentRole,
        existing_id: String,
        rejected_id: String,
    },

    /// A second agent was registered under an id already in use.
    DuplicateId {
        id: String,
        existing_role: AgentRole,
        rejected_role: AgentRole,
    },

    /// The run stopped because cancellation was requested before `next_role`
    /// could start. Messages appended before that point remain in the log.
    Cancelled {
        next_role: AgentRole,
        messages_appended: usize,
    },

    /// Cancellation reached `role` while it was taking its turn and the turn
    /// produced nothing.
    Interrupted {
        role: AgentRole,
        messages_appended: usize,
    },
}

impl fmt::Display for OrchestrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestrationError::MissingRole(role) => {
                write!(f, "No agent registered for required role {}", role)
            }
            OrchestrationError::DuplicateRole {
                role,
                existing_id,
                rejected_id,
            } => write!(
                f,
                "Role {} already served by agent '{}', cannot register '{}'",
                role, existing_id, rejected_id
            ),
            OrchestrationError::DuplicateId {
                id,
                existing_role,
                rejected_role,
            } => write!(
                f,
                "Agent id '{}' already used by {}, cannot register it for {}",
                id, existing_role, rejected_role
            ),
            OrchestrationError::Cancelled {
                next_role,
                messages_appended,
            } => write!(
                f,
                "Run cancelled before {} ({} messages appended)",
                next_role, messages_appended
            ),
            OrchestrationError::Interrupted {
                role,
                messages_appended,
            } => write!(
                f,
                "Run cancelled during {} ({} messages appended)",
                role, messages_appended
            ),
        }
    }
}

impl Error for OrchestrationError {}

/// Agents keyed by the role they serve, at most one per role and one per id.
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<AgentRole, Arc<dyn Agent>>,
    /// Registration order, used by [`AgentRegistry::descriptors`].
    order: Vec<AgentRole>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of agents, failing on the first duplicate
    /// role or id.
    pub fn from_agents<I>(agents: I) -> Result<Self, OrchestrationError>
    where
        I: IntoIterator<Item = Arc<dyn Agent>>,
    {
        let mut registry = Self::new();
        for agent in agents {
            registry.register_shared(agent)?;
        }
        Ok(registry)
    }

    pub fn register<A>(&mut self, agent: A) -> Result<(), OrchestrationError>
    where
        A: Agent + 'static,
    {
        self.register_shared(Arc::new(agent))
    }

    pub fn register_shared(&mut self, agent: Arc<dyn Agent>) -> Result<(), OrchestrationError> {
        let role = agent.descriptor().role;
        if let Some(existing) = self.agents.get(&role) {
            return Err(OrchestrationError::DuplicateRole {
                role,
                existing_id: existing.descriptor().id.clone(),
                rejected_id: agent.descriptor().id.clone(),
            });
        }
        let id = &agent.descriptor().id;
        if let Some(existing) = self.agents.values().find(|a| &a.descriptor().id == id) {
            return Err(OrchestrationError::DuplicateId {
                id: id.clone(),
                existing_role: existing.descriptor().role,
                rejected_role: role,
            });
        }
        self.order.push(role);
        self.agents.insert(role, agent);
        Ok(())
    }

    pub fn get(&self, role: AgentRole) -> Option<&Arc<dyn Agent>> {
        self.agents.get(&role)
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> Vec<AgentDescriptor> {
        self.order
            .iter()
            .filter_map(|role| self.agents.get(role))
            .map(|agent| agent.descriptor().clone())
            .collect()
    }

    /// Fails with the first required role, in pipeline order, that has no agent.
    pub fn validate(&self) -> Result<(), OrchestrationError> {
        match AgentRole::PIPELINE
            .iter()
            .find(|role| role.is_required() && !self.agents.contains_key(*role))
        {
            Some(role) => Err(OrchestrationError::MissingRole(*role)),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// What a [`InstructionSource::Custom`] closure can look at.
pub struct InstructionContext<'a> {
    pub role: AgentRole,
    pub initial_prompt: &'a str,
    /// Messages appended so far during this run, oldest first.
    pub run_messages: &'a [AgentMessage],
}

/// Where a role's instruction comes from.
#[derive(Clone)]
pub enum InstructionSource {
    /// The role runs without an instruction.
    None,
    /// The prompt passed to [`Orchestrator::start_conversation`].
    InitialPrompt,
    /// Raw content of the message the given role appended earlier in this run.
    /// Yields no instruction when that role abstained or was skipped.
    ContentOf(AgentRole),
    /// Arbitrary derivation, e.g. a templated rewrite of an earlier message.
    Custom(Arc<dyn Fn(&InstructionContext<'_>) -> Option<String> + Send + Sync>),
}

impl fmt::Debug for InstructionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstructionSource::None => f.write_str("None"),
            InstructionSource::InitialPrompt => f.write_str("InitialPrompt"),
            InstructionSource::ContentOf(role) => write!(f, "ContentOf({})", role),
            InstructionSource::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Per-role instruction sources.
///
/// Defaults:
///
/// | Role | Instruction |
/// |------|-------------|
/// | ProductManager | initial prompt |
/// | Architect | initial prompt |
/// | Developer | ProductManager's content |
/// | Tester | none |
/// | ReleaseManager | none |
#[derive(Debug, Clone)]
pub struct InstructionPolicy {
    sources: HashMap<AgentRole, InstructionSource>,
}

impl InstructionPolicy {
    pub fn with_source(mut self, role: AgentRole, source: InstructionSource) -> Self {
        self.sources.insert(role, source);
        self
    }

    pub fn source(&self, role: AgentRole) -> &InstructionSource {
        self.sources.get(&role).unwrap_or(&InstructionSource::None)
    }

    /// The instruction `role` should receive at this point of the run.
    pub fn resolve(&self, ctx: &InstructionContext<'_>) -> Option<String> {
        match self.source(ctx.role) {
            InstructionSource::None => None,
            InstructionSource::InitialPrompt => Some(ctx.initial_prompt.to_string()),
            InstructionSource::ContentOf(source_role) => ctx
                .run_messages
                .iter()
                .rev()
                .find(|m| m.role == *source_role)
                .map(|m| m.content.clone()),
            InstructionSource::Custom(derive) => derive(ctx),
        }
    }
}

impl Default for InstructionPolicy {
    fn default() -> Self {
        let mut sources = HashMap::new();
        sources.insert(AgentRole::ProductManager, InstructionSource::InitialPrompt);
        sources.insert(AgentRole::Architect, InstructionSource::InitialPrompt);
        sources.insert(
            AgentRole::Developer,
            InstructionSource::ContentOf(AgentRole::ProductManager),
        );
        sources.insert(AgentRole::Tester, InstructionSource::None);
        sources.insert(AgentRole::ReleaseManager, InstructionSource::None);
        Self { sources }
    }
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: String,
    /// Roles whose message was appended, in order.
    pub appended: Vec<AgentRole>,
    /// Roles whose agent ran but had nothing to add.
    pub abstained: Vec<AgentRole>,
    /// Optional roles with no registered agent.
    pub skipped: Vec<AgentRole>,
    /// The log this run wrote to.
    pub log: Arc<ConversationLog>,
}

/// Drives the fixed role pipeline over a [`ConversationLog`].
pub struct Orchestrator {
    registry: AgentRegistry,
    policy: InstructionPolicy,
    current_log: RwLock<Arc<ConversationLog>>,
    shared_log: bool,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl Orchestrator {
    pub fn new(registry: AgentRegistry) -> Self {
        Self {
            registry,
            policy: InstructionPolicy::default(),
            current_log: RwLock::new(Arc::new(ConversationLog::new())),
            shared_log: false,
            event_handler: None,
        }
    }

    pub fn with_instruction_policy(mut self, policy: InstructionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Append every run to `log` instead of starting a fresh log per run.
    pub fn with_shared_log(mut self, log: Arc<ConversationLog>) -> Self {
        self.current_log = RwLock::new(log);
        self.shared_log = true;
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Descriptors of the registered agents, in registration order.
    pub fn get_agents(&self) -> Vec<AgentDescriptor> {
        self.registry.descriptors()
    }

    /// Snapshot of the current log: the latest run's, or the shared log.
    pub fn get_conversation(&self) -> Vec<AgentMessage> {
        self.conversation_log().get_all()
    }

    pub fn conversation_log(&self) -> Arc<ConversationLog> {
        Arc::clone(
            &self
                .current_log
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    fn begin_log(&self) -> Arc<ConversationLog> {
        let mut current = self
            .current_log
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !self.shared_log {
            *current = Arc::new(ConversationLog::new());
        }
        Arc::clone(&current)
    }

    async fn emit(&self, event: OrchestrationEvent) {
        if let Some(handler) = &self.event_handler {
            handler.on_orchestration_event(&event).await;
        }
    }

    /// Run the whole pipeline once for `initial_prompt`.
    ///
    /// # Errors
    ///
    /// - [`OrchestrationError::MissingRole`] when a required role has no agent;
    ///   nothing is appended and the current log is left as it was.
    /// - [`OrchestrationError::Cancelled`] when `cancellation` fires between
    ///   steps, and [`OrchestrationError::Interrupted`] when it empties a turn
    ///   in flight. Steps already completed keep their messages.
    pub async fn start_conversation(
        &self,
        initial_prompt: &str,
        cancellation: &CancellationSignal,
    ) -> Result<RunSummary, OrchestrationError> {
        if let Err(err) = self.registry.validate() {
            log::error!("refusing to start conversation: {}", err);
            return Err(err);
        }

        let log = self.begin_log();
        let run_id = Uuid::new_v4().to_string();
        let mut run_messages: Vec<AgentMessage> = Vec::new();
        let mut summary = RunSummary {
            run_id: run_id.clone(),
            appended: Vec::new(),
            abstained: Vec::new(),
            skipped: Vec::new(),
            log: Arc::clone(&log),
        };

        log::info!(
            "run {} started with {} agents",
            run_id,
            self.registry.len()
        );
        self.emit(OrchestrationEvent::RunStarted {
            run_id: run_id.clone(),
            agent_count: self.registry.len(),
        })
        .await;

        for role in AgentRole::PIPELINE.iter().copied() {
            if cancellation.is_cancelled() {
                log::info!("run {} cancelled before {}", run_id, role);
                self.emit(OrchestrationEvent::RunCancelled {
                    run_id: run_id.clone(),
                    next_role: role,
                    messages_appended: summary.appended.len(),
                })
                .await;
                return Err(OrchestrationError::Cancelled {
                    next_role: role,
                    messages_appended: summary.appended.len(),
                });
            }

            let agent = match self.registry.get(role) {
                Some(agent) => Arc::clone(agent),
                None => {
                    // validate() guarantees only optional roles get here.
                    log::warn!("run {}: no {} registered, skipping", run_id, role);
                    summary.skipped.push(role);
                    self.emit(OrchestrationEvent::RoleSkipped {
                        run_id: run_id.clone(),
                        role,
                    })
                    .await;
                    continue;
                }
            };
            let descriptor = agent.descriptor().clone();
            let agent_id = descriptor.id.clone();

            // The product manager opens the run and sees nothing before it.
            let snapshot = if role == AgentRole::ProductManager {
                Vec::new()
            } else {
                log.get_all()
            };
            let instruction = self.policy.resolve(&InstructionContext {
                role,
                initial_prompt,
                run_messages: &run_messages,
            });

            log::info!("run {}: {} ({}) taking its turn", run_id, role, agent_id);
            self.emit(OrchestrationEvent::RoleStarted {
                run_id: run_id.clone(),
                role,
                agent_id: agent_id.clone(),
            })
            .await;

            match agent
                .handle(&snapshot, instruction.as_deref(), cancellation)
                .await
            {
                Some(mut message) if !message.is_blank() => {
                    if message.from != descriptor.id || message.role != descriptor.role {
                        log::warn!(
                            "run {}: {} ({}) returned a message attributed to {} ({}), re-attributing",
                            run_id,
                            role,
                            agent_id,
                            message.role,
                            message.from
                        );
                        message.from = descriptor.id.clone();
                        message.role = descriptor.role;
                    }
                    let response_length = message.content.len();
                    let log_index = log.add(message.clone());
                    run_messages.push(message);
                    summary.appended.push(role);
                    self.emit(OrchestrationEvent::AgentResponded {
                        run_id: run_id.clone(),
                        role,
                        agent_id,
                        log_index,
                        response_length,
                    })
                    .await;
                }
                _ if cancellation.is_cancelled() => {
                    log::info!(
                        "run {}: {} ({}) interrupted by cancellation",
                        run_id,
                        role,
                        agent_id
                    );
                    self.emit(OrchestrationEvent::TurnInterrupted {
                        run_id: run_id.clone(),
                        role,
                        agent_id,
                        messages_appended: summary.appended.len(),
                    })
                    .await;
                    return Err(OrchestrationError::Interrupted {
                        role,
                        messages_appended: summary.appended.len(),
                    });
                }
                other => {
                    if other.is_some() {
                        log::warn!(
                            "run {}: {} ({}) returned blank content, treating as abstention",
                            run_id,
                            role,
                            agent_id
                        );
                    } else {
                        log::warn!("run {}: {} ({}) abstained", run_id, role, agent_id);
                    }
                    summary.abstained.push(role);
                    self.emit(OrchestrationEvent::AgentAbstained {
                        run_id: run_id.clone(),
                        role,
                        agent_id,
                    })
                    .await;
                }
            }
        }

        log::info!(
            "run {} completed: {} messages appended",
            run_id,
            summary.appended.len()
        );
        self.emit(OrchestrationEvent::RunCompleted {
            run_id,
            messages_appended: summary.appended.len(),
        })
        .await;

        Ok(summary)
    }
}

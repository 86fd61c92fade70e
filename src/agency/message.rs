//! Message model shared by every other module.
//!
//! [`AgentDescriptor`] identifies an agent, [`AgentRole`] names the part it
//! plays in the pipeline and [`AgentMessage`] is a single turn recorded in the
//! [`ConversationLog`](crate::conversation::ConversationLog). All three are
//! plain values: they carry no behavior and are never mutated once built.
//!
//! # Example
//!
//! ```
//! use agency::message::{AgentDescriptor, AgentMessage, AgentRole};
//!
//! let dev = AgentDescriptor::new("dev", AgentRole::Developer).with_parent("pm");
//! let msg = AgentMessage::from_descriptor(&dev, "Implemented the endpoint.");
//!
//! assert_eq!(msg.from, "dev");
//! assert_eq!(msg.role, AgentRole::Developer);
//! assert_eq!(dev.parent_id.as_deref(), Some("pm"));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of roles an agent can play.
///
/// The declaration order is the order in which the orchestrator runs them.
/// [`AgentRole::Architect`] is the optional auxiliary step: a pipeline without
/// an architect is still complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentRole {
    ProductManager,
    Architect,
    Developer,
    Tester,
    ReleaseManager,
}

impl AgentRole {
    /// Every role in pipeline order.
    pub const PIPELINE: [AgentRole; 5] = [
        AgentRole::ProductManager,
        AgentRole::Architect,
        AgentRole::Developer,
        AgentRole::Tester,
        AgentRole::ReleaseManager,
    ];

    /// Whether a run must fail when no agent is registered for this role.
    pub fn is_required(self) -> bool {
        !matches!(self, AgentRole::Architect)
    }

    /// PascalCase name used in prompts, logs and serialized messages.
    pub fn as_str(self) -> &'static str {
        match self {
            AgentRole::ProductManager => "ProductManager",
            AgentRole::Architect => "Architect",
            AgentRole::Developer => "Developer",
            AgentRole::Tester => "Tester",
            AgentRole::ReleaseManager => "ReleaseManager",
        }
    }

    /// Id given to an agent of this role when the caller does not pick one.
    pub fn default_agent_id(self) -> &'static str {
        match self {
            AgentRole::ProductManager => "pm",
            AgentRole::Architect => "architect",
            AgentRole::Developer => "dev",
            AgentRole::Tester => "qa",
            AgentRole::ReleaseManager => "rm",
        }
    }

    /// Fixed system prompt that opens every LLM prompt built for this role.
    pub fn system_prompt(self) -> &'static str {
        match self {
            AgentRole::ProductManager => {
                "You are a Product Manager. Turn the request into a clear, scoped feature description with acceptance criteria."
            }
            AgentRole::Architect => {
                "You are a Software Architect. Propose the structure, components and interfaces needed to build the requested feature."
            }
            AgentRole::Developer => {
                "You are a Developer. Implement the requested feature with clean, idiomatic code and explain the key decisions."
            }
            AgentRole::Tester => {
                "You are a QA tester. Write relevant unit and integration tests to validate code behavior."
            }
            AgentRole::ReleaseManager => {
                "You are a Release Manager. Verify that the release is stable, documented and ready to be deployed."
            }
        }
    }

    /// Whether agents of this role use the instruction handed to them by the
    /// orchestrator when building their prompt.
    pub fn consumes_instruction(self) -> bool {
        matches!(
            self,
            AgentRole::ProductManager | AgentRole::Architect | AgentRole::Developer
        )
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown role name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown agent role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for AgentRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentRole::PIPELINE
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Identity of one agent instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDescriptor {
    /// Unique per agent instance (e.g. `"pm"`, `"dev"`).
    pub id: String,
    pub role: AgentRole,
    /// Delegation hint only. The orchestrator never routes on it.
    pub parent_id: Option<String>,
}

impl AgentDescriptor {
    pub fn new(id: impl Into<String>, role: AgentRole) -> Self {
        Self {
            id: id.into(),
            role,
            parent_id: None,
        }
    }

    /// Descriptor using the role's default id.
    pub fn for_role(role: AgentRole) -> Self {
        Self::new(role.default_agent_id(), role)
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

/// One turn of the conversation.
///
/// Messages are compared by value, timestamp included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessage {
    /// Id of the producing agent.
    pub from: String,
    /// Role of the producing agent.
    pub role: AgentRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl AgentMessage {
    pub fn new(
        from: impl Into<String>,
        role: AgentRole,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            from: from.into(),
            role,
            content: content.into(),
            timestamp,
        }
    }

    /// A message attributed to `descriptor`, stamped with the current time.
    pub fn from_descriptor(descriptor: &AgentDescriptor, content: impl Into<String>) -> Self {
        Self::new(descriptor.id.clone(), descriptor.role, content, Utc::now())
    }

    /// `true` when the content carries no visible text.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_round_trip_through_from_str() {
        for role in AgentRole::PIPELINE.iter() {
            assert_eq!(role.as_str().parse::<AgentRole>(), Ok(*role));
        }
        assert_eq!(
            "Janitor".parse::<AgentRole>(),
            Err(UnknownRole("Janitor".to_string()))
        );
    }

    #[test]
    fn only_the_architect_is_optional() {
        let optional: Vec<_> = AgentRole::PIPELINE
            .iter()
            .filter(|r| !r.is_required())
            .collect();
        assert_eq!(optional, vec![&AgentRole::Architect]);
    }

    #[test]
    fn messages_with_equal_fields_are_equal() {
        let at = Utc::now();
        let a = AgentMessage::new("pm", AgentRole::ProductManager, "scope", at);
        let b = AgentMessage::new("pm", AgentRole::ProductManager, "scope", at);
        assert_eq!(a, b);
        assert_ne!(a, AgentMessage::new("pm", AgentRole::ProductManager, "other", at));
    }

    #[test]
    fn message_serializes_with_camel_case_fields() {
        let descriptor = AgentDescriptor::for_role(AgentRole::Tester).with_parent("dev");
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["id"], "qa");
        assert_eq!(json["role"], "Tester");
        assert_eq!(json["parentId"], "dev");
    }

    #[test]
    fn blank_content_is_detected() {
        let d = AgentDescriptor::for_role(AgentRole::Developer);
        assert!(AgentMessage::from_descriptor(&d, "  \n").is_blank());
        assert!(!AgentMessage::from_descriptor(&d, "code").is_blank());
    }
}

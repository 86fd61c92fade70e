//! Prompt assembly for LLM-backed agents.
//!
//! A [`ContextWindow`] turns a role's system prompt, an optional instruction
//! and the conversation so far into one prompt string:
//!
//! ```text
//! <system prompt>
//! Instruction: <instruction>        (only when the instruction is not blank)
//!
//! Context:                          (only when the conversation is not empty)
//! <Role> (<From>): <Content>        (the most recent `max_messages`, oldest first)
//! ```
//!
//! Older turns are dropped, not summarized.

use crate::agency::message::AgentMessage;

/// Number of trailing messages included when no other bound is configured.
pub const DEFAULT_CONTEXT_MESSAGES: usize = 12;

/// Builds prompts over a bounded tail of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextWindow {
    max_messages: usize,
}

impl ContextWindow {
    /// Window over the last `max_messages` turns. Zero is raised to one.
    pub fn new(max_messages: usize) -> Self {
        Self {
            max_messages: max_messages.max(1),
        }
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// The slice of `conversation` that fits in the window, oldest first.
    pub fn window<'a>(&self, conversation: &'a [AgentMessage]) -> &'a [AgentMessage] {
        let start = conversation.len().saturating_sub(self.max_messages);
        &conversation[start..]
    }

    /// Assemble the full prompt.
    ///
    /// # Example
    ///
    /// ```
    /// use agency::context_window::ContextWindow;
    /// use agency::message::{AgentDescriptor, AgentMessage, AgentRole};
    ///
    /// let pm = AgentDescriptor::for_role(AgentRole::ProductManager);
    /// let history = vec![AgentMessage::from_descriptor(&pm, "Build a login page")];
    ///
    /// let prompt = ContextWindow::default().build("You are a Developer.", Some("Use OAuth"), &history);
    /// assert_eq!(
    ///     prompt,
    ///     "You are a Developer.\nInstruction: Use OAuth\n\nContext:\nProductManager (pm): Build a login page\n"
    /// );
    /// ```
    pub fn build(
        &self,
        system_prompt: &str,
        instruction: Option<&str>,
        conversation: &[AgentMessage],
    ) -> String {
        let mut prompt = String::with_capacity(system_prompt.len() + 64);
        prompt.push_str(system_prompt);
        prompt.push('\n');

        if let Some(instruction) = instruction.filter(|i| !i.trim().is_empty()) {
            prompt.push_str("Instruction: ");
            prompt.push_str(instruction);
            prompt.push('\n');
        }

        if !conversation.is_empty() {
            prompt.push_str("\nContext:\n");
            for msg in self.window(conversation) {
                prompt.push_str(&format!("{} ({}): {}\n", msg.role, msg.from, msg.content));
            }
        }

        prompt
    }
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_MESSAGES)
    }
}

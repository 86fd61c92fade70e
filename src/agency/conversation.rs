//! Append-only conversation log.
//!
//! The [`ConversationLog`] is the single record of everything the agents said
//! during a run. Messages are only ever appended; nothing is edited, removed or
//! reordered afterwards, so a message's index is stable for the lifetime of the
//! log. Readers always receive an owned copy and can never affect the log.
//!
//! The log guards its storage with a lock, so sharing one instance between
//! concurrent runs is memory safe. It does not, however, keep those runs apart:
//! their turns interleave in whatever order they are appended.
//!
//! # Example
//!
//! ```
//! use agency::conversation::ConversationLog;
//! use agency::message::{AgentDescriptor, AgentMessage, AgentRole};
//!
//! let log = ConversationLog::new();
//! let pm = AgentDescriptor::for_role(AgentRole::ProductManager);
//!
//! let index = log.add(AgentMessage::from_descriptor(&pm, "Scope: login page"));
//! assert_eq!(index, 0);
//! assert_eq!(log.get_all().len(), 1);
//! ```

use crate::agency::message::AgentMessage;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Ordered, append-only store of [`AgentMessage`]s.
#[derive(Debug, Default)]
pub struct ConversationLog {
    messages: RwLock<Vec<AgentMessage>>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its 0-based position.
    pub fn add(&self, message: AgentMessage) -> usize {
        let mut messages = self.write();
        messages.push(message);
        messages.len() - 1
    }

    /// Point-in-time copy of every message, oldest first.
    pub fn get_all(&self) -> Vec<AgentMessage> {
        self.read().clone()
    }

    /// Messages appended at or after `cursor`.
    ///
    /// Polling transports keep the length they last saw and pass it back here
    /// to fetch only new turns. A cursor past the end yields an empty vector.
    pub fn get_since(&self, cursor: usize) -> Vec<AgentMessage> {
        let messages = self.read();
        messages.get(cursor..).map(<[_]>::to_vec).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock cannot leave a half-written Vec behind
    // (push either happened or not), so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, Vec<AgentMessage>> {
        self.messages
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<AgentMessage>> {
        self.messages
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agency::message::{AgentDescriptor, AgentRole};

    fn message(content: &str) -> AgentMessage {
        AgentMessage::from_descriptor(&AgentDescriptor::for_role(AgentRole::Developer), content)
    }

    #[test]
    fn add_returns_increasing_indices() {
        let log = ConversationLog::new();
        assert_eq!(log.add(message("a")), 0);
        assert_eq!(log.add(message("b")), 1);
        assert_eq!(log.add(message("c")), 2);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn get_all_preserves_insertion_order() {
        let log = ConversationLog::new();
        for content in ["first", "second", "third"].iter() {
            log.add(message(content));
        }
        let contents: Vec<_> = log.get_all().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn mutating_a_snapshot_leaves_the_log_untouched() {
        let log = ConversationLog::new();
        log.add(message("original"));

        let mut snapshot = log.get_all();
        snapshot.clear();
        snapshot.push(message("intruder"));

        let all = log.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].content, "original");
    }

    #[test]
    fn consecutive_reads_are_equal() {
        let log = ConversationLog::new();
        log.add(message("one"));
        log.add(message("two"));
        assert_eq!(log.get_all(), log.get_all());
    }

    #[test]
    fn get_since_returns_only_newer_messages() {
        let log = ConversationLog::new();
        log.add(message("old"));
        let cursor = log.len();
        log.add(message("new"));

        let newer = log.get_since(cursor);
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].content, "new");
        assert!(log.get_since(10).is_empty());
    }

    #[test]
    fn empty_log_reports_empty() {
        let log = ConversationLog::new();
        assert!(log.is_empty());
        assert!(log.get_all().is_empty());
    }
}

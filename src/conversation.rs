//! Append-only conversation log shared by every turn.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::llm::ChatMessage;
use crate::message::{Message, Role};

/// Ordered record of exchanged messages.
///
/// Cloning the log clones the handle, not the messages. There is no way to
/// remove or edit an entry once it has been appended.
#[derive(Clone, Debug, Default)]
pub struct ConversationLog {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl ConversationLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Message>> {
        // Appends never leave the vector half-written, so a poisoned lock still holds valid data.
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one message and return the new length.
    pub fn append(&self, role: Role, content: impl Into<String>) -> usize {
        self.push(Message::new(role, content))
    }

    /// Append an already-built message and return the new length.
    pub fn push(&self, message: Message) -> usize {
        let mut entries = self.entries();
        entries.push(message);
        entries.len()
    }

    /// Append a user message and its answer under a single lock acquisition.
    pub fn append_pair(&self, user: Message, reply: Message) -> usize {
        debug_assert_eq!(user.role, Role::User);
        debug_assert_eq!(reply.role, Role::Assistant);
        let mut entries = self.entries();
        entries.reserve(2);
        entries.push(user);
        entries.push(reply);
        entries.len()
    }

    /// Copy of every message in chronological order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.entries().clone()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// Convert messages to the wire format, leaving out failed-turn markers.
pub fn to_chat_messages(messages: &[Message]) -> Vec<ChatMessage> {
    messages
        .iter()
        .filter(|m| !m.is_failed_turn())
        .map(ChatMessage::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_returns_new_length() {
        let log = ConversationLog::new();
        assert!(log.is_empty());
        assert_eq!(log.append(Role::User, "one"), 1);
        assert_eq!(log.append(Role::Assistant, "two"), 2);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_snapshot_is_detached_from_later_appends() {
        let log = ConversationLog::new();
        log.append(Role::User, "Hello");
        let snapshot = log.snapshot();
        log.append(Role::Assistant, "Hi");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_clones_share_storage() {
        let log = ConversationLog::new();
        let other = log.clone();
        other.append(Role::User, "shared");
        assert_eq!(log.snapshot(), vec![Message::user("shared")]);
    }

    #[test]
    fn test_append_pair_keeps_order() {
        let log = ConversationLog::new();
        let len = log.append_pair(Message::user("q"), Message::assistant("a"));
        assert_eq!(len, 2);
        let entries = log.snapshot();
        assert_eq!(entries[0].role, Role::User);
        assert_eq!(entries[1].role, Role::Assistant);
    }

    #[test]
    fn test_pairs_from_many_threads_never_split() {
        let log = ConversationLog::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        let tag = format!("{i}-{j}");
                        log.append_pair(Message::user(tag.clone()), Message::assistant(tag));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entries = log.snapshot();
        assert_eq!(entries.len(), 8 * 50 * 2);
        for pair in entries.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
            assert_eq!(pair[0].content, pair[1].content);
        }
    }

    #[test]
    fn test_wire_messages_skip_failed_markers() {
        let messages = vec![
            Message::user("first"),
            Message::failed_turn("connection reset"),
            Message::user("second"),
        ];
        let wire = to_chat_messages(&messages);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, "user");
        assert_eq!(wire[1].content, "second");
    }
}

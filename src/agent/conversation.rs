//! Conversation history for one session.

use crate::llm::{Message, Role};

/// Ordered message history. Grows for the whole session; nothing is evicted.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. Roles are expected to alternate, starting with the user.
    pub fn push(&mut self, message: Message) {
        let expected = match self.messages.last() {
            Some(last) if last.role == Role::User => Role::Model,
            _ => Role::User,
        };
        if message.role != expected {
            tracing::warn!(
                role = ?message.role,
                expected = ?expected,
                "Conversation roles out of order"
            );
        }
        debug_assert_eq!(message.role, expected, "conversation roles must alternate");
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

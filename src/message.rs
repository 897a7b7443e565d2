/// Represents who sent a message in the conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Returns the display prefix for this role.
    pub fn prefix(&self) -> &'static str {
        match self {
            Role::User => "You: ",
            Role::Assistant => "Agent: ",
        }
    }

    /// Returns the role name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Distinguishes a real reply from the marker left by a turn that failed mid-stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MessageKind {
    #[default]
    Reply,
    Failed,
}

/// A single message in the conversation log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub kind: MessageKind,
}

impl Message {
    /// Create a new message with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            kind: MessageKind::Reply,
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create the assistant-side marker for a turn that failed after the request was sent.
    pub fn failed_turn(error: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: error.into(),
            kind: MessageKind::Failed,
        }
    }

    /// Check if this message marks a failed turn.
    pub fn is_failed_turn(&self) -> bool {
        self.kind == MessageKind::Failed
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a message within a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single turn in a thread.
///
/// `partial` marks an assistant message that is still receiving stream
/// increments. It is transient: it is never written to the backend and
/// defaults to `false` when a message is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: crate::new_id(),
            role,
            content: content.into(),
            created_at: Utc::now(),
            partial: false,
        }
    }

    /// User message with a client-generated id
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Complete assistant message with a known id
    pub fn assistant(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
            partial: false,
        }
    }

    /// Assistant snapshot produced while a response streams in
    pub fn snapshot(id: impl Into<String>, content: impl Into<String>, partial: bool) -> Self {
        Self {
            partial,
            ..Self::assistant(id, content)
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Same message with new content; id, role and timestamp are kept.
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_flag_is_transient() {
        let msg = Message::snapshot("msg_1", "Hel", true);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"partial\":true"));

        let done = Message::snapshot("msg_1", "Hello", false);
        let json = serde_json::to_string(&done).unwrap();
        assert!(!json.contains("partial"));

        let loaded: Message = serde_json::from_str(&json).unwrap();
        assert!(!loaded.partial);
        assert_eq!(loaded.role, Role::Assistant);
    }

    #[test]
    fn test_with_content_keeps_identity() {
        let original = Message::user("hi");
        let edited = original.with_content("hello");

        assert_eq!(edited.id, original.id);
        assert_eq!(edited.role, Role::User);
        assert_eq!(edited.created_at, original.created_at);
        assert_eq!(edited.content, "hello");
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        let role: Role = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(role, Role::System);
        assert_eq!(Role::User.to_string(), "user");
    }
}

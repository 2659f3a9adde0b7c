//! Turn and session domain types.
//!
//! A turn is the unit of conversation history: one role-tagged piece of
//! text. These values flow from the user through the orchestrator into
//! conversation memory and out to the structured-request collaborator.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an orchestrator session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The model, or the orchestrator speaking on its behalf
    Assistant,
    /// Out-of-band context such as tool outcomes
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

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single role-tagged message in a conversation.
///
/// Serializes as `{"role": "...", "content": "..."}`, which is also the
/// persisted form accepted by [`ConversationMemory::load`](crate::memory::ConversationMemory::load).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Rough token count (4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.content.len().div_ceil(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_turn() {
        let turn = Turn::user("Hello, agent!");
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.content, "Hello, agent!");
    }

    #[test]
    fn turn_wire_format() {
        let json = serde_json::to_value(Turn::assistant("4")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "4"}));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let parsed: Result<Turn, _> =
            serde_json::from_value(serde_json::json!({"role": "tool", "content": "x"}));
        assert!(parsed.is_err());
    }

    #[test]
    fn empty_content_is_a_valid_turn() {
        let parsed: Turn =
            serde_json::from_value(serde_json::json!({"role": "assistant", "content": ""})).unwrap();
        assert_eq!(parsed, Turn::assistant(""));
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(Turn::user("hello").estimated_tokens(), 2);
        assert_eq!(Turn::user("test").estimated_tokens(), 1);
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert_eq!(SessionId::from("abc").to_string(), "abc");
    }
}

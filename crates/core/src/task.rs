//! Task domain types.
//!
//! A task is always owned by exactly one user. Ownership is established at
//! creation from the authenticated caller and checked on every read and
//! write; there is no sharing and no admin override.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum accepted title length, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum accepted description length, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// The identity of the user a request acts on behalf of.
///
/// Resolved from the bearer token by the gateway and threaded explicitly
/// through every store and tool call. Never read out of model output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task priority. Stored as lowercase text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single to-do item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned ID, unique within a backend, never reused.
    pub id: i64,

    /// The owning user. Every query is scoped by this.
    pub owner_id: UserId,

    /// Short summary. Non-empty after trimming, at most [`MAX_TITLE_LEN`] chars.
    pub title: String,

    /// Longer detail. May be empty, at most [`MAX_DESCRIPTION_LEN`] chars.
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub completed: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// The task as exposed to the model in tool results.
    ///
    /// Omits `owner_id`: the model never sees or supplies user identifiers.
    pub fn to_tool_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "title": self.title,
            "description": self.description,
            "priority": self.priority,
            "completed": self.completed,
            "created_at": self.created_at.to_rfc3339(),
            "updated_at": self.updated_at.to_rfc3339(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parses_lowercase_only() {
        assert_eq!(Priority::parse("high"), Some(Priority::High));
        assert_eq!(Priority::parse("High"), None);
        assert_eq!(Priority::parse("urgent"), None);
    }

    #[test]
    fn priority_default_is_medium() {
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn tool_payload_omits_owner() {
        let task = Task {
            id: 7,
            owner_id: UserId::new("alice"),
            title: "Buy milk".into(),
            description: String::new(),
            priority: Priority::High,
            completed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let payload = task.to_tool_payload();
        assert_eq!(payload["id"], 7);
        assert_eq!(payload["priority"], "high");
        assert!(payload.get("owner_id").is_none());
    }
}

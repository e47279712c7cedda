use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_AGENT_ROLE;

/// Execution state of an AI worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Idle,
    Active,
    Waiting,
    Error,
}

impl AgentStatus {
    /// Parse from backend status strings.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "idle" | "ready" => Self::Idle,
            "active" | "running" | "working" | "streaming" => Self::Active,
            "waiting" | "blocked" | "pending" => Self::Waiting,
            "error" | "failed" => Self::Error,
            _ => Self::Idle,
        }
    }
}

/// An AI worker instance scoped to a session.
///
/// Holds the owning session id as a plain back-reference; the session record
/// itself lives in its own map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub session_id: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub last_active_at: u64,
}

fn default_role() -> String {
    DEFAULT_AGENT_ROLE.to_string()
}

impl Agent {
    /// Minimal shell for an agent first seen through one of its events.
    pub fn placeholder(id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            role: DEFAULT_AGENT_ROLE.to_string(),
            model: None,
            status: AgentStatus::default(),
            conversation_id: None,
            last_active_at: 0,
        }
    }
}

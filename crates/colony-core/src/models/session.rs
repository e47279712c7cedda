use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SESSION_NAME, STANDBY_IDLE_TIMEOUT_SECS};

/// Lifecycle of a session's backing workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceStatus {
    #[default]
    Initializing,
    Ready,
    Busy,
    Offline,
}

impl WorkspaceStatus {
    /// Parse from backend status strings, tolerating a few synonyms.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "initializing" | "provisioning" | "starting" => Self::Initializing,
            "ready" | "online" | "idle" => Self::Ready,
            "busy" | "running" | "working" => Self::Busy,
            "offline" | "stopped" | "standby" => Self::Offline,
            _ => Self::Offline,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Ready | Self::Busy)
    }
}

/// Standby behavior for an idle session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandbySettings {
    pub enabled: bool,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_idle_timeout() -> u64 {
    STANDBY_IDLE_TIMEOUT_SECS
}

impl Default for StandbySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            idle_timeout_secs: STANDBY_IDLE_TIMEOUT_SECS,
        }
    }
}

/// Top-level unit containing agents and their conversations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub workspace_status: WorkspaceStatus,
    #[serde(default)]
    pub standby: StandbySettings,
    #[serde(default)]
    pub active_agent_id: Option<String>,
    #[serde(default)]
    pub created_at: u64,
    /// Set when this record was synthesized from an event referencing an
    /// unknown session. The UI should schedule a full refetch.
    #[serde(skip)]
    pub needs_refetch: bool,
}

impl Session {
    /// Minimal shell for a session we only know by id. Keeps events that
    /// arrive ahead of the session list from being dropped.
    pub fn placeholder(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            id,
            name: DEFAULT_SESSION_NAME.to_string(),
            branch: None,
            workspace_status: WorkspaceStatus::default(),
            standby: StandbySettings::default(),
            active_agent_id: None,
            created_at: 0,
            needs_refetch: true,
        }
    }
}

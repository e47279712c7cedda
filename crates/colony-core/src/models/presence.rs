use serde::{Deserialize, Serialize};

/// What a collaborator is currently doing in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PeerStatus {
    #[default]
    Viewing,
    Editing,
    Idle,
}

impl PeerStatus {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "editing" | "typing" => Self::Editing,
            "idle" | "away" => Self::Idle,
            _ => Self::Viewing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SharingMode {
    #[default]
    Private,
    ReadOnly,
    ReadWrite,
}

/// A cursor location inside the session's workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPosition {
    pub path: String,
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub anchor: CursorPosition,
    pub head: CursorPosition,
}

/// A peer's ephemeral state as reported by the shared-awareness channel.
///
/// Everything beyond the id is optional: peers show up as soon as their
/// identity is known, cursor and status trickle in afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPeerState {
    pub peer_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub cursor: Option<CursorPosition>,
    #[serde(default)]
    pub selection: Option<Selection>,
    #[serde(default)]
    pub sharing: Option<SharingMode>,
    #[serde(default)]
    pub joined_at: u64,
}

/// One roster row, derived fresh on every merge and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceEntry {
    pub peer_id: String,
    pub display_name: String,
    /// Stable palette color, keyed by a digest of the peer id.
    pub color: &'static str,
    pub status: PeerStatus,
    pub cursor: Option<CursorPosition>,
    pub selection: Option<Selection>,
    pub sharing: SharingMode,
}

/// Fallback display name for a peer without a profile yet.
pub fn short_peer_id(peer_id: &str) -> String {
    format!("{}...", &peer_id[..8.min(peer_id.len())])
}

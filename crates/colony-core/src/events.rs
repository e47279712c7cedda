use serde::Deserialize;
use serde_json::Value;

use crate::models::{Attention, Message, RawPeerState, Session};

/// An inbound event pushed by the backend orchestration service.
///
/// Field names follow the backend's JSON contract; the core does not own the
/// wire schema, it only consumes it. Every payload is a complete record -
/// never a delta - which is what makes redundant replay harmless.
///
/// `seq` is an optional per-session sequence number. Events carrying one are
/// subject to the reconciler's replay watermark; events without one are
/// applied as idempotent full-entity upserts.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    SessionUpdated {
        session: Session,
        #[serde(default)]
        seq: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    SessionDeleted {
        session_id: String,
        #[serde(default)]
        seq: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    WorkspaceStatus {
        session_id: String,
        status: String,
        #[serde(default)]
        seq: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    AgentStatus {
        session_id: String,
        agent_id: String,
        status: String,
        #[serde(default)]
        seq: Option<u64>,
    },
    /// Full agent record, sent on session attach and whenever an agent's
    /// configuration changes.
    #[serde(rename_all = "camelCase")]
    AgentUpdated {
        agent: crate::models::Agent,
        #[serde(default)]
        seq: Option<u64>,
    },
    /// A complete durable message: a new append, or an authoritative
    /// replacement for an earlier append sharing the same id.
    #[serde(rename_all = "camelCase")]
    AgentMessage {
        session_id: String,
        agent_id: String,
        message: Message,
        #[serde(default)]
        seq: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    StreamStart {
        session_id: String,
        agent_id: String,
        conversation_id: String,
        message_id: String,
    },
    /// Raw provider chunk, passed through untransformed. Text and thinking
    /// deltas are extracted by `streaming::StreamChunk`.
    #[serde(rename_all = "camelCase")]
    AgentStreamToken {
        session_id: String,
        agent_id: String,
        message_id: String,
        chunk: Value,
    },
    #[serde(rename_all = "camelCase")]
    StreamEnd {
        session_id: String,
        agent_id: String,
        message_id: String,
        #[serde(default)]
        final_content: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Attention {
        attention: Attention,
        #[serde(default)]
        seq: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    PresenceJoined {
        session_id: String,
        peer: RawPeerState,
    },
    #[serde(rename_all = "camelCase")]
    PresenceLeft {
        session_id: String,
        peer_id: String,
    },
}

impl ServerEvent {
    /// Parse from a raw JSON payload. Returns `None` for malformed or
    /// unknown events; the caller logs and moves on.
    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }

    /// Parse from a pre-parsed value (avoids double parsing).
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// The session this event belongs to, used to key the replay watermark.
    pub fn session_id(&self) -> &str {
        match self {
            Self::SessionUpdated { session, .. } => &session.id,
            Self::SessionDeleted { session_id, .. }
            | Self::WorkspaceStatus { session_id, .. }
            | Self::AgentStatus { session_id, .. }
            | Self::AgentMessage { session_id, .. }
            | Self::StreamStart { session_id, .. }
            | Self::AgentStreamToken { session_id, .. }
            | Self::StreamEnd { session_id, .. }
            | Self::PresenceJoined { session_id, .. }
            | Self::PresenceLeft { session_id, .. } => session_id,
            Self::AgentUpdated { agent, .. } => &agent.session_id,
            Self::Attention { attention, .. } => &attention.session_id,
        }
    }

    /// Per-session sequence number, when the transport supplies one.
    /// Stream events are intentionally unsequenced: token order is the
    /// arrival order within one stream, guarded by the accumulator itself.
    pub fn seq(&self) -> Option<u64> {
        match self {
            Self::SessionUpdated { seq, .. }
            | Self::SessionDeleted { seq, .. }
            | Self::WorkspaceStatus { seq, .. }
            | Self::AgentStatus { seq, .. }
            | Self::AgentUpdated { seq, .. }
            | Self::AgentMessage { seq, .. }
            | Self::Attention { seq, .. } => *seq,
            Self::StreamStart { .. }
            | Self::AgentStreamToken { .. }
            | Self::StreamEnd { .. }
            | Self::PresenceJoined { .. }
            | Self::PresenceLeft { .. } => None,
        }
    }

    /// Stable name for stats keying.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::SessionUpdated { .. } => "session_updated",
            Self::SessionDeleted { .. } => "session_deleted",
            Self::WorkspaceStatus { .. } => "workspace_status",
            Self::AgentStatus { .. } => "agent_status",
            Self::AgentUpdated { .. } => "agent_updated",
            Self::AgentMessage { .. } => "agent_message",
            Self::StreamStart { .. } => "stream_start",
            Self::AgentStreamToken { .. } => "agent_stream_token",
            Self::StreamEnd { .. } => "stream_end",
            Self::Attention { .. } => "attention",
            Self::PresenceJoined { .. } => "presence_joined",
            Self::PresenceLeft { .. } => "presence_left",
        }
    }
}

/// Notifications the core surfaces to the rendering layer after applying
/// events. The UI re-reads the store for the actual data.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    SessionChanged(String),
    ConversationUpdated { conversation_id: String },
    AttentionRaised(Attention),
    StreamOpened { message_id: String },
    StreamClosed { message_id: String },
    PresenceChanged { session_id: String },
}

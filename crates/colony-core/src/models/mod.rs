pub mod agent;
pub mod attention;
pub mod conversation;
pub mod message;
pub mod preferences;
pub mod presence;
pub mod session;

pub use agent::{Agent, AgentStatus};
pub use attention::{Attention, AttentionKind, AttentionPriority};
pub use conversation::Conversation;
pub use message::{Message, MessageRole, ToolCall};
pub use preferences::{NotificationPreferences, UserPreferences};
pub use presence::{
    short_peer_id, CursorPosition, PeerStatus, PresenceEntry, RawPeerState, Selection, SharingMode,
};
pub use session::{Session, StandbySettings, WorkspaceStatus};

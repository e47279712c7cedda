//! Application-wide constants
//!
//! Centralized location for magic strings and configuration values
//! that are used across multiple modules.

// Session defaults
pub const DEFAULT_SESSION_NAME: &str = "Untitled";

// Agent defaults
pub const DEFAULT_AGENT_ROLE: &str = "assistant";

/// Default idle timeout before a session is eligible for standby.
pub const STANDBY_IDLE_TIMEOUT_SECS: u64 = 30 * 60; // 30 minutes

/// Cap on retained messages per conversation. Oldest messages are evicted
/// first once a conversation grows past this.
pub const MAX_MESSAGES_PER_CONVERSATION: usize = 500;

/// Cap on retained attention items per session, dismissed ones included.
pub const MAX_ATTENTION_ITEMS_PER_SESSION: usize = 200;

/// Maximum length of the display snippet derived from message content
/// for attention items.
pub const ATTENTION_TITLE_MAX_CHARS: usize = 50;

/// A blur shorter than this is treated as focus noise (window manager
/// flicker, notification popups) rather than the user switching away.
pub const RECENT_UNFOCUS_THRESHOLD_SECS: u64 = 5;

/// Filename of the persisted user preferences, relative to the data dir.
pub const PREFERENCES_FILE: &str = "preferences.bin";

/// Fixed palette collaborator colors are hashed into. Indexed by a digest
/// of the peer id so the same peer renders the same color everywhere
/// without coordination.
pub const PRESENCE_PALETTE: [&str; 12] = [
    "#ef4444", // red
    "#f97316", // orange
    "#f59e0b", // amber
    "#84cc16", // lime
    "#22c55e", // green
    "#14b8a6", // teal
    "#06b6d4", // cyan
    "#3b82f6", // blue
    "#6366f1", // indigo
    "#8b5cf6", // violet
    "#d946ef", // fuchsia
    "#ec4899", // pink
];

//! In-flight token stream tracking.
//!
//! Streams accumulate here, keyed by message id, and merge into the durable
//! message exactly once on completion. Keeping the hot per-token path off the
//! entity store means a token append touches one buffer, not a message list.
//! The split also makes reconnect states distinguishable: a message id with
//! no entry and no durable record never started, one with only a durable
//! record completed, and one with a live entry was interrupted mid-stream.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::Message;
use crate::store::EntityStore;

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Accumulating buffers for one open stream. Exists only between the start
/// and end events; at most one per message id.
#[derive(Debug, Clone)]
pub struct StreamingMessage {
    pub message_id: String,
    pub agent_id: String,
    pub session_id: String,
    pub conversation_id: String,
    pub content: String,
    pub thinking: String,
    pub started_at: u64,
}

#[derive(Debug, Default)]
pub struct StreamingAccumulator {
    active: HashMap<String, StreamingMessage>,
}

impl StreamingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a stream and place the durable placeholder message.
    ///
    /// A second start for the same message id is a no-op: duplicate start
    /// events after a reconnect must not reset an accumulating buffer.
    /// Returns whether a new stream was opened.
    pub fn start(
        &mut self,
        store: &mut EntityStore,
        message_id: &str,
        agent_id: &str,
        session_id: &str,
        conversation_id: &str,
    ) -> bool {
        if self.active.contains_key(message_id) {
            tracing::debug!(message_id, "duplicate stream start ignored");
            return false;
        }

        let started_at = now_secs();
        self.active.insert(
            message_id.to_string(),
            StreamingMessage {
                message_id: message_id.to_string(),
                agent_id: agent_id.to_string(),
                session_id: session_id.to_string(),
                conversation_id: conversation_id.to_string(),
                content: String::new(),
                thinking: String::new(),
                started_at,
            },
        );

        store.insert_message(
            session_id,
            Message::streaming_placeholder(message_id, conversation_id, started_at),
        );
        true
    }

    /// Append a content token. No-op without an active entry, which guards
    /// late or duplicate chunks arriving after the stream ended.
    pub fn append_token(&mut self, message_id: &str, token: &str) -> bool {
        match self.active.get_mut(message_id) {
            Some(entry) => {
                entry.content.push_str(token);
                true
            }
            None => {
                tracing::debug!(message_id, "token for inactive stream ignored");
                false
            }
        }
    }

    /// Append a reasoning token. Same guard as `append_token`.
    pub fn append_thinking(&mut self, message_id: &str, token: &str) -> bool {
        match self.active.get_mut(message_id) {
            Some(entry) => {
                entry.thinking.push_str(token);
                true
            }
            None => {
                tracing::debug!(message_id, "thinking token for inactive stream ignored");
                false
            }
        }
    }

    /// Close a stream: remove the ephemeral entry and finalize the durable
    /// message in one step. When `final_content` is supplied it replaces the
    /// accumulated buffer as the authoritative text. Idempotent: a second
    /// end for the same id is a no-op.
    pub fn end(
        &mut self,
        store: &mut EntityStore,
        message_id: &str,
        final_content: Option<String>,
    ) -> bool {
        let Some(entry) = self.active.remove(message_id) else {
            tracing::debug!(message_id, "stream end for inactive stream ignored");
            return false;
        };

        let content = final_content.unwrap_or(entry.content);
        let thinking = if entry.thinking.is_empty() {
            None
        } else {
            Some(entry.thinking)
        };

        let updated = store.update_message(&entry.conversation_id, message_id, |message| {
            message.content = content;
            message.thinking = thinking;
            message.is_streaming = false;
        });
        if !updated {
            tracing::warn!(message_id, "stream ended but durable message is gone");
        }
        true
    }

    /// Force-end every open stream for a session, flagging the durable
    /// messages as interrupted. Invoked by the transport layer on disconnect
    /// so no phantom streaming indicator outlives its connection. Returns
    /// how many streams were closed.
    pub fn interrupt_session(&mut self, store: &mut EntityStore, session_id: &str) -> usize {
        let interrupted: Vec<String> = self
            .active
            .values()
            .filter(|e| e.session_id == session_id)
            .map(|e| e.message_id.clone())
            .collect();

        for message_id in &interrupted {
            if let Some(entry) = self.active.remove(message_id) {
                store.update_message(&entry.conversation_id, message_id, |message| {
                    message.content = entry.content.clone();
                    if !entry.thinking.is_empty() {
                        message.thinking = Some(entry.thinking.clone());
                    }
                    message.is_streaming = false;
                    message.interrupted = true;
                });
            }
        }

        if !interrupted.is_empty() {
            tracing::info!(session_id, count = interrupted.len(), "interrupted open streams");
        }
        interrupted.len()
    }

    pub fn is_streaming(&self, message_id: &str) -> bool {
        self.active.contains_key(message_id)
    }

    pub fn entry(&self, message_id: &str) -> Option<&StreamingMessage> {
        self.active.get(message_id)
    }

    /// Text accumulated so far, for rendering the in-flight message.
    pub fn live_text(&self, message_id: &str) -> Option<&str> {
        self.active.get(message_id).map(|e| e.content.as_str())
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

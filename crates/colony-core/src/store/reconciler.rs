//! The sole path by which inbound events become store mutations.
//!
//! Every handled event kind maps to exactly one store operation; no further
//! business logic lives here. Events carrying a per-session sequence number
//! are checked against a watermark so replayed history after a reconnect is
//! dropped instead of reapplied; unsequenced events are whole-record upserts
//! and safe to reapply by construction.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::events::{CoreEvent, ServerEvent};
use crate::stats::SharedReconcilerStats;
use crate::store::EntityStore;
use crate::streaming::{StreamChunk, StreamingAccumulator};
use crate::models::{AgentStatus, WorkspaceStatus};

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub struct Reconciler {
    /// Highest applied sequence number per session id.
    watermarks: HashMap<String, u64>,
    streams: StreamingAccumulator,
    stats: SharedReconcilerStats,
}

impl Reconciler {
    pub fn new(stats: SharedReconcilerStats) -> Self {
        Self {
            watermarks: HashMap::new(),
            streams: StreamingAccumulator::new(),
            stats,
        }
    }

    /// Read access to in-flight streams, for rendering live text.
    pub fn streams(&self) -> &StreamingAccumulator {
        &self.streams
    }

    /// Parse and apply a raw JSON payload. Malformed or unknown events are
    /// counted and ignored; the store is left untouched.
    pub fn apply_json(&mut self, store: &mut EntityStore, json: &str) -> Vec<CoreEvent> {
        match ServerEvent::from_json(json) {
            Some(event) => self.apply(store, event),
            None => {
                tracing::warn!(payload = json, "ignoring malformed event");
                self.stats.record_malformed();
                Vec::new()
            }
        }
    }

    /// Apply one inbound event. Returns notifications for the UI layer.
    pub fn apply(&mut self, store: &mut EntityStore, event: ServerEvent) -> Vec<CoreEvent> {
        if self.is_stale(&event) {
            tracing::debug!(
                session_id = event.session_id(),
                kind = event.kind_name(),
                "dropping stale event below watermark"
            );
            self.stats.record_stale();
            return Vec::new();
        }
        self.stats.record_applied(event.kind_name());

        match event {
            ServerEvent::SessionUpdated { session, .. } => {
                let session_id = session.id.clone();
                store.upsert_session(session);
                vec![CoreEvent::SessionChanged(session_id)]
            }
            ServerEvent::SessionDeleted { session_id, .. } => {
                store.remove_session(&session_id);
                vec![CoreEvent::SessionChanged(session_id)]
            }
            ServerEvent::WorkspaceStatus {
                session_id, status, ..
            } => {
                store.patch_workspace_status(&session_id, WorkspaceStatus::parse(&status));
                vec![CoreEvent::SessionChanged(session_id)]
            }
            ServerEvent::AgentStatus {
                session_id,
                agent_id,
                status,
                ..
            } => {
                store.patch_agent_status(
                    &session_id,
                    &agent_id,
                    AgentStatus::parse(&status),
                    now_secs(),
                );
                vec![CoreEvent::SessionChanged(session_id)]
            }
            ServerEvent::AgentUpdated { agent, .. } => {
                let session_id = agent.session_id.clone();
                if let Some(conversation_id) = agent.conversation_id.clone() {
                    store
                        .ensure_conversation(&session_id, &conversation_id)
                        .attach_agent(&agent.id);
                }
                store.upsert_agent(agent);
                vec![CoreEvent::SessionChanged(session_id)]
            }
            ServerEvent::AgentMessage {
                session_id,
                agent_id,
                message,
                ..
            } => {
                let conversation_id = message.conversation_id.clone();
                store
                    .ensure_conversation(&session_id, &conversation_id)
                    .attach_agent(&agent_id);
                store.insert_message(&session_id, message);
                vec![CoreEvent::ConversationUpdated { conversation_id }]
            }
            ServerEvent::StreamStart {
                session_id,
                agent_id,
                conversation_id,
                message_id,
            } => {
                store
                    .ensure_conversation(&session_id, &conversation_id)
                    .attach_agent(&agent_id);
                if self
                    .streams
                    .start(store, &message_id, &agent_id, &session_id, &conversation_id)
                {
                    vec![CoreEvent::StreamOpened { message_id }]
                } else {
                    Vec::new()
                }
            }
            ServerEvent::AgentStreamToken {
                message_id, chunk, ..
            } => {
                let chunk = StreamChunk::new(chunk);
                let applied = if let Some(token) = chunk.text_delta() {
                    self.streams.append_token(&message_id, token)
                } else if let Some(token) = chunk.thinking_delta() {
                    self.streams.append_thinking(&message_id, token)
                } else {
                    // finish markers and tool chunks carry no buffer delta
                    true
                };
                if !applied {
                    self.stats.record_inactive_stream();
                }
                Vec::new()
            }
            ServerEvent::StreamEnd {
                message_id,
                final_content,
                ..
            } => {
                let conversation_id = self
                    .streams
                    .entry(&message_id)
                    .map(|e| e.conversation_id.clone());
                if self.streams.end(store, &message_id, final_content) {
                    let mut events = vec![CoreEvent::StreamClosed {
                        message_id: message_id.clone(),
                    }];
                    if let Some(conversation_id) = conversation_id {
                        events.push(CoreEvent::ConversationUpdated { conversation_id });
                    }
                    events
                } else {
                    self.stats.record_inactive_stream();
                    Vec::new()
                }
            }
            ServerEvent::Attention { attention, .. } => {
                if store.attentions.upsert(attention.clone()) {
                    vec![CoreEvent::AttentionRaised(attention)]
                } else {
                    Vec::new()
                }
            }
            ServerEvent::PresenceJoined { session_id, peer } => {
                store.upsert_peer(&session_id, peer);
                vec![CoreEvent::PresenceChanged { session_id }]
            }
            ServerEvent::PresenceLeft {
                session_id,
                peer_id,
            } => {
                if store.remove_peer(&session_id, &peer_id) {
                    vec![CoreEvent::PresenceChanged { session_id }]
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Reconciliation pass run by the transport layer when a session's
    /// connection drops: force-end every open stream so no message is left
    /// with a phantom streaming indicator. Returns how many streams were
    /// closed.
    pub fn handle_disconnect(&mut self, store: &mut EntityStore, session_id: &str) -> usize {
        self.streams.interrupt_session(store, session_id)
    }

    fn is_stale(&mut self, event: &ServerEvent) -> bool {
        let Some(seq) = event.seq() else {
            return false;
        };
        let session_id = event.session_id();
        match self.watermarks.get(session_id) {
            Some(&watermark) if seq <= watermark => true,
            _ => {
                self.watermarks.insert(session_id.to_string(), seq);
                false
            }
        }
    }
}

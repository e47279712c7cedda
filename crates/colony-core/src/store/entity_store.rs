//! Normalized client-side state - single source of truth for app-level
//! concepts. Updated incrementally by the reconciler, read by every surface.
//!
//! All collections are keyed by stable id and every mutation is an
//! idempotent upsert, patch or remove of a whole record. Getters return
//! snapshots or a not-found marker, never panic. Display ordering is derived
//! from timestamps by consumers; nothing here relies on map iteration order.

use std::collections::HashMap;

use crate::constants::MAX_MESSAGES_PER_CONVERSATION;
use crate::models::{
    Agent, AgentStatus, Conversation, Message, RawPeerState, Session, WorkspaceStatus,
};
use crate::store::attention::AttentionLedger;

#[derive(Debug, Default)]
pub struct EntityStore {
    sessions: HashMap<String, Session>,
    agents: HashMap<String, Agent>,
    conversations: HashMap<String, Conversation>,
    messages_by_conversation: HashMap<String, Vec<Message>>,
    peers_by_session: HashMap<String, HashMap<String, RawPeerState>>,
    pub attentions: AttentionLedger,
    selected_session_id: Option<String>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Sessions =====

    /// Insert or replace a session by id. Replacing clears any refetch flag:
    /// a full record supersedes a placeholder shell.
    pub fn upsert_session(&mut self, session: Session) {
        self.sessions.insert(session.id.clone(), session);
    }

    /// Get-or-create a session shell. Events referencing a session the list
    /// fetch hasn't delivered yet must not be dropped; the shell carries a
    /// refetch flag the UI drains.
    pub fn ensure_session(&mut self, session_id: &str) -> &mut Session {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::placeholder(session_id))
    }

    pub fn patch_workspace_status(&mut self, session_id: &str, status: WorkspaceStatus) {
        self.ensure_session(session_id).workspace_status = status;
    }

    /// Remove a session and cascade to its agents, conversations and
    /// messages. Attention items survive, addressable by session id for
    /// audit.
    pub fn remove_session(&mut self, session_id: &str) -> bool {
        if self.sessions.remove(session_id).is_none() {
            return false;
        }

        self.agents.retain(|_, a| a.session_id != session_id);

        let conversation_ids: Vec<String> = self
            .conversations
            .values()
            .filter(|c| c.session_id == session_id)
            .map(|c| c.id.clone())
            .collect();
        for conversation_id in conversation_ids {
            self.conversations.remove(&conversation_id);
            self.messages_by_conversation.remove(&conversation_id);
        }

        self.peers_by_session.remove(session_id);

        if self.selected_session_id.as_deref() == Some(session_id) {
            self.selected_session_id = None;
        }
        true
    }

    pub fn session(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    /// All sessions, most recently created first.
    pub fn sessions(&self) -> Vec<&Session> {
        let mut sessions: Vec<_> = self.sessions.values().collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        sessions
    }

    /// Sessions currently flagged as placeholder shells needing a full
    /// refetch.
    pub fn sessions_needing_refetch(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .sessions
            .values()
            .filter(|s| s.needs_refetch)
            .map(|s| s.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn clear_refetch_flag(&mut self, session_id: &str) {
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.needs_refetch = false;
        }
    }

    pub fn select_session(&mut self, session_id: &str) {
        if self.sessions.contains_key(session_id) {
            self.selected_session_id = Some(session_id.to_string());
        }
    }

    pub fn selected_session(&self) -> Option<&Session> {
        self.selected_session_id
            .as_deref()
            .and_then(|id| self.sessions.get(id))
    }

    // ===== Agents =====

    pub fn upsert_agent(&mut self, agent: Agent) {
        self.ensure_session(&agent.session_id);
        self.agents.insert(agent.id.clone(), agent);
    }

    pub fn ensure_agent(&mut self, session_id: &str, agent_id: &str) -> &mut Agent {
        self.ensure_session(session_id);
        self.agents
            .entry(agent_id.to_string())
            .or_insert_with(|| Agent::placeholder(agent_id, session_id))
    }

    pub fn patch_agent_status(
        &mut self,
        session_id: &str,
        agent_id: &str,
        status: AgentStatus,
        at: u64,
    ) {
        let agent = self.ensure_agent(session_id, agent_id);
        agent.status = status;
        if at > agent.last_active_at {
            agent.last_active_at = at;
        }
    }

    pub fn agent(&self, agent_id: &str) -> Option<&Agent> {
        self.agents.get(agent_id)
    }

    /// Agents belonging to a session, in stable id order.
    pub fn agents_for_session(&self, session_id: &str) -> Vec<&Agent> {
        let mut agents: Vec<_> = self
            .agents
            .values()
            .filter(|a| a.session_id == session_id)
            .collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        agents
    }

    // ===== Conversations =====

    pub fn upsert_conversation(&mut self, conversation: Conversation) {
        self.ensure_session(&conversation.session_id);
        self.conversations
            .insert(conversation.id.clone(), conversation);
    }

    pub fn ensure_conversation(
        &mut self,
        session_id: &str,
        conversation_id: &str,
    ) -> &mut Conversation {
        self.ensure_session(session_id);
        self.conversations
            .entry(conversation_id.to_string())
            .or_insert_with(|| Conversation::placeholder(conversation_id, session_id))
    }

    pub fn conversation(&self, conversation_id: &str) -> Option<&Conversation> {
        self.conversations.get(conversation_id)
    }

    /// Conversations of a session, oldest first.
    pub fn conversations_for_session(&self, session_id: &str) -> Vec<&Conversation> {
        let mut conversations: Vec<_> = self
            .conversations
            .values()
            .filter(|c| c.session_id == session_id)
            .collect();
        conversations.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        conversations
    }

    // ===== Messages =====

    /// Insert a message into its conversation, keeping the list sorted
    /// oldest-first and deduplicated by id.
    ///
    /// An existing id is replaced in place - that is how a server-confirmed
    /// record supersedes an optimistic local append, and why redundant
    /// replay of the same event is harmless. The conversation list is capped;
    /// the oldest messages are evicted first.
    pub fn insert_message(&mut self, session_id: &str, message: Message) {
        let conversation_id = message.conversation_id.clone();
        self.ensure_conversation(session_id, &conversation_id);

        let messages = self
            .messages_by_conversation
            .entry(conversation_id.clone())
            .or_default();

        if let Some(existing) = messages.iter_mut().find(|m| m.id == message.id) {
            *existing = message;
        } else {
            let pos = messages.partition_point(|m| m.created_at <= message.created_at);
            messages.insert(pos, message);
            if messages.len() > MAX_MESSAGES_PER_CONVERSATION {
                let excess = messages.len() - MAX_MESSAGES_PER_CONVERSATION;
                messages.drain(..excess);
            }
        }

        let count = messages.len() as u64;
        if let Some(conversation) = self.conversations.get_mut(&conversation_id) {
            conversation.message_count = count;
        }
    }

    /// Apply a closure to a message in place. Returns false when the message
    /// is unknown (e.g. already evicted).
    pub fn update_message(
        &mut self,
        conversation_id: &str,
        message_id: &str,
        f: impl FnOnce(&mut Message),
    ) -> bool {
        if let Some(message) = self
            .messages_by_conversation
            .get_mut(conversation_id)
            .and_then(|messages| messages.iter_mut().find(|m| m.id == message_id))
        {
            f(message);
            true
        } else {
            false
        }
    }

    pub fn messages(&self, conversation_id: &str) -> &[Message] {
        self.messages_by_conversation
            .get(conversation_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn message(&self, conversation_id: &str, message_id: &str) -> Option<&Message> {
        self.messages(conversation_id)
            .iter()
            .find(|m| m.id == message_id)
    }

    // ===== Peers =====

    pub fn upsert_peer(&mut self, session_id: &str, peer: RawPeerState) {
        self.peers_by_session
            .entry(session_id.to_string())
            .or_default()
            .insert(peer.peer_id.clone(), peer);
    }

    pub fn remove_peer(&mut self, session_id: &str, peer_id: &str) -> bool {
        self.peers_by_session
            .get_mut(session_id)
            .map(|peers| peers.remove(peer_id).is_some())
            .unwrap_or(false)
    }

    /// Raw peer states for a session, unordered; the presence merger owns
    /// roster ordering.
    pub fn peers(&self, session_id: &str) -> Vec<&RawPeerState> {
        self.peers_by_session
            .get(session_id)
            .map(|peers| peers.values().collect())
            .unwrap_or_default()
    }
}

//! Composition root wiring the store, reconciler, focus tracker and
//! preference store together.
//!
//! All mutation happens synchronously on the thread driving the runtime;
//! asynchronous boundaries (the transport pushing events, surfaces sending
//! commands from other threads) are channels feeding it. Observers therefore
//! see either the pre- or post-mutation state, never a partial one.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use futures::FutureExt;
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::events::{CoreEvent, ServerEvent};
use crate::focus::FocusTracker;
use crate::models::{Message, MessageRole, Session, StandbySettings, WorkspaceStatus};
use crate::prefs::PreferenceStore;
use crate::presence::FollowList;
use crate::stats::SharedReconcilerStats;
use crate::store::{EntityStore, Reconciler, SubscriberRegistry, SubscriptionId};

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Actions a client surface asks the core to perform.
#[derive(Debug, Clone)]
pub enum ClientCommand {
    CreateSession {
        name: String,
        branch: Option<String>,
    },
    SelectSession {
        session_id: String,
    },
    /// Optimistic: appended locally right away, confirmed or corrected by
    /// the later server event sharing the same message id.
    SendMessage {
        session_id: String,
        conversation_id: String,
        content: String,
    },
    MarkAttentionRead {
        attention_id: String,
    },
    DismissAttention {
        attention_id: String,
    },
    DismissAllForAgent {
        session_id: String,
        agent_id: String,
    },
    FollowPeer {
        peer_id: String,
    },
    UnfollowPeer {
        peer_id: String,
    },
    SetNotificationsEnabled {
        enabled: bool,
    },
    ToggleFavoriteModel {
        model_id: String,
    },
}

/// Side effects the external transport must deliver to the backend.
#[derive(Debug, Clone)]
pub enum OutboundAction {
    CreateSession {
        session_id: String,
        name: String,
        branch: Option<String>,
    },
    SendMessage {
        session_id: String,
        conversation_id: String,
        message_id: String,
        content: String,
    },
    MarkAttentionRead {
        attention_id: String,
    },
    DismissAttention {
        attention_id: String,
    },
    DismissAllForAgent {
        session_id: String,
        agent_id: String,
    },
}

/// Cloneable command sender handed to client surfaces.
#[derive(Clone)]
pub struct CoreHandle {
    command_tx: Sender<ClientCommand>,
}

impl CoreHandle {
    pub(crate) fn new(command_tx: Sender<ClientCommand>) -> Self {
        Self { command_tx }
    }

    pub fn send(&self, command: ClientCommand) -> Result<(), mpsc::SendError<ClientCommand>> {
        self.command_tx.send(command)
    }
}

pub struct CoreRuntime {
    store: Rc<RefCell<EntityStore>>,
    reconciler: Reconciler,
    subscribers: SubscriberRegistry,
    focus: FocusTracker,
    prefs: PreferenceStore,
    follows: FollowList,
    handle: CoreHandle,
    command_rx: Receiver<ClientCommand>,
    event_tx: tokio::sync::mpsc::Sender<ServerEvent>,
    event_rx: tokio::sync::mpsc::Receiver<ServerEvent>,
    outbound_tx: Sender<OutboundAction>,
    outbound_rx: Option<Receiver<OutboundAction>>,
    stats: SharedReconcilerStats,
}

impl CoreRuntime {
    pub fn new(config: CoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let prefs = PreferenceStore::open(&config.data_dir);

        let (command_tx, command_rx) = mpsc::channel::<ClientCommand>();
        let (outbound_tx, outbound_rx) = mpsc::channel::<OutboundAction>();
        let (event_tx, event_rx) = tokio::sync::mpsc::channel::<ServerEvent>(1024);

        let stats = SharedReconcilerStats::new();

        Ok(Self {
            store: Rc::new(RefCell::new(EntityStore::new())),
            reconciler: Reconciler::new(stats.clone()),
            subscribers: SubscriberRegistry::new(),
            focus: FocusTracker::new(),
            prefs,
            follows: FollowList::new(),
            handle: CoreHandle::new(command_tx),
            command_rx,
            event_tx,
            event_rx,
            outbound_tx,
            outbound_rx: Some(outbound_rx),
            stats,
        })
    }

    pub fn handle(&self) -> CoreHandle {
        self.handle.clone()
    }

    /// Sender the transport pushes parsed server events into.
    pub fn event_sender(&self) -> tokio::sync::mpsc::Sender<ServerEvent> {
        self.event_tx.clone()
    }

    /// The transport takes this once and drains it.
    pub fn take_outbound_rx(&mut self) -> Option<Receiver<OutboundAction>> {
        self.outbound_rx.take()
    }

    pub fn store(&self) -> Rc<RefCell<EntityStore>> {
        self.store.clone()
    }

    pub fn stats(&self) -> SharedReconcilerStats {
        self.stats.clone()
    }

    pub fn focus(&self) -> &FocusTracker {
        &self.focus
    }

    pub fn focus_mut(&mut self) -> &mut FocusTracker {
        &mut self.focus
    }

    pub fn prefs(&self) -> &PreferenceStore {
        &self.prefs
    }

    pub fn prefs_mut(&mut self) -> &mut PreferenceStore {
        &mut self.prefs
    }

    pub fn follows(&self) -> &FollowList {
        &self.follows
    }

    /// Live text of an in-flight stream, for rendering.
    pub fn live_stream_text(&self, message_id: &str) -> Option<String> {
        self.reconciler
            .streams()
            .live_text(message_id)
            .map(|s| s.to_string())
    }

    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        self.event_rx.recv().await
    }

    pub fn poll_event(&mut self) -> Option<ServerEvent> {
        self.event_rx.recv().now_or_never().flatten()
    }

    /// Apply one inbound event and run change subscriptions.
    pub fn process_event(&mut self, event: ServerEvent) -> Vec<CoreEvent> {
        let events = {
            let mut store = self.store.borrow_mut();
            self.reconciler.apply(&mut store, event)
        };
        self.subscribers.notify(&self.store.borrow());
        events
    }

    /// Apply one raw JSON payload and run change subscriptions.
    pub fn process_json(&mut self, json: &str) -> Vec<CoreEvent> {
        let events = {
            let mut store = self.store.borrow_mut();
            self.reconciler.apply_json(&mut store, json)
        };
        self.subscribers.notify(&self.store.borrow());
        events
    }

    /// Transport-invoked reconciliation pass after losing a session's
    /// connection.
    pub fn handle_disconnect(&mut self, session_id: &str) -> usize {
        let interrupted = {
            let mut store = self.store.borrow_mut();
            self.reconciler.handle_disconnect(&mut store, session_id)
        };
        if interrupted > 0 {
            self.subscribers.notify(&self.store.borrow());
        }
        interrupted
    }

    pub fn subscribe<T, S, C>(&mut self, selector: S, on_change: C) -> SubscriptionId
    where
        T: PartialEq + 'static,
        S: Fn(&EntityStore) -> T + 'static,
        C: FnMut(&T) + 'static,
    {
        self.subscribers.subscribe(selector, on_change)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Drain and apply every queued client command. Returns how many were
    /// processed.
    pub fn process_commands(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(command) = self.command_rx.try_recv() {
            self.apply_command(command);
            processed += 1;
        }
        if processed > 0 {
            self.subscribers.notify(&self.store.borrow());
        }
        processed
    }

    fn apply_command(&mut self, command: ClientCommand) {
        match command {
            ClientCommand::CreateSession { name, branch } => {
                let session_id = format!("session-{}", Uuid::new_v4());
                let session = Session {
                    id: session_id.clone(),
                    name: name.clone(),
                    branch: branch.clone(),
                    workspace_status: WorkspaceStatus::Initializing,
                    standby: StandbySettings::default(),
                    active_agent_id: None,
                    created_at: now_secs(),
                    needs_refetch: false,
                };
                {
                    let mut store = self.store.borrow_mut();
                    store.upsert_session(session);
                    store.select_session(&session_id);
                }
                self.send_outbound(OutboundAction::CreateSession {
                    session_id,
                    name,
                    branch,
                });
            }
            ClientCommand::SelectSession { session_id } => {
                self.store.borrow_mut().select_session(&session_id);
            }
            ClientCommand::SendMessage {
                session_id,
                conversation_id,
                content,
            } => {
                let message_id = format!("msg-{}", Uuid::new_v4());
                let message = Message {
                    id: message_id.clone(),
                    conversation_id: conversation_id.clone(),
                    role: MessageRole::User,
                    content: content.clone(),
                    thinking: None,
                    created_at: now_secs(),
                    tool_calls: Vec::new(),
                    is_streaming: false,
                    interrupted: false,
                    pending: true,
                };
                self.store.borrow_mut().insert_message(&session_id, message);
                self.send_outbound(OutboundAction::SendMessage {
                    session_id,
                    conversation_id,
                    message_id,
                    content,
                });
            }
            ClientCommand::MarkAttentionRead { attention_id } => {
                if self.store.borrow_mut().attentions.mark_read(&attention_id) {
                    self.send_outbound(OutboundAction::MarkAttentionRead { attention_id });
                }
            }
            ClientCommand::DismissAttention { attention_id } => {
                if self.store.borrow_mut().attentions.dismiss(&attention_id) {
                    self.send_outbound(OutboundAction::DismissAttention { attention_id });
                }
            }
            ClientCommand::DismissAllForAgent {
                session_id,
                agent_id,
            } => {
                let dismissed = self
                    .store
                    .borrow_mut()
                    .attentions
                    .dismiss_all_for_agent(&session_id, &agent_id);
                if dismissed > 0 {
                    self.send_outbound(OutboundAction::DismissAllForAgent {
                        session_id,
                        agent_id,
                    });
                }
            }
            ClientCommand::FollowPeer { peer_id } => {
                self.follows.follow(&peer_id);
            }
            ClientCommand::UnfollowPeer { peer_id } => {
                self.follows.unfollow(&peer_id);
            }
            ClientCommand::SetNotificationsEnabled { enabled } => {
                if let Err(e) = self.prefs.update(|prefs| prefs.notifications.enabled = enabled) {
                    tracing::warn!(error = %e, "failed to persist notification preference");
                }
            }
            ClientCommand::ToggleFavoriteModel { model_id } => {
                if let Err(e) = self.prefs.update(|prefs| {
                    prefs.toggle_favorite_model(&model_id);
                }) {
                    tracing::warn!(error = %e, "failed to persist favorite models");
                }
            }
        }
    }

    fn send_outbound(&self, action: OutboundAction) {
        // the transport may not have attached yet; actions are best-effort
        let _ = self.outbound_tx.send(action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn runtime() -> (CoreRuntime, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let runtime = CoreRuntime::new(CoreConfig::new(dir.path())).unwrap();
        (runtime, dir)
    }

    #[test]
    fn test_optimistic_send_confirmed_by_server_event() {
        let (mut runtime, _dir) = runtime();
        let outbound_rx = runtime.take_outbound_rx().unwrap();
        let handle = runtime.handle();

        handle
            .send(ClientCommand::SendMessage {
                session_id: "s1".into(),
                conversation_id: "c1".into(),
                content: "run the tests".into(),
            })
            .unwrap();
        assert_eq!(runtime.process_commands(), 1);

        // local append is pending
        let message_id = {
            let store = runtime.store();
            let store = store.borrow();
            let messages = store.messages("c1");
            assert_eq!(messages.len(), 1);
            assert!(messages[0].pending);
            messages[0].id.clone()
        };

        // the transport sees the matching action
        match outbound_rx.try_recv().unwrap() {
            OutboundAction::SendMessage {
                message_id: outbound_id,
                ..
            } => assert_eq!(outbound_id, message_id),
            other => panic!("unexpected outbound action: {other:?}"),
        }

        // confirmation shares the id and clears the pending flag
        runtime.process_json(
            &json!({
                "type": "agent_message",
                "sessionId": "s1", "agentId": "ag1",
                "message": {
                    "id": message_id, "conversationId": "c1",
                    "role": "user", "content": "run the tests", "createdAt": now_secs()
                }
            })
            .to_string(),
        );

        let store = runtime.store();
        let store = store.borrow();
        let messages = store.messages("c1");
        assert_eq!(messages.len(), 1);
        assert!(!messages[0].pending);
    }

    #[test]
    fn test_create_session_selects_it() {
        let (mut runtime, _dir) = runtime();
        runtime
            .handle()
            .send(ClientCommand::CreateSession {
                name: "spike".into(),
                branch: Some("main".into()),
            })
            .unwrap();
        runtime.process_commands();

        let store = runtime.store();
        let store = store.borrow();
        let selected = store.selected_session().unwrap();
        assert_eq!(selected.name, "spike");
        assert_eq!(
            selected.workspace_status,
            WorkspaceStatus::Initializing
        );
        assert!(!selected.needs_refetch);
    }

    #[test]
    fn test_attention_commands_round_trip() {
        let (mut runtime, _dir) = runtime();
        let outbound_rx = runtime.take_outbound_rx().unwrap();

        runtime.process_json(
            &json!({
                "type": "attention",
                "attention": {
                    "id": "att1", "agentId": "ag1", "sessionId": "s1",
                    "kind": "question", "priority": "high", "createdAt": 10
                }
            })
            .to_string(),
        );

        runtime
            .handle()
            .send(ClientCommand::DismissAttention {
                attention_id: "att1".into(),
            })
            .unwrap();
        runtime.process_commands();

        let store = runtime.store();
        assert_eq!(store.borrow().attentions.unread_count("s1"), 0);
        assert!(matches!(
            outbound_rx.try_recv().unwrap(),
            OutboundAction::DismissAttention { .. }
        ));
        // dismissing again sends nothing
        runtime
            .handle()
            .send(ClientCommand::DismissAttention {
                attention_id: "att1".into(),
            })
            .unwrap();
        runtime.process_commands();
        assert!(outbound_rx.try_recv().is_err());
    }

    #[test]
    fn test_event_channel_poll() {
        let (mut runtime, _dir) = runtime();
        let sender = runtime.event_sender();

        assert!(runtime.poll_event().is_none());
        sender
            .blocking_send(
                ServerEvent::from_json(
                    &json!({
                        "type": "workspace_status",
                        "sessionId": "s1", "status": "ready"
                    })
                    .to_string(),
                )
                .unwrap(),
            )
            .unwrap();

        let event = runtime.poll_event().unwrap();
        runtime.process_event(event);
        let store = runtime.store();
        assert_eq!(
            store.borrow().session("s1").unwrap().workspace_status,
            WorkspaceStatus::Ready
        );
    }

    #[test]
    fn test_subscription_fires_on_processed_event() {
        let (mut runtime, _dir) = runtime();
        let seen: std::rc::Rc<std::cell::RefCell<Vec<usize>>> = Default::default();
        let seen_clone = seen.clone();
        runtime.subscribe(
            |store: &EntityStore| store.attentions.unread_count("s1"),
            move |count| seen_clone.borrow_mut().push(*count),
        );

        runtime.process_json(
            &json!({
                "type": "attention",
                "attention": {
                    "id": "att1", "agentId": "ag1", "sessionId": "s1",
                    "kind": "error", "priority": "critical", "createdAt": 1
                }
            })
            .to_string(),
        );
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn test_follow_and_prefs_commands() {
        let (mut runtime, _dir) = runtime();
        let handle = runtime.handle();
        handle
            .send(ClientCommand::FollowPeer {
                peer_id: "p1".into(),
            })
            .unwrap();
        handle
            .send(ClientCommand::ToggleFavoriteModel {
                model_id: "opus-4".into(),
            })
            .unwrap();
        handle
            .send(ClientCommand::SetNotificationsEnabled { enabled: false })
            .unwrap();
        runtime.process_commands();

        assert!(runtime.follows().is_following("p1"));
        assert_eq!(runtime.prefs().get().favorite_models, vec!["opus-4"]);
        assert!(!runtime.prefs().get().notifications.enabled);
    }

    #[test]
    fn test_disconnect_pass_notifies_subscribers() {
        let (mut runtime, _dir) = runtime();
        runtime.process_json(
            &json!({
                "type": "stream_start",
                "sessionId": "s1", "agentId": "a1",
                "conversationId": "c1", "messageId": "m1"
            })
            .to_string(),
        );
        runtime.process_json(
            &json!({
                "type": "agent_stream_token",
                "sessionId": "s1", "agentId": "a1", "messageId": "m1",
                "chunk": {"type": "text-delta", "text": "half"}
            })
            .to_string(),
        );
        assert_eq!(runtime.live_stream_text("m1").as_deref(), Some("half"));

        assert_eq!(runtime.handle_disconnect("s1"), 1);
        assert!(runtime.live_stream_text("m1").is_none());
        let store = runtime.store();
        assert!(store.borrow().message("c1", "m1").unwrap().interrupted);
    }
}

use std::sync::{Arc, Mutex};

use futures_channel::mpsc::{self, UnboundedSender};
use hostelmate_shared::{ClientEvent, SocketPacket};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::connection::{ConnectionState, ConnectionTask, ReconnectConfig};
use super::listeners::{ListenerId, ListenerRegistry};
use super::RealtimeError;
use crate::auth_session::SessionStore;
use crate::config::ClientConfig;
use crate::notifier::{Notifier, TracingNotifier};

struct ActiveConnection {
    sender: UnboundedSender<String>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Authenticated, auto-reconnecting event channel.
///
/// At most one connection task runs at a time. Listeners registered with
/// [`RealtimeChannel::on`] live until [`RealtimeChannel::disconnect`].
pub struct RealtimeChannel {
    socket_url: String,
    session: SessionStore,
    notifier: Arc<dyn Notifier>,
    reconnect: ReconnectConfig,
    listeners: ListenerRegistry,
    state: Arc<watch::Sender<ConnectionState>>,
    active: Mutex<Option<ActiveConnection>>,
}

impl std::fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeChannel")
            .field("socket_url", &self.socket_url)
            .field("state", &*self.state.borrow())
            .field("listeners", &self.listeners)
            .finish()
    }
}

impl RealtimeChannel {
    pub fn new(config: &ClientConfig, session: SessionStore) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            socket_url: config.socket_url.clone(),
            session,
            notifier: Arc::new(TracingNotifier),
            reconnect: config.reconnect.clone(),
            listeners: ListenerRegistry::new(),
            state: Arc::new(state),
            active: Mutex::new(None),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    fn active(&self) -> std::sync::MutexGuard<'_, Option<ActiveConnection>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start the connection task.
    ///
    /// Returns `false` without doing anything when no access token is stored
    /// or a connection task is already running. Must be called inside a
    /// tokio runtime.
    pub fn connect(&self) -> bool {
        let mut active = self.active();
        if active.as_ref().is_some_and(|a| !a.task.is_finished()) {
            tracing::debug!("realtime channel already running");
            return false;
        }
        if self.session.access_token().is_none() {
            tracing::debug!("no access token, not connecting realtime channel");
            return false;
        }

        let (sender, outgoing) = mpsc::unbounded();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = ConnectionTask {
            socket_url: self.socket_url.clone(),
            session: self.session.clone(),
            listeners: self.listeners.clone(),
            notifier: self.notifier.clone(),
            reconnect: self.reconnect.clone(),
            state: self.state.clone(),
            outgoing,
            shutdown: shutdown_rx,
        };

        tracing::info!("connecting realtime channel to {}", self.socket_url);
        *active = Some(ActiveConnection {
            sender,
            shutdown,
            task: tokio::spawn(task.run()),
        });
        true
    }

    /// Stop the connection task and drop every listener.
    pub fn disconnect(&self) {
        if let Some(active) = self.active().take() {
            let _ = active.shutdown.send(true);
            active.sender.close_channel();
            tracing::info!("realtime channel disconnected");
        }
        self.state.send_replace(ConnectionState::Disconnected);
        self.listeners.clear();
    }

    /// Register a handler for a named event.
    pub fn on<F>(&self, event: &str, handler: F) -> ListenerId
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.listeners.on(event, handler)
    }

    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        self.listeners.off(event, id)
    }

    /// Send an event. Frames queued before the handshake completes go out
    /// once connected.
    pub fn emit<T: Serialize + ?Sized>(&self, event: &str, payload: &T) -> Result<(), RealtimeError> {
        let payload =
            serde_json::to_value(payload).map_err(|e| RealtimeError::Encode(e.to_string()))?;
        let active = self.active();
        let Some(active) = active.as_ref().filter(|a| !a.task.is_finished()) else {
            return Err(RealtimeError::NotConnected);
        };
        let frame = SocketPacket::event(event, payload).to_frame();
        active
            .sender
            .unbounded_send(frame)
            .map_err(|_| RealtimeError::NotConnected)
    }

    fn emit_client(&self, event: ClientEvent, id: &str) -> Result<(), RealtimeError> {
        self.emit(event.as_str(), id)
    }

    pub fn join_room(&self, room: &str) -> Result<(), RealtimeError> {
        self.emit_client(ClientEvent::JoinRoom, room)
    }

    pub fn leave_room(&self, room: &str) -> Result<(), RealtimeError> {
        self.emit_client(ClientEvent::LeaveRoom, room)
    }

    pub fn join_issue(&self, issue_id: &str) -> Result<(), RealtimeError> {
        self.emit_client(ClientEvent::JoinIssue, issue_id)
    }

    pub fn leave_issue(&self, issue_id: &str) -> Result<(), RealtimeError> {
        self.emit_client(ClientEvent::LeaveIssue, issue_id)
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Subscribe to connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        if let Some(active) = self.active().take() {
            let _ = active.shutdown.send(true);
        }
    }
}

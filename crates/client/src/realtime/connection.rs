//! Realtime connection state, reconnect policy and the socket task.

use std::sync::Arc;
use std::time::Duration;

use futures_channel::mpsc::UnboundedReceiver;
use futures_util::{SinkExt, StreamExt};
use hostelmate_shared::{
    EnginePacket, ServerEvent, SocketPacket, ENGINE_IO_PATH, ENGINE_IO_QUERY,
};
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::listeners::ListenerRegistry;
use super::toasts;
use crate::auth_session::SessionStore;
use crate::notifier::{Notifier, Toast};

/// How long to wait for the websocket and the Engine.IO handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(20);

/// Connection state of the realtime channel
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Failed { reason: String },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Reconnecting { .. }
        )
    }
}

/// Configuration for auto-reconnect behavior
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of reconnect attempts (0 = infinite)
    pub max_attempts: u32,
    /// Initial delay in milliseconds
    pub initial_delay_ms: u32,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u32,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Calculate delay for a given attempt number
    pub fn delay_for_attempt(&self, attempt: u32) -> u32 {
        let delay = self.initial_delay_ms as f32 * self.backoff_multiplier.powi(attempt as i32);
        (delay as u32).min(self.max_delay_ms)
    }
}

/// Build the Engine.IO websocket URL from the configured realtime base URL.
pub fn engine_url(socket_url: &str) -> Result<url::Url, String> {
    let mut url = url::Url::parse(socket_url).map_err(|e| format!("invalid socket url {socket_url:?}: {e}"))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(format!("unsupported socket url scheme '{other}'")),
    };
    url.set_scheme(scheme)
        .map_err(|()| format!("cannot use scheme '{scheme}' for {socket_url:?}"))?;

    let path = format!("{}{}", url.path().trim_end_matches('/'), ENGINE_IO_PATH);
    url.set_path(&path);
    url.set_query(Some(ENGINE_IO_QUERY));
    Ok(url)
}

/// Why a single socket session ended.
enum SessionEnd {
    /// `disconnect()` was called or the channel was dropped.
    Shutdown,
    /// The connection never got acknowledged.
    Failed(String),
    /// An acknowledged connection went away.
    Dropped(String),
}

/// Background task owning the socket for one `connect()` call, across
/// reconnects.
pub(crate) struct ConnectionTask {
    pub socket_url: String,
    pub session: SessionStore,
    pub listeners: ListenerRegistry,
    pub notifier: Arc<dyn Notifier>,
    pub reconnect: ReconnectConfig,
    pub state: Arc<watch::Sender<ConnectionState>>,
    pub outgoing: UnboundedReceiver<String>,
    pub shutdown: watch::Receiver<bool>,
}

impl ConnectionTask {
    fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Publish a state unless the channel has been shut down meanwhile.
    fn publish(&self, next: ConnectionState) {
        let shutdown = self.shutdown.clone();
        self.state.send_if_modified(|current| {
            if *shutdown.borrow() || *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    pub async fn run(mut self) {
        let mut attempt = 0u32;

        loop {
            if self.is_shutdown() {
                return;
            }

            // Token is read per attempt so a refreshed credential is picked up
            let Some(token) = self.session.access_token() else {
                tracing::warn!("no access token, realtime channel stays disconnected");
                self.publish(ConnectionState::Disconnected);
                return;
            };

            if attempt == 0 {
                self.publish(ConnectionState::Connecting);
            }

            match self.run_session(&token).await {
                SessionEnd::Shutdown => {
                    tracing::info!("realtime connection closed by client");
                    return;
                }
                SessionEnd::Dropped(reason) => {
                    tracing::info!("realtime connection lost: {}", reason);
                    attempt = 0;
                    self.listeners
                        .dispatch(ServerEvent::Disconnect.as_str(), &Value::String(reason));
                }
                SessionEnd::Failed(reason) => {
                    tracing::error!("realtime connection error: {}", reason);
                    self.listeners.dispatch(
                        ServerEvent::ConnectError.as_str(),
                        &json!({ "message": reason }),
                    );
                }
            }

            if self.reconnect.max_attempts > 0 && attempt >= self.reconnect.max_attempts {
                let reason = format!(
                    "Max reconnect attempts ({}) exceeded",
                    self.reconnect.max_attempts
                );
                tracing::error!("{}", reason);
                if !self.is_shutdown() {
                    self.notifier
                        .notify(Toast::error("Failed to connect to real-time updates"));
                }
                self.publish(ConnectionState::Failed { reason });
                return;
            }

            let delay = self.reconnect.delay_for_attempt(attempt);
            attempt += 1;
            self.publish(ConnectionState::Reconnecting { attempt });
            tracing::info!("reconnecting in {}ms (attempt {})", delay, attempt);

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(delay as u64)) => {}
                _ = self.shutdown.changed() => return,
            }
        }
    }

    async fn run_session(&mut self, token: &str) -> SessionEnd {
        let url = match engine_url(&self.socket_url) {
            Ok(url) => url,
            Err(e) => return SessionEnd::Failed(e),
        };

        tracing::debug!("opening realtime socket {}", url);
        let ws_stream = tokio::select! {
            result = tokio::time::timeout(HANDSHAKE_TIMEOUT, connect_async(url.as_str())) => match result {
                Ok(Ok((ws_stream, _response))) => ws_stream,
                Ok(Err(e)) => return SessionEnd::Failed(format!("websocket error: {e}")),
                Err(_) => return SessionEnd::Failed("timeout".to_string()),
            },
            _ = self.shutdown.changed() => return SessionEnd::Shutdown,
        };

        let (mut write, mut read) = ws_stream.split();
        let mut silence_budget = HANDSHAKE_TIMEOUT;
        // Only incoming frames push the deadline back
        let mut deadline = Instant::now() + silence_budget;
        let mut connected = false;

        let end = |connected: bool, reason: String| {
            if connected {
                SessionEnd::Dropped(reason)
            } else {
                SessionEnd::Failed(reason)
            }
        };

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    let _ = write.send(Message::Text(SocketPacket::disconnect().to_frame().into())).await;
                    let _ = write.close().await;
                    return SessionEnd::Shutdown;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    return end(connected, "ping timeout".to_string());
                }
                frame = read.next() => {
                    deadline = Instant::now() + silence_budget;
                    let text = match frame {
                        None | Some(Ok(Message::Close(_))) => {
                            return end(connected, "transport close".to_string());
                        }
                        Some(Err(e)) => return end(connected, format!("transport error: {e}")),
                        Some(Ok(Message::Text(text))) => text,
                        // Binary, ping and pong frames carry nothing for us
                        Some(Ok(_)) => continue,
                    };

                    let packet = match EnginePacket::decode(text.as_str()) {
                        Ok(packet) => packet,
                        Err(e) => {
                            tracing::error!("failed to parse realtime frame: {}", e);
                            continue;
                        }
                    };

                    let reply = match packet {
                        EnginePacket::Open(handshake) => {
                            tracing::debug!("engine session {} opened", handshake.sid);
                            silence_budget = handshake.silence_budget();
                            deadline = Instant::now() + silence_budget;
                            Some(SocketPacket::connect(Some(json!({ "token": token }))).to_frame())
                        }
                        EnginePacket::Ping(data) => Some(EnginePacket::Pong(data).encode()),
                        EnginePacket::Close => return end(connected, "transport close".to_string()),
                        EnginePacket::Message(data) => match self.on_socket_packet(&data, &mut connected) {
                            Ok(()) => None,
                            Err(end) => return end,
                        },
                        EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => None,
                    };

                    if let Some(reply) = reply {
                        if let Err(e) = write.send(Message::Text(reply.into())).await {
                            return end(connected, format!("send failed: {e}"));
                        }
                    }
                }
                Some(frame) = self.outgoing.next(), if connected => {
                    tracing::debug!("realtime send: {}", frame);
                    if let Err(e) = write.send(Message::Text(frame.into())).await {
                        return end(connected, format!("send failed: {e}"));
                    }
                }
            }
        }
    }

    /// Handle one Socket.IO packet. `Err` ends the socket session.
    fn on_socket_packet(&self, data: &str, connected: &mut bool) -> Result<(), SessionEnd> {
        let packet = match SocketPacket::decode(data) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::error!("failed to parse realtime packet: {}", e);
                return Ok(());
            }
        };

        match packet {
            SocketPacket::Connect { data, .. } => {
                *connected = true;
                let sid = data
                    .as_ref()
                    .and_then(|d| d.get("sid"))
                    .and_then(Value::as_str)
                    .unwrap_or("?");
                tracing::info!("realtime connected: {}", sid);
                self.notifier.notify(
                    Toast::success("Connected to real-time updates")
                        .with_duration(Duration::from_secs(2)),
                );
                self.publish(ConnectionState::Connected);
                self.listeners
                    .dispatch(ServerEvent::Connect.as_str(), &data.unwrap_or(Value::Null));
                Ok(())
            }
            SocketPacket::ConnectError { data, .. } => {
                let reason = data
                    .as_ref()
                    .and_then(|d| d.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or("connection refused")
                    .to_string();
                Err(SessionEnd::Failed(reason))
            }
            SocketPacket::Disconnect { .. } => {
                let reason = "io server disconnect".to_string();
                Err(if *connected {
                    SessionEnd::Dropped(reason)
                } else {
                    SessionEnd::Failed(reason)
                })
            }
            SocketPacket::Event { name, args, .. } => {
                let payload = args.into_iter().next().unwrap_or(Value::Null);
                tracing::debug!("realtime event '{}': {}", name, payload);
                if let Some(toast) = toasts::for_event(&name, &payload) {
                    self.notifier.notify(toast);
                }
                self.listeners.dispatch(&name, &payload);
                Ok(())
            }
            SocketPacket::Ack { ack_id, .. } => {
                tracing::debug!("ignoring ack {}", ack_id);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let config = ReconnectConfig::default();
        let delays: Vec<u32> = (0..6).map(|n| config.delay_for_attempt(n)).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 5000, 5000, 5000]);
    }

    #[test]
    fn engine_url_maps_http_schemes() {
        assert_eq!(
            engine_url("http://localhost:5000").unwrap().as_str(),
            "ws://localhost:5000/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            engine_url("https://hostel.example/realtime/").unwrap().as_str(),
            "wss://hostel.example/realtime/socket.io/?EIO=4&transport=websocket"
        );
        assert!(engine_url("ftp://hostel.example").is_err());
        assert!(engine_url("not a url").is_err());
    }

    #[test]
    fn connecting_states() {
        assert!(ConnectionState::Reconnecting { attempt: 2 }.is_connecting());
        assert!(!ConnectionState::Connected.is_connecting());
        assert!(ConnectionState::Connected.is_connected());
    }
}

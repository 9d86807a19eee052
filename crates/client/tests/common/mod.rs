//! Shared fixtures for the client integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use hostelmate_client::{
    ClientConfig, ConnectionState, MemoryStore, Navigator, Notifier, ReconnectConfig, SessionStore,
    Toast,
};
use hostelmate_shared::{Credentials, SocketPacket};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite::Message;

pub const WAIT: Duration = Duration::from_secs(5);

/// Records every toast it is given.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        self.toasts.lock().unwrap().push(toast);
    }
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.toasts.lock().unwrap().iter().map(|t| t.message.clone()).collect()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().unwrap().clone()
    }
}

/// Counts session-ended navigations.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    ended: AtomicUsize,
}

impl Navigator for RecordingNavigator {
    fn session_ended(&self) {
        self.ended.fetch_add(1, Ordering::SeqCst);
    }
}

impl RecordingNavigator {
    pub fn ended(&self) -> usize {
        self.ended.load(Ordering::SeqCst)
    }
}

pub fn session_with(access: &str, refresh: Option<&str>) -> SessionStore {
    let session = SessionStore::new(Arc::new(MemoryStore::new()));
    session
        .set_credentials(&Credentials {
            access_token: access.to_string(),
            refresh_token: refresh.map(str::to_string),
        })
        .unwrap();
    session
}

/// Config pointing at local test servers with short reconnect delays.
pub fn test_config(api_url: &str, socket_url: &str) -> ClientConfig {
    ClientConfig::default()
        .with_api_url(api_url)
        .with_socket_url(socket_url)
        .with_reconnect(ReconnectConfig {
            max_attempts: 5,
            initial_delay_ms: 50,
            max_delay_ms: 200,
            backoff_multiplier: 2.0,
        })
}

pub async fn wait_for_state(
    rx: &mut watch::Receiver<ConnectionState>,
    pred: impl Fn(&ConnectionState) -> bool,
) -> ConnectionState {
    tokio::time::timeout(WAIT, rx.wait_for(|state| pred(state)))
        .await
        .expect("timed out waiting for connection state")
        .expect("state channel closed")
        .clone()
}

/// Poll `cond` until it holds or the wait budget runs out.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !cond() {
        assert!(tokio::time::Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[derive(Debug, Clone)]
enum Command {
    Send(String),
    DropAll,
}

/// Minimal Socket.IO v4 server speaking the websocket transport.
///
/// Accepts a namespace CONNECT only when its auth payload carries the
/// expected token, records every frame it receives and can push events or
/// drop all sockets on demand.
pub struct FakeSocketServer {
    pub url: String,
    accepts: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<String>>>,
    commands: broadcast::Sender<Command>,
}

impl FakeSocketServer {
    pub async fn start(token: &str) -> Self {
        Self::start_with_heartbeat(token, 25_000, 20_000).await
    }

    /// Like [`FakeSocketServer::start`] but advertising the given ping
    /// interval and timeout. The server itself never pings.
    pub async fn start_with_heartbeat(token: &str, ping_interval: u64, ping_timeout: u64) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let accepts = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(Mutex::new(Vec::new()));
        let (commands, _) = broadcast::channel(16);

        let token = token.to_string();
        let server = Self {
            url,
            accepts: accepts.clone(),
            received: received.clone(),
            commands: commands.clone(),
        };

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                accepts.fetch_add(1, Ordering::SeqCst);
                let rx = commands.subscribe();
                let heartbeat = (ping_interval, ping_timeout);
                tokio::spawn(serve(stream, token.clone(), heartbeat, received.clone(), rx));
            }
        });

        server
    }

    pub fn accepts(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    /// Push an event to every connected socket.
    pub fn emit(&self, event: &str, payload: Value) {
        let frame = SocketPacket::event(event, payload).to_frame();
        let _ = self.commands.send(Command::Send(frame));
    }

    /// Close every open socket.
    pub fn drop_all(&self) {
        let _ = self.commands.send(Command::DropAll);
    }
}

async fn serve(
    stream: tokio::net::TcpStream,
    token: String,
    (ping_interval, ping_timeout): (u64, u64),
    received: Arc<Mutex<Vec<String>>>,
    mut commands: broadcast::Receiver<Command>,
) {
    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };

    let open = json!({
        "sid": "engine-1",
        "upgrades": [],
        "pingInterval": ping_interval,
        "pingTimeout": ping_timeout,
        "maxPayload": 1000000
    });
    if ws.send(Message::Text(format!("0{open}").into())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            frame = ws.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text.as_str().to_string(),
                    Some(Ok(_)) => continue,
                    _ => return,
                };
                received.lock().unwrap().push(text.clone());

                if let Some(auth) = text.strip_prefix("40") {
                    let auth: Value = serde_json::from_str(auth).unwrap_or(Value::Null);
                    let reply = if auth.get("token").and_then(Value::as_str) == Some(token.as_str()) {
                        r#"40{"sid":"socket-1"}"#.to_string()
                    } else {
                        r#"44{"message":"Authentication error"}"#.to_string()
                    };
                    if ws.send(Message::Text(reply.into())).await.is_err() {
                        return;
                    }
                }
            }
            command = commands.recv() => match command {
                Ok(Command::Send(frame)) => {
                    if ws.send(Message::Text(frame.into())).await.is_err() {
                        return;
                    }
                }
                Ok(Command::DropAll) | Err(_) => {
                    let _ = ws.close(None).await;
                    return;
                }
            },
        }
    }
}

//! Realtime channel to the HostelMate event server.
//!
//! Speaks Socket.IO v4 over the Engine.IO websocket transport. The access
//! token is sent in the namespace CONNECT packet and re-read on every
//! reconnect attempt, so a token renewed by the request pipeline is used by
//! the next connection.

mod channel;
mod connection;
mod listeners;
pub mod toasts;

pub use channel::RealtimeChannel;
pub use connection::{engine_url, ConnectionState, ReconnectConfig};
pub use listeners::{Handler, ListenerId, ListenerRegistry};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealtimeError {
    #[error("realtime channel is not connected")]
    NotConnected,
    #[error("failed to encode event payload: {0}")]
    Encode(String),
}

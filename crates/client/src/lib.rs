//! HostelMate client core.
//!
//! The pieces every HostelMate front end shares:
//! - [`ApiClient`]: REST calls with bearer auth, envelope unwrapping, error
//!   toasts and a single transparent token refresh per request;
//! - [`RealtimeChannel`]: authenticated, auto-reconnecting Socket.IO channel
//!   with named-event subscriptions;
//! - [`NotificationFeed`]: the in-memory notification log with unread count;
//! - [`HostelClient`]: owns and wires all of the above for one user.

pub mod api_client;
pub mod app;
pub mod auth_session;
pub mod config;
pub mod logging;
pub mod notifier;
pub mod realtime;
pub mod services;
pub mod storage;
pub mod stores;
pub mod upload;

pub use api_client::{ApiClient, CallOptions};
pub use app::HostelClient;
pub use auth_session::SessionStore;
pub use config::ClientConfig;
pub use notifier::{Navigator, Notifier, Toast, ToastKind, TracingNavigator, TracingNotifier};
pub use realtime::{ConnectionState, ListenerId, RealtimeChannel, RealtimeError, ReconnectConfig};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use stores::{Notification, NotificationFeed};
pub use upload::{ProgressFn, UploadFile, UploadForm};

pub use hostelmate_shared::{ApiError, Payload};

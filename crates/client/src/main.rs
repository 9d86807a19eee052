//! `hostelmate`: tail live HostelMate notifications in the terminal.
//!
//! Reads its endpoints from the environment (see [`ClientConfig::from_env`]).
//! When `HOSTELMATE_EMAIL` and `HOSTELMATE_PASSWORD` are set it signs in
//! first; otherwise it reuses the session stored by a previous run.

use std::sync::Arc;

use anyhow::Context;
use hostelmate_client::{
    logging, ClientConfig, ConnectionState, FileStore, HostelClient, TracingNavigator,
    TracingNotifier,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = ClientConfig::from_env();
    tracing::info!("api: {}, realtime: {}", config.api_url, config.socket_url);

    let store = FileStore::open_default().context("failed to open session storage")?;
    tracing::debug!("session storage at {}", store.dir().display());

    let client = HostelClient::new(
        config,
        Arc::new(store),
        Arc::new(TracingNotifier),
        Arc::new(TracingNavigator),
    )?;

    if let (Ok(email), Ok(password)) = (
        std::env::var("HOSTELMATE_EMAIL"),
        std::env::var("HOSTELMATE_PASSWORD"),
    ) {
        client.auth().login(&email, &password).await?;
    }

    if !client.start() {
        anyhow::bail!("not signed in; set HOSTELMATE_EMAIL and HOSTELMATE_PASSWORD");
    }

    let mut state = client.realtime().watch_state();
    let mut unread = client.notifications().watch_unread();
    let mut last_shown = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, shutting down");
                break;
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = state.borrow_and_update().clone();
                tracing::info!("realtime: {:?}", current);
                if let ConnectionState::Failed { reason } = current {
                    anyhow::bail!("realtime channel gave up: {reason}");
                }
            }
            changed = unread.changed() => {
                if changed.is_err() {
                    break;
                }
                let count = *unread.borrow_and_update();
                for notification in client.notifications().received_after(last_shown) {
                    tracing::info!(
                        "[{}] {} ({})",
                        notification.received_at.format("%H:%M:%S"),
                        notification.message,
                        notification.category.as_deref().unwrap_or("general"),
                    );
                    last_shown = Some(notification.received_at);
                }
                tracing::info!("{} unread", count);
            }
        }
    }

    client.realtime().disconnect();
    Ok(())
}

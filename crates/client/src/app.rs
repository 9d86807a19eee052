//! Composition root wiring the session, pipeline, channel and feed together.

use std::sync::{Arc, Weak};

use hostelmate_shared::{ApiError, ServerEvent};

use crate::api_client::ApiClient;
use crate::auth_session::SessionStore;
use crate::config::ClientConfig;
use crate::notifier::{Navigator, Notifier};
use crate::realtime::RealtimeChannel;
use crate::services::{AnnouncementService, AuthService, IssueService, LostFoundService};
use crate::storage::KeyValueStore;
use crate::stores::NotificationFeed;

/// Closes the realtime channel before handing a lost session to the app's
/// navigator.
#[derive(Debug)]
struct EndSessionNavigator {
    realtime: Weak<RealtimeChannel>,
    notifications: NotificationFeed,
    inner: Arc<dyn Navigator>,
}

impl Navigator for EndSessionNavigator {
    fn session_ended(&self) {
        if let Some(realtime) = self.realtime.upgrade() {
            realtime.disconnect();
        }
        self.notifications.clear();
        self.inner.session_ended();
    }
}

/// One signed-in (or signing-in) HostelMate user.
#[derive(Debug)]
pub struct HostelClient {
    config: ClientConfig,
    session: SessionStore,
    api: ApiClient,
    realtime: Arc<RealtimeChannel>,
    notifications: NotificationFeed,
}

impl HostelClient {
    pub fn new(
        config: ClientConfig,
        storage: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let session = SessionStore::new(storage);
        let notifications = NotificationFeed::new(config.notification_capacity);
        let realtime = Arc::new(
            RealtimeChannel::new(&config, session.clone()).with_notifier(notifier.clone()),
        );
        let navigator = Arc::new(EndSessionNavigator {
            realtime: Arc::downgrade(&realtime),
            notifications: notifications.clone(),
            inner: navigator,
        });
        let api = ApiClient::new(&config, session.clone())?
            .with_notifier(notifier)
            .with_navigator(navigator);

        Ok(Self {
            config,
            session,
            api,
            realtime,
            notifications,
        })
    }

    /// Connect the realtime channel and feed its notifications into the log.
    ///
    /// Returns `false` when signed out or already started.
    pub fn start(&self) -> bool {
        let listener = self.notifications.attach(&self.realtime);
        if self.realtime.connect() {
            return true;
        }
        self.realtime
            .off(ServerEvent::Notification.as_str(), listener);
        false
    }

    /// Sign out: close the channel, drop notifications and wipe the session.
    pub async fn logout(&self) {
        self.realtime.disconnect();
        self.notifications.clear();
        self.auth().logout().await;
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn realtime(&self) -> &RealtimeChannel {
        &self.realtime
    }

    pub fn notifications(&self) -> &NotificationFeed {
        &self.notifications
    }

    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(&self.api)
    }

    pub fn issues(&self) -> IssueService<'_> {
        IssueService::new(&self.api)
    }

    pub fn announcements(&self) -> AnnouncementService<'_> {
        AnnouncementService::new(&self.api)
    }

    pub fn lost_found(&self) -> LostFoundService<'_> {
        LostFoundService::new(&self.api)
    }
}

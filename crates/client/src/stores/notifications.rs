//! In-memory log of user-facing notifications.
//!
//! [`NotificationStore`] is the plain data structure, newest entry first.
//! [`NotificationFeed`] shares one store between the realtime channel and
//! readers, and publishes the unread count after every change.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use hostelmate_shared::ServerEvent;
use serde_json::Value;
use tokio::sync::watch;

use crate::realtime::{ListenerId, RealtimeChannel};

const DEFAULT_MESSAGE: &str = "New notification";

/// A notification received over the realtime channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub message: String,
    /// Icon hint taken from the payload's `type` or `category`.
    pub category: Option<String>,
    pub received_at: DateTime<Utc>,
    pub read: bool,
    /// The full event payload.
    pub payload: Value,
}

fn string_field(payload: &Value, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct NotificationStore {
    entries: VecDeque<Notification>,
    capacity: Option<usize>,
    seq: u64,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that keeps at most `capacity` entries, dropping the oldest.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Record a notification payload as the newest, unread entry.
    pub fn append(&mut self, payload: &Value) -> &Notification {
        let received_at = Utc::now();
        let id = string_field(payload, "_id")
            .or_else(|| string_field(payload, "id"))
            .unwrap_or_else(|| {
                self.seq += 1;
                format!("{}-{}", received_at.timestamp_millis(), self.seq)
            });
        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MESSAGE)
            .to_string();
        let category = string_field(payload, "type").or_else(|| string_field(payload, "category"));

        self.entries.push_front(Notification {
            id,
            message,
            category,
            received_at,
            read: false,
            payload: payload.clone(),
        });
        if let Some(capacity) = self.capacity {
            self.entries.truncate(capacity.max(1));
        }
        &self.entries[0]
    }

    pub fn mark_all_read(&mut self) {
        for entry in &mut self.entries {
            entry.read = true;
        }
    }

    /// Mark entries with `id` read. Returns whether any matched.
    pub fn mark_read(&mut self, id: &str) -> bool {
        let mut found = false;
        for entry in self.entries.iter_mut().filter(|n| n.id == id) {
            entry.read = true;
            found = true;
        }
        found
    }

    /// Remove entries with `id`. Returns whether any matched.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|n| n.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|n| !n.read).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.entries.iter().find(|n| n.id == id)
    }
}

/// Shared handle to a [`NotificationStore`].
#[derive(Debug, Clone)]
pub struct NotificationFeed {
    store: Arc<RwLock<NotificationStore>>,
    unread: Arc<watch::Sender<usize>>,
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new(None)
    }
}

impl NotificationFeed {
    pub fn new(capacity: Option<usize>) -> Self {
        let (unread, _) = watch::channel(0);
        Self {
            store: Arc::new(RwLock::new(NotificationStore::with_capacity(capacity))),
            unread: Arc::new(unread),
        }
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut NotificationStore) -> R) -> R {
        let mut store = self.store.write().unwrap_or_else(|e| e.into_inner());
        let result = f(&mut store);
        self.unread.send_replace(store.unread_count());
        result
    }

    fn read<R>(&self, f: impl FnOnce(&NotificationStore) -> R) -> R {
        let store = self.store.read().unwrap_or_else(|e| e.into_inner());
        f(&store)
    }

    pub fn append(&self, payload: &Value) -> Notification {
        self.mutate(|store| store.append(payload).clone())
    }

    pub fn mark_all_read(&self) {
        self.mutate(NotificationStore::mark_all_read)
    }

    pub fn mark_read(&self, id: &str) -> bool {
        self.mutate(|store| store.mark_read(id))
    }

    pub fn remove(&self, id: &str) -> bool {
        self.mutate(|store| store.remove(id))
    }

    pub fn clear(&self) {
        self.mutate(NotificationStore::clear)
    }

    pub fn unread_count(&self) -> usize {
        *self.unread.borrow()
    }

    pub fn len(&self) -> usize {
        self.read(NotificationStore::len)
    }

    pub fn is_empty(&self) -> bool {
        self.read(NotificationStore::is_empty)
    }

    /// Entries received after `after` (all of them for `None`), oldest first.
    pub fn received_after(&self, after: Option<DateTime<Utc>>) -> Vec<Notification> {
        self.read(|store| {
            let mut fresh: Vec<Notification> = store
                .iter()
                .take_while(|n| after.map_or(true, |t| n.received_at > t))
                .cloned()
                .collect();
            fresh.reverse();
            fresh
        })
    }

    /// Snapshot of the log, newest first.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.read(|store| store.iter().cloned().collect())
    }

    pub fn get(&self, id: &str) -> Option<Notification> {
        self.read(|store| store.get(id).cloned())
    }

    /// Subscribe to unread count changes.
    pub fn watch_unread(&self) -> watch::Receiver<usize> {
        self.unread.subscribe()
    }

    /// Append every `notification` event the channel delivers.
    pub fn attach(&self, channel: &RealtimeChannel) -> ListenerId {
        let feed = self.clone();
        channel.on(ServerEvent::Notification.as_str(), move |payload| {
            let notification = feed.append(payload);
            tracing::debug!("notification {} received", notification.id);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn append_prepends_unread_entries() {
        let mut store = NotificationStore::new();
        store.append(&json!({"_id": "n1", "message": "Pipe fixed"}));
        store.append(&json!({"id": 7, "message": "Water off at 9", "type": "maintenance"}));

        let ids: Vec<_> = store.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["7", "n1"]);
        assert_eq!(store.unread_count(), 2);
        assert_eq!(store.get("7").unwrap().category.as_deref(), Some("maintenance"));
        assert!(!store.get("n1").unwrap().read);
    }

    #[test]
    fn missing_fields_get_defaults() {
        let mut store = NotificationStore::new();
        let first = store.append(&json!({})).clone();
        let second = store.append(&Value::Null).clone();

        assert_eq!(first.message, "New notification");
        assert_ne!(first.id, second.id);
        assert!(first.category.is_none());
    }

    #[test]
    fn unread_tracks_every_mutation() {
        let mut store = NotificationStore::new();
        for n in 0..3 {
            store.append(&json!({"_id": format!("n{n}")}));
        }
        assert_eq!(store.unread_count(), 3);

        store.mark_all_read();
        assert_eq!(store.unread_count(), 0);

        store.append(&json!({"_id": "n3"}));
        assert_eq!(store.unread_count(), 1);
        assert!(store.mark_read("n3"));
        assert!(!store.mark_read("missing"));
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn remove_recomputes_unread() {
        let mut store = NotificationStore::new();
        store.append(&json!({"_id": "B"}));
        store.mark_all_read();
        store.append(&json!({"_id": "A"}));

        assert!(store.remove("A"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.unread_count(), 0);
        assert!(!store.remove("A"));

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn removing_a_read_entry_keeps_unread() {
        let mut store = NotificationStore::new();
        store.append(&json!({"_id": "B"}));
        store.mark_all_read();
        store.append(&json!({"_id": "A"}));

        assert!(store.remove("B"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.unread_count(), 1);
        assert!(store.get("A").is_some());
    }

    #[test]
    fn capacity_drops_oldest() {
        let mut store = NotificationStore::with_capacity(Some(2));
        for id in ["a", "b", "c"] {
            store.append(&json!({"_id": id}));
        }
        let ids: Vec<_> = store.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn received_after_keeps_working_at_capacity() {
        let feed = NotificationFeed::new(Some(2));
        let tick = || std::thread::sleep(std::time::Duration::from_millis(2));
        feed.append(&json!({"_id": "a"}));
        tick();
        let b = feed.append(&json!({"_id": "b"}));
        tick();
        feed.append(&json!({"_id": "c"}));

        let ids: Vec<_> = feed.received_after(None).into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["b", "c"]);

        let ids: Vec<_> = feed
            .received_after(Some(b.received_at))
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec!["c"]);
        assert_eq!(feed.len(), 2);
    }

    #[tokio::test]
    async fn feed_publishes_unread_count() {
        let feed = NotificationFeed::default();
        let mut unread = feed.watch_unread();

        feed.append(&json!({"_id": "n1", "message": "Pipe fixed"}));
        unread.changed().await.unwrap();
        assert_eq!(*unread.borrow_and_update(), 1);

        feed.mark_all_read();
        unread.changed().await.unwrap();
        assert_eq!(*unread.borrow_and_update(), 0);
        assert_eq!(feed.snapshot().len(), 1);
    }
}

//! Client-side state shared between the realtime channel and readers.

pub mod notifications;

pub use notifications::{Notification, NotificationFeed, NotificationStore};

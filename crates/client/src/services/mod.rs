//! Typed wrappers over the REST endpoints.
//!
//! Each service borrows an [`ApiClient`](crate::ApiClient) and raises a
//! success toast for mutations. Failures are already toasted by the client.

pub mod announcements;
pub mod auth;
pub mod issues;
pub mod lost_found;

pub use announcements::{AnnouncementFilters, AnnouncementService};
pub use auth::{AuthError, AuthService};
pub use issues::{IssueDraft, IssueFilters, IssueService, StatisticsFilters};
pub use lost_found::{LostFoundDraft, LostFoundFilters, LostFoundService};

use std::borrow::Cow;

use hostelmate_shared::Payload;

use crate::api_client::CallOptions;
use crate::notifier::{Notifier, Toast};

/// Query pairs for list filters. Unset and blank values are left out.
#[derive(Debug, Default)]
pub(crate) struct Query(Vec<(String, String)>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opt<V: ToString>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            let value = value.to_string();
            if !value.trim().is_empty() {
                self.0.push((key.to_string(), value));
            }
        }
        self
    }

    /// Numbers follow the same rule, with zero treated as unset.
    pub fn num(self, key: &str, value: Option<u32>) -> Self {
        self.opt(key, value.filter(|n| *n > 0))
    }

    pub fn into_options(self) -> CallOptions {
        CallOptions::default().with_query_pairs(self.0)
    }
}

/// Percent-encode an id for use as a path segment.
pub(crate) fn segment(id: &str) -> Cow<'_, str> {
    urlencoding::encode(id)
}

/// Success toast carrying the server's message, or `fallback`.
pub(crate) fn confirm(notifier: &dyn Notifier, payload: &Payload, fallback: &str) {
    let message = payload
        .message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(fallback);
    notifier.notify(Toast::success(message));
}

/// Success toast with a fixed message.
pub(crate) fn confirm_fixed(notifier: &dyn Notifier, message: &str) {
    notifier.notify(Toast::success(message));
}

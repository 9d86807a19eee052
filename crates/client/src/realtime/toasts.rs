//! Toasts raised for incoming realtime events.

use hostelmate_shared::ServerEvent;
use serde_json::Value;

use crate::notifier::Toast;

fn text_at<'a>(payload: &'a Value, pointer: &str) -> Option<&'a str> {
    payload
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// The toast to show for `event`, if any.
pub fn for_event(event: &str, payload: &Value) -> Option<Toast> {
    let toast = match ServerEvent::from_name(event)? {
        ServerEvent::NewIssue => Toast::info(format!(
            "New issue reported: {}",
            text_at(payload, "/issue/title").unwrap_or("Issue")
        ))
        .with_icon("🔔"),
        ServerEvent::StatusChanged => Toast::info(format!(
            "Issue status updated to: {}",
            text_at(payload, "/status").unwrap_or("unknown")
        ))
        .with_icon("📝"),
        ServerEvent::NewAnnouncement => Toast::info(format!(
            "New announcement: {}",
            text_at(payload, "/announcement/title").unwrap_or("Announcement")
        ))
        .with_icon("📢"),
        ServerEvent::DuplicateIssueDetected => {
            Toast::warning("Similar issue found! Check existing issues.").with_icon("⚠️")
        }
        ServerEvent::IssueAssigned => Toast::info(format!(
            "Issue assigned to {}",
            text_at(payload, "/assignedTo/fullName").unwrap_or("staff")
        ))
        .with_icon("👤"),
        ServerEvent::Notification => {
            Toast::info(text_at(payload, "/message").unwrap_or("New notification")).with_icon("🔔")
        }
        ServerEvent::IssueUpdated => Toast::info("Issue status updated").with_icon("📝"),
        ServerEvent::NewComment => Toast::info(format!(
            "{} commented on an issue",
            text_at(payload, "/user/fullName").unwrap_or("Someone")
        ))
        .with_icon("💬"),
        ServerEvent::Connect
        | ServerEvent::Disconnect
        | ServerEvent::ConnectError
        | ServerEvent::ReactionUpdated => return None,
    };
    Some(toast)
}

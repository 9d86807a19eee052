//! Names of the realtime events exchanged with the server.

/// Events pushed by the server (plus the lifecycle events the client raises
/// itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerEvent {
    Connect,
    Disconnect,
    ConnectError,
    Notification,
    IssueUpdated,
    NewComment,
    NewIssue,
    StatusChanged,
    NewAnnouncement,
    ReactionUpdated,
    DuplicateIssueDetected,
    IssueAssigned,
}

impl ServerEvent {
    pub const ALL: [ServerEvent; 12] = [
        ServerEvent::Connect,
        ServerEvent::Disconnect,
        ServerEvent::ConnectError,
        ServerEvent::Notification,
        ServerEvent::IssueUpdated,
        ServerEvent::NewComment,
        ServerEvent::NewIssue,
        ServerEvent::StatusChanged,
        ServerEvent::NewAnnouncement,
        ServerEvent::ReactionUpdated,
        ServerEvent::DuplicateIssueDetected,
        ServerEvent::IssueAssigned,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ServerEvent::Connect => "connect",
            ServerEvent::Disconnect => "disconnect",
            ServerEvent::ConnectError => "connect_error",
            ServerEvent::Notification => "notification",
            ServerEvent::IssueUpdated => "issue_updated",
            ServerEvent::NewComment => "new_comment",
            ServerEvent::NewIssue => "new_issue",
            ServerEvent::StatusChanged => "status_changed",
            ServerEvent::NewAnnouncement => "new_announcement",
            ServerEvent::ReactionUpdated => "reaction_updated",
            ServerEvent::DuplicateIssueDetected => "duplicate_issue_detected",
            ServerEvent::IssueAssigned => "issue_assigned",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.as_str() == name)
    }
}

impl std::fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Control messages the client sends to scope event delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    JoinRoom,
    LeaveRoom,
    JoinIssue,
    LeaveIssue,
}

impl ClientEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            ClientEvent::JoinRoom => "join_room",
            ClientEvent::LeaveRoom => "leave_room",
            ClientEvent::JoinIssue => "join_issue",
            ClientEvent::LeaveIssue => "leave_issue",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve_back_to_variants() {
        for event in ServerEvent::ALL {
            assert_eq!(ServerEvent::from_name(event.as_str()), Some(event));
        }
        assert_eq!(ServerEvent::from_name("typing"), None);
    }
}

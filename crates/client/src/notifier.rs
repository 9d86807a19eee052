//! User-facing side effects injected into the pipeline and the channel.
//!
//! The request pipeline and the realtime channel never talk to a UI directly;
//! they raise transient notices through a [`Notifier`] and ask a
//! [`Navigator`] to bring the user back to the login entry point when the
//! session is over.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
    Warning,
}

/// A transient notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    pub icon: Option<&'static str>,
    pub duration: Option<Duration>,
}

impl Toast {
    pub fn new(kind: ToastKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            icon: None,
            duration: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Warning, message)
    }

    pub fn with_icon(mut self, icon: &'static str) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Shows transient notices to the user.
pub trait Notifier: Send + Sync + std::fmt::Debug {
    fn notify(&self, toast: Toast);
}

/// Moves the user to the authentication entry point.
pub trait Navigator: Send + Sync + std::fmt::Debug {
    /// Credentials are gone and cannot be refreshed.
    fn session_ended(&self);
}

/// Notifier that writes toasts to the log. Used by the CLI and as a default.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, toast: Toast) {
        let icon = toast.icon.unwrap_or("");
        match toast.kind {
            ToastKind::Error => tracing::error!(target: "hostelmate::toast", "{icon} {}", toast.message),
            ToastKind::Warning => tracing::warn!(target: "hostelmate::toast", "{icon} {}", toast.message),
            ToastKind::Success | ToastKind::Info => {
                tracing::info!(target: "hostelmate::toast", "{icon} {}", toast.message)
            }
        }
    }
}

/// Navigator that only logs. Headless callers react to
/// [`hostelmate_shared::ApiError::SessionEnded`] themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn session_ended(&self) {
        tracing::warn!("session ended, login required");
    }
}

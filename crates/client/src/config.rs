//! Client configuration from environment variables.

use std::time::Duration;

use crate::realtime::ReconnectConfig;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_SOCKET_URL: &str = "http://localhost:5000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Endpoints and tunables for a [`crate::HostelClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API, e.g. `https://api.example.com/api`.
    pub api_url: String,
    /// Base URL of the realtime server (http/https/ws/wss).
    pub socket_url: String,
    /// Ceiling for every REST call, including refreshes and retries.
    pub request_timeout: Duration,
    pub reconnect: ReconnectConfig,
    /// Maximum number of notifications kept in memory. `None` keeps them all.
    pub notification_capacity: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            socket_url: DEFAULT_SOCKET_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reconnect: ReconnectConfig::default(),
            notification_capacity: None,
        }
    }
}

impl ClientConfig {
    /// Read configuration from the environment.
    ///
    /// Environment variables:
    /// - `HOSTELMATE_API_URL`: REST base URL (default: "http://localhost:5000/api")
    /// - `HOSTELMATE_SOCKET_URL`: realtime base URL (default: "http://localhost:5000")
    /// - `HOSTELMATE_REQUEST_TIMEOUT_SECS`: request ceiling in seconds (default: 30)
    /// - `HOSTELMATE_NOTIFICATION_CAPACITY`: notification log bound (default: unbounded)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let request_timeout = non_empty("HOSTELMATE_REQUEST_TIMEOUT_SECS")
            .and_then(|v| match v.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => {
                    tracing::warn!("ignoring invalid HOSTELMATE_REQUEST_TIMEOUT_SECS={v:?}");
                    None
                }
            })
            .unwrap_or(defaults.request_timeout);

        let notification_capacity = non_empty("HOSTELMATE_NOTIFICATION_CAPACITY").and_then(|v| {
            v.trim()
                .parse::<usize>()
                .map_err(|_| tracing::warn!("ignoring invalid HOSTELMATE_NOTIFICATION_CAPACITY={v:?}"))
                .ok()
        });

        Self {
            api_url: non_empty("HOSTELMATE_API_URL").unwrap_or(defaults.api_url),
            socket_url: non_empty("HOSTELMATE_SOCKET_URL").unwrap_or(defaults.socket_url),
            request_timeout,
            reconnect: defaults.reconnect,
            notification_capacity,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_socket_url(mut self, socket_url: impl Into<String>) -> Self {
        self.socket_url = socket_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_notification_capacity(mut self, capacity: Option<usize>) -> Self {
        self.notification_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn falls_back_to_localhost() {
        let config = ClientConfig::from_lookup(lookup(&[]));
        assert_eq!(config.api_url, "http://localhost:5000/api");
        assert_eq!(config.socket_url, "http://localhost:5000");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.notification_capacity, None);
        assert_eq!(config.reconnect.max_attempts, 5);
    }

    #[test]
    fn reads_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("HOSTELMATE_API_URL", "https://hostel.example/api"),
            ("HOSTELMATE_SOCKET_URL", "wss://hostel.example"),
            ("HOSTELMATE_REQUEST_TIMEOUT_SECS", "10"),
            ("HOSTELMATE_NOTIFICATION_CAPACITY", "50"),
        ]));
        assert_eq!(config.api_url, "https://hostel.example/api");
        assert_eq!(config.socket_url, "wss://hostel.example");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.notification_capacity, Some(50));
    }

    #[test]
    fn ignores_blank_and_invalid_values() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("HOSTELMATE_API_URL", "  "),
            ("HOSTELMATE_REQUEST_TIMEOUT_SECS", "soon"),
            ("HOSTELMATE_NOTIFICATION_CAPACITY", "-1"),
        ]));
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.notification_capacity, None);
    }
}

//! HTTP API client with bearer auth, envelope unwrapping and transparent
//! token refresh.
//!
//! Every call goes through the same pipeline:
//!
//! 1. attach `Authorization: Bearer <access token>` when signed in;
//! 2. on a 401, refresh the access token once and re-issue the request once;
//! 3. unwrap the `{success, data, message}` envelope into a [`Payload`];
//! 4. normalize failures into an [`ApiError`] and raise an error toast unless
//!    the caller asked for a silent call.
//!
//! If the refresh itself fails the session is cleared, the [`Navigator`] is
//! told and the call returns [`ApiError::SessionEnded`].

use std::sync::Arc;
use std::time::Duration;

use hostelmate_shared::{ApiError, Payload, RefreshTokenRequest, RefreshTokenResponse};
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, PRAGMA};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::auth_session::SessionStore;
use crate::config::ClientConfig;
use crate::notifier::{Navigator, Notifier, Toast, TracingNavigator, TracingNotifier};
use crate::upload::{ProgressFn, UploadForm};

/// Path of the token refresh endpoint, relative to the API base URL.
pub const REFRESH_PATH: &str = "/auth/refresh-token";

const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection.";

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Query string pairs appended to the URL.
    pub query: Vec<(String, String)>,
    /// Skip the error toast on failure.
    pub silent: bool,
}

impl CallOptions {
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn with_query_pairs(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }
}

enum RequestBody<'a> {
    Empty,
    Json(&'a Value),
    Multipart(&'a UploadForm, Option<ProgressFn>),
}

struct RawResponse {
    status: StatusCode,
    body: String,
}

impl RawResponse {
    fn into_payload(self) -> Result<Payload, ApiError> {
        if !self.status.is_success() {
            return Err(ApiError::from_response(self.status.as_u16(), &self.body));
        }
        let body = if self.body.trim().is_empty() {
            Value::Null
        } else {
            // Bodies that are not JSON are handed back verbatim
            serde_json::from_str(&self.body).unwrap_or(Value::String(self.body))
        };
        Ok(Payload::from_body(body))
    }
}

/// HTTP client for the HostelMate REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    session: SessionStore,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    /// Serializes refreshes so concurrent 401s trigger a single exchange.
    refresh_gate: Arc<tokio::sync::Mutex<()>>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: &ClientConfig, session: SessionStore) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            timeout: config.request_timeout,
            session,
            notifier: Arc::new(TracingNotifier),
            navigator: Arc::new(TracingNavigator),
            refresh_gate: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    /// Set the notifier used for error toasts
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Set the navigator told about terminal auth failures
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub(crate) fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Issue a JSON request through the full pipeline.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: &CallOptions,
    ) -> Result<Payload, ApiError> {
        let body = body.map_or(RequestBody::Empty, RequestBody::Json);
        self.execute(method, path, body, options).await
    }

    pub async fn get(&self, path: &str) -> Result<Payload, ApiError> {
        self.call(Method::GET, path, None, &CallOptions::default()).await
    }

    pub async fn get_with(&self, path: &str, options: &CallOptions) -> Result<Payload, ApiError> {
        self.call(Method::GET, path, None, options).await
    }

    pub async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Payload, ApiError> {
        self.send_json(Method::POST, path, body).await
    }

    pub async fn put<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Payload, ApiError> {
        self.send_json(Method::PUT, path, body).await
    }

    pub async fn patch<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Payload, ApiError> {
        self.send_json(Method::PATCH, path, body).await
    }

    pub async fn delete(&self, path: &str) -> Result<Payload, ApiError> {
        self.call(Method::DELETE, path, None, &CallOptions::default()).await
    }

    /// POST a `multipart/form-data` body, reporting progress as a percentage.
    pub async fn upload(
        &self,
        path: &str,
        form: &UploadForm,
        on_progress: Option<ProgressFn>,
    ) -> Result<Payload, ApiError> {
        let body = RequestBody::Multipart(form, on_progress);
        self.execute(Method::POST, path, body, &CallOptions::default()).await
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &T,
    ) -> Result<Payload, ApiError> {
        let options = CallOptions::default();
        let value = match serde_json::to_value(body) {
            Ok(value) => value,
            Err(e) => {
                let err = ApiError::Decode(format!("failed to encode request: {e}"));
                self.report(&method, path, &err, &options);
                return Err(err);
            }
        };
        self.call(method, path, Some(&value), &options).await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: RequestBody<'_>,
        options: &CallOptions,
    ) -> Result<Payload, ApiError> {
        let result = self.send_with_refresh(&method, path, &body, options).await;
        if let Err(err) = &result {
            self.report(&method, path, err, options);
        }
        result
    }

    fn report(&self, method: &Method, path: &str, err: &ApiError, options: &CallOptions) {
        match err {
            ApiError::SessionEnded(_) => {
                tracing::warn!("{} {} ended the session", method, path);
            }
            _ => {
                tracing::warn!("{} {} failed: {}", method, path, err);
                if !options.silent {
                    self.notifier.notify(Toast::error(err.message()));
                }
            }
        }
    }

    async fn send_with_refresh(
        &self,
        method: &Method,
        path: &str,
        body: &RequestBody<'_>,
        options: &CallOptions,
    ) -> Result<Payload, ApiError> {
        let token = self.session.access_token();
        let response = self
            .send_once(method, path, body, options, token.as_deref())
            .await?;

        // Nothing to refresh without either token (login, registration)
        if response.status != StatusCode::UNAUTHORIZED
            || (token.is_none() && self.session.refresh_token().is_none())
        {
            return response.into_payload();
        }

        tracing::debug!("{} {} returned 401, renewing access token", method, path);
        let fresh = self.renew_access_token(token.as_deref()).await?;

        // Retried once; a second 401 is returned to the caller as-is
        self.send_once(method, path, body, options, Some(&fresh))
            .await?
            .into_payload()
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        body: &RequestBody<'_>,
        options: &CallOptions,
        token: Option<&str>,
    ) -> Result<RawResponse, ApiError> {
        let url = self.url(path);
        tracing::debug!("{} {}", method, url);

        let mut rb = self.client.request(method.clone(), &url);
        if !options.query.is_empty() {
            rb = rb.query(&options.query);
        }
        if let Some(token) = token {
            rb = rb.bearer_auth(token);
        }
        rb = match body {
            RequestBody::Empty => rb,
            RequestBody::Json(value) => rb.json(value),
            RequestBody::Multipart(form, on_progress) => rb.multipart(form.to_multipart(on_progress.clone())?),
        };

        let resp = rb.send().await.map_err(|e| self.transport_error(&e))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(&e))?;

        Ok(RawResponse { status, body })
    }

    fn transport_error(&self, e: &reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::network(format!("timeout of {}ms exceeded", self.timeout.as_millis()))
        } else if e.is_connect() {
            ApiError::network(NETWORK_ERROR_MESSAGE)
        } else {
            ApiError::network(e.to_string())
        }
    }

    /// Get a usable access token after `stale` was rejected.
    ///
    /// Only one refresh runs at a time. A caller that waited behind another
    /// refresh reuses its result instead of spending the refresh token again.
    async fn renew_access_token(&self, stale: Option<&str>) -> Result<String, ApiError> {
        let _gate = self.refresh_gate.lock().await;

        if let Some(current) = self.session.access_token() {
            if Some(current.as_str()) != stale {
                return Ok(current);
            }
        }

        let Some(refresh_token) = self.session.refresh_token() else {
            return Err(self.end_session("no refresh token stored"));
        };

        match self.exchange_refresh_token(refresh_token).await {
            Ok(access_token) => {
                if let Err(e) = self.session.set_access_token(&access_token) {
                    tracing::error!("failed to persist refreshed access token: {}", e);
                }
                tracing::info!("access token refreshed");
                Ok(access_token)
            }
            Err(reason) => Err(self.end_session(&reason)),
        }
    }

    async fn exchange_refresh_token(&self, refresh_token: String) -> Result<String, String> {
        let resp = self
            .client
            .post(self.url(REFRESH_PATH))
            .json(&RefreshTokenRequest { refresh_token })
            .send()
            .await
            .map_err(|e| format!("refresh request failed: {e}"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("refresh rejected with status {status}"));
        }

        let parsed: RefreshTokenResponse = resp
            .json()
            .await
            .map_err(|e| format!("unreadable refresh response: {e}"))?;

        if parsed.data.access_token.is_empty() {
            return Err("refresh response carried an empty access token".to_string());
        }
        Ok(parsed.data.access_token)
    }

    fn end_session(&self, reason: &str) -> ApiError {
        tracing::warn!("cannot refresh credentials ({}), clearing session", reason);
        self.session.clear();
        self.navigator.session_ended();
        ApiError::session_ended()
    }
}

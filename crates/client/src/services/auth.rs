use hostelmate_shared::{
    ApiError, AuthResponse, Credentials, ForgotPasswordRequest, LoginRequest, Payload,
    RegisterRequest, ResetPasswordRequest,
};
use reqwest::Method;
use serde_json::json;
use thiserror::Error;

use crate::api_client::{ApiClient, CallOptions};
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("failed to persist session: {0}")]
    Storage(#[from] StorageError),
    #[error("login response carried no access token")]
    MissingToken,
}

/// Sign-in, registration and password recovery.
#[derive(Debug, Clone, Copy)]
pub struct AuthService<'a> {
    api: &'a ApiClient,
}

impl<'a> AuthService<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Sign in and persist the returned credentials and profile.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let auth: AuthResponse = self.api.post("/auth/login", &request).await?.decode()?;
        if auth.access_token.is_none() {
            return Err(AuthError::MissingToken);
        }
        self.persist(&auth)?;
        tracing::info!("signed in as {}", email);
        Ok(auth)
    }

    /// Create an account. Tokens are stored only when the server issues them
    /// right away; otherwise the account awaits OTP verification.
    pub async fn register(&self, form: &RegisterRequest) -> Result<AuthResponse, AuthError> {
        let auth: AuthResponse = self.api.post("/auth/register", form).await?.decode()?;
        self.persist(&auth)?;
        Ok(auth)
    }

    /// Ask the server to email a password reset OTP.
    pub async fn forgot_password(&self, email: &str) -> Result<Payload, ApiError> {
        let request = ForgotPasswordRequest {
            email: email.to_string(),
        };
        self.api.post("/auth/forgot-password", &request).await
    }

    pub async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<Payload, ApiError> {
        let request = ResetPasswordRequest {
            email: email.to_string(),
            otp: otp.to_string(),
            new_password: new_password.to_string(),
        };
        self.api.post("/auth/reset-password", &request).await
    }

    /// Tell the server (best effort) and wipe the local session.
    pub async fn logout(&self) {
        if self.api.session().is_authenticated() {
            if let Err(e) = self
                .api
                .call(Method::POST, "/auth/logout", Some(&json!({})), &CallOptions::silent())
                .await
            {
                tracing::debug!("logout request failed: {}", e);
            }
        }
        self.api.session().clear();
        tracing::info!("signed out");
    }

    fn persist(&self, auth: &AuthResponse) -> Result<(), StorageError> {
        let session = self.api.session();
        if let Some(access_token) = &auth.access_token {
            session.set_credentials(&Credentials {
                access_token: access_token.clone(),
                refresh_token: auth.refresh_token.clone(),
            })?;
        }
        if let Some(user) = &auth.user {
            session.set_user(user)?;
        }
        Ok(())
    }
}

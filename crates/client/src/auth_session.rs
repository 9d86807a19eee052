//! Session credentials persisted in the client's key-value store.

use std::sync::Arc;

use hostelmate_shared::{Credentials, UserProfile};

use crate::storage::{self, KeyValueStore, StorageError};

pub const ACCESS_TOKEN_KEY: &str = "accesstoken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";

/// Handle to the signed-in user's credentials and profile.
///
/// Cheap to clone; all clones share the same backing store. Only the request
/// pipeline and the auth service write through it.
#[derive(Debug, Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.get(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.store.get(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn credentials(&self) -> Option<Credentials> {
        Some(Credentials {
            access_token: self.access_token()?,
            refresh_token: self.refresh_token(),
        })
    }

    /// Check if user is authenticated
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// Store a fresh credential pair (login/registration).
    ///
    /// A missing refresh token removes any stale one.
    pub fn set_credentials(&self, credentials: &Credentials) -> Result<(), StorageError> {
        self.store.set(ACCESS_TOKEN_KEY, &credentials.access_token)?;
        match credentials.refresh_token.as_deref() {
            Some(refresh) => self.store.set(REFRESH_TOKEN_KEY, refresh)?,
            None => self.store.remove(REFRESH_TOKEN_KEY),
        }
        Ok(())
    }

    /// Replace the access token after a refresh.
    pub fn set_access_token(&self, token: &str) -> Result<(), StorageError> {
        self.store.set(ACCESS_TOKEN_KEY, token)
    }

    pub fn user(&self) -> Option<UserProfile> {
        storage::load(self.store.as_ref(), USER_KEY)
    }

    pub fn set_user(&self, user: &UserProfile) -> Result<(), StorageError> {
        storage::save(self.store.as_ref(), USER_KEY, user)
    }

    /// Logout: wipe everything in the store, not only the known keys.
    pub fn clear(&self) {
        self.store.clear();
    }
}

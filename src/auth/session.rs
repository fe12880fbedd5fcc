//! Session store: the JWT token pair and cached user profile.
//!
//! Exactly one session exists per client instance. The store is shared as
//! `Arc<SessionStore>` between the request pipeline and any view-layer
//! consumer; interior state sits behind an `RwLock` that is only held for
//! non-await critical sections. Concurrent `refresh()` calls are not
//! coalesced: each issues its own network call and the last writer wins.
//! Both renewed tokens are valid, so the race is benign.
//!
//! Every mutation of a token or profile field persists that field (or
//! removes its entry) synchronously, so a restart rehydrates identical
//! state. `logout` removes all three persisted entries.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::transport::{HttpTransport, RequestParts};

use super::error::AuthError;
use super::storage::{SessionKey, SessionStorage};
use super::token;

/// Login endpoint, relative to the API base URL.
const TOKEN_PATH: &str = "api/token/";

/// Refresh endpoint. The upstream service exposes this one without a
/// trailing slash.
const TOKEN_REFRESH_PATH: &str = "api/token/refresh";

/// Current-user profile endpoint.
const PROFILE_PATH: &str = "api/users/me/";

#[derive(Debug, Default)]
struct SessionState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct TokenPairResponse {
    access: String,
    refresh: String,
}

#[derive(Debug, Deserialize)]
struct TokenRefreshResponse {
    access: String,
}

pub struct SessionStore {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    storage: Arc<dyn SessionStorage>,
    state: RwLock<SessionState>,
}

impl SessionStore {
    /// Create a store hydrated from persisted storage.
    ///
    /// Each entry is read independently; an unreadable or corrupt entry is
    /// treated as absent.
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        storage: Arc<dyn SessionStorage>,
    ) -> Self {
        let access_token = Self::load_entry(storage.as_ref(), SessionKey::AccessToken);
        let refresh_token = Self::load_entry(storage.as_ref(), SessionKey::RefreshToken);
        let user = Self::load_entry(storage.as_ref(), SessionKey::Profile).and_then(|raw| {
            match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(error = %e, "Ignoring corrupt persisted profile");
                    None
                }
            }
        });

        Self {
            base_url: base_url.into(),
            transport,
            storage,
            state: RwLock::new(SessionState {
                access_token,
                refresh_token,
                user,
            }),
        }
    }

    fn load_entry(storage: &dyn SessionStorage, key: SessionKey) -> Option<String> {
        match storage.load(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(entry = key.name(), error = %e, "Failed to read persisted session entry");
                None
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    // ===== Persistence =====

    fn persist(&self, key: SessionKey, value: &str) {
        if let Err(e) = self.storage.store(key, value) {
            warn!(entry = key.name(), error = %e, "Failed to persist session entry");
        }
    }

    fn unpersist(&self, key: SessionKey) {
        if let Err(e) = self.storage.remove(key) {
            warn!(entry = key.name(), error = %e, "Failed to remove persisted session entry");
        }
    }

    // ===== State accessors =====

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token.clone()
    }

    /// The cached user profile, verbatim as the server returned it.
    pub fn user(&self) -> Option<Value> {
        self.read().user.clone()
    }

    pub fn is_access_token_expired(&self) -> bool {
        let state = self.read();
        state.access_token.as_deref().map_or(true, token::is_expired)
    }

    pub fn is_refresh_token_expired(&self) -> bool {
        let state = self.read();
        state
            .refresh_token
            .as_deref()
            .map_or(true, token::is_expired)
    }

    pub fn is_authenticated(&self) -> bool {
        let state = self.read();
        match (&state.access_token, &state.refresh_token) {
            (Some(access), Some(refresh)) => {
                !token::is_expired(access) && !token::is_expired(refresh)
            }
            _ => false,
        }
    }

    /// Access token to attach to an outgoing request: present and unexpired,
    /// or nothing.
    pub(crate) fn bearer_for_request(&self) -> Option<String> {
        let state = self.read();
        state
            .access_token
            .as_ref()
            .filter(|t| !token::is_expired(t))
            .cloned()
    }

    /// Whether a 401 is worth a refresh attempt: refresh token present and
    /// unexpired.
    pub(crate) fn has_usable_refresh_token(&self) -> bool {
        let state = self.read();
        state
            .refresh_token
            .as_deref()
            .is_some_and(|t| !token::is_expired(t))
    }

    // ===== Operations =====

    /// Exchange credentials for a token pair.
    ///
    /// Any existing session is cleared first. On success both tokens are
    /// stored and persisted, and the user profile is fetched best-effort -
    /// a profile failure does not fail the login.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), AuthError> {
        self.logout();

        debug!(username, "Logging in");
        let request = RequestParts::new(Method::POST, self.endpoint(TOKEN_PATH)).with_body(
            serde_json::json!({ "username": username, "password": password }),
        );
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| AuthError::Unknown(e.to_string()))?;

        if response.status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::InvalidCredentials);
        }
        if !response.status.is_success() {
            return Err(AuthError::ServerError(response.status));
        }

        let tokens: TokenPairResponse = serde_json::from_str(&response.body)
            .map_err(|e| AuthError::Unknown(format!("Unexpected token response: {}", e)))?;

        {
            let mut state = self.write();
            state.access_token = Some(tokens.access.clone());
            state.refresh_token = Some(tokens.refresh.clone());
        }
        self.persist(SessionKey::AccessToken, &tokens.access);
        self.persist(SessionKey::RefreshToken, &tokens.refresh);
        info!(username, "Logged in");

        self.fetch_profile().await;
        Ok(())
    }

    /// Mint a new access token from the stored refresh token.
    ///
    /// Only *presence* of the refresh token is checked here; the server's
    /// verdict on an expired one is authoritative. Any failure clears the
    /// whole session.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let Some(refresh_token) = self.refresh_token() else {
            self.logout();
            return Err(AuthError::MissingRefreshToken);
        };

        debug!("Refreshing access token");
        let request = RequestParts::new(Method::POST, self.endpoint(TOKEN_REFRESH_PATH))
            .with_body(serde_json::json!({ "refresh": refresh_token }));
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token refresh request failed");
                self.logout();
                return Err(AuthError::RefreshFailed);
            }
        };

        if !response.status.is_success() {
            warn!(status = %response.status, "Token refresh rejected");
            self.logout();
            return Err(AuthError::RefreshFailed);
        }

        let Ok(renewed) = serde_json::from_str::<TokenRefreshResponse>(&response.body) else {
            warn!("Unexpected token refresh response");
            self.logout();
            return Err(AuthError::RefreshFailed);
        };

        self.write().access_token = Some(renewed.access.clone());
        self.persist(SessionKey::AccessToken, &renewed.access);
        debug!("Access token renewed");
        Ok(())
    }

    /// Fetch the current user's profile, best-effort.
    ///
    /// On any failure the condition is logged and the previously cached
    /// profile is left untouched.
    pub async fn fetch_profile(&self) {
        let request = RequestParts::new(Method::GET, self.endpoint(PROFILE_PATH))
            .with_bearer(self.access_token());
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Failed to fetch user profile");
                return;
            }
        };

        if !response.status.is_success() {
            warn!(status = %response.status, "Failed to fetch user profile");
            return;
        }

        let profile: Value = match serde_json::from_str(&response.body) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Failed to parse user profile");
                return;
            }
        };

        debug!("Fetched user profile");
        self.write().user = Some(profile.clone());
        self.persist(SessionKey::Profile, &profile.to_string());
    }

    /// Clear the session, in memory and in persisted storage. Idempotent.
    pub fn logout(&self) {
        {
            let mut state = self.write();
            state.access_token = None;
            state.refresh_token = None;
            state.user = None;
        }
        self.unpersist(SessionKey::AccessToken);
        self.unpersist(SessionKey::RefreshToken);
        self.unpersist(SessionKey::Profile);
        debug!("Logged out");
    }
}

//! Session state, server-side authorization checks and route guards
//!
//! The backend is the authority on roles and permissions. The local
//! [`AuthUser`] copy drives UI decisions only; anything security-relevant
//! goes through [`AuthStore::verify_admin_access`] or
//! [`AuthStore::verify_permission`].

pub mod guard;
pub mod token;

pub use guard::{
    AdminGuard, AuthGuard, GuardOutcome, GuardSettings, Notice, PermissionGuard, RouteGuard,
};
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};

use crate::core::api::ApiClient;
use crate::core::error::{ClientError, ClientResult};
use crate::core::transport::ApiRequest;
use crate::entities::ROLE_ADMIN;
use crate::store::Slot;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;
use validator::Validate;

/// Shown when a login failure carries no server message
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed";

const LOGIN_PATH: &str = "/api/auth/login";
const LOGOUT_PATH: &str = "/api/auth/logout";
const PROFILE_PATH: &str = "/api/auth/me";
const VERIFY_ADMIN_PATH: &str = "/api/auth/verify-admin";
const VERIFY_PERMISSION_PATH: &str = "/api/auth/verify-permission";

/// Signed-in user as reported by `/api/auth/me`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct Credentials {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    user: AuthUser,
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminCheck {
    #[serde(default)]
    is_admin: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PermissionCheck {
    #[serde(default)]
    has_permission: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<AuthUser>,
    pub token: Option<String>,
    pub is_authenticated: bool,

    /// When the profile was last confirmed by the server
    pub last_profile_fetch: Option<DateTime<Utc>>,

    /// Message of the last failed login
    pub error: Option<String>,
}

/// Session store
///
/// Installs the bearer token on the shared [`ApiClient`], so every entity
/// store built from the same client is authenticated by one login.
pub struct AuthStore {
    api: ApiClient,
    tokens: Arc<dyn TokenStore>,
    state: Slot<AuthState>,
}

impl std::fmt::Debug for AuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStore")
            .field("is_authenticated", &self.is_authenticated())
            .finish()
    }
}

impl AuthStore {
    pub fn new(api: ApiClient, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            api,
            tokens,
            state: Slot::new(AuthState::default()),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn state(&self) -> AuthState {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.state.with(|s| s.user.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.state.with(|s| s.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.with(|s| s.is_authenticated)
    }

    pub fn error(&self) -> Option<String> {
        self.state.with(|s| s.error.clone())
    }

    // === Local role checks ===

    pub fn has_role(&self, role: &str) -> bool {
        self.state
            .with(|s| s.user.as_ref().is_some_and(|u| u.roles.iter().any(|r| r == role)))
    }

    /// Role-based hint only; see [`verify_admin_access`](Self::verify_admin_access)
    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.state.with(|s| {
            s.user
                .as_ref()
                .is_some_and(|u| u.permissions.iter().any(|p| p == permission))
        })
    }

    pub fn has_all_permissions(&self, permissions: &[&str]) -> bool {
        self.state.with(|s| match &s.user {
            Some(user) => permissions
                .iter()
                .all(|wanted| user.permissions.iter().any(|p| p == wanted)),
            None => false,
        })
    }

    pub fn has_any_permission(&self, permissions: &[&str]) -> bool {
        self.state.with(|s| match &s.user {
            Some(user) => permissions
                .iter()
                .any(|wanted| user.permissions.iter().any(|p| p == wanted)),
            None => false,
        })
    }

    /// True when the profile was never fetched or is older than `max_age`
    pub fn profile_is_stale(&self, max_age: TimeDelta) -> bool {
        self.state.with(|s| match s.last_profile_fetch {
            Some(fetched) => Utc::now() - fetched >= max_age,
            None => true,
        })
    }

    // === Session lifecycle ===

    /// Sign in and persist the session token
    pub async fn login(&self, credentials: &Credentials) -> ClientResult<AuthUser> {
        let result = self.request_login(credentials).await;

        match result {
            Ok(LoginResponse { user, token }) => {
                self.api.set_bearer_token(Some(token.clone()));
                if let Err(e) = self.tokens.save(&token).await {
                    tracing::warn!(error = %e, "failed to persist session token");
                }
                self.state.modify(|s| {
                    s.user = Some(user.clone());
                    s.token = Some(token);
                    s.is_authenticated = true;
                    s.last_profile_fetch = Some(Utc::now());
                    s.error = None;
                });
                tracing::info!(email = %user.email, "logged in");
                Ok(user)
            }
            Err(err) => {
                tracing::error!(status = ?err.status(), error = %err, "login failed");
                let message = login_failure_message(&err);
                self.state.modify(|s| s.error = Some(message));
                Err(err)
            }
        }
    }

    async fn request_login(&self, credentials: &Credentials) -> ClientResult<LoginResponse> {
        credentials.validate()?;
        let request = ApiRequest::post(LOGIN_PATH).json(credentials)?;
        self.api.json(request).await
    }

    /// End the session
    ///
    /// The server is told when a token is held; its answer does not matter.
    /// Local state, the bearer token and the persisted token are always cleared.
    pub async fn logout(&self) {
        if self.token().is_some() {
            if let Err(e) = self.api.send(ApiRequest::post(LOGOUT_PATH)).await {
                tracing::warn!(error = %e, "logout notification failed");
            }
        }
        self.clear_session().await;
        tracing::info!("logged out");
    }

    async fn clear_session(&self) {
        self.api.set_bearer_token(None);
        self.state.set(AuthState::default());
        if let Err(e) = self.tokens.clear().await {
            tracing::warn!(error = %e, "failed to clear persisted token");
        }
    }

    /// Refresh the user record from the server
    ///
    /// A 401 ends the session before the error is returned.
    pub async fn fetch_user_profile(&self) -> ClientResult<AuthUser> {
        match self.api.json::<AuthUser>(ApiRequest::get(PROFILE_PATH)).await {
            Ok(user) => {
                self.state.modify(|s| {
                    s.user = Some(user.clone());
                    s.last_profile_fetch = Some(Utc::now());
                });
                Ok(user)
            }
            Err(err) => {
                tracing::error!(
                    status = ?err.status(),
                    error = %err,
                    "failed to fetch user profile"
                );
                if err.is_unauthorized() {
                    self.logout().await;
                }
                Err(err)
            }
        }
    }

    /// Restore a persisted session, returning whether it is still valid
    pub async fn initialize(&self) -> bool {
        let token = match self.tokens.load().await {
            Ok(Some(token)) => token,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load persisted token");
                return false;
            }
        };

        self.api.set_bearer_token(Some(token.clone()));
        self.state.modify(|s| s.token = Some(token));

        match self.fetch_user_profile().await {
            Ok(_) => {
                self.state.modify(|s| s.is_authenticated = true);
                true
            }
            Err(_) => {
                self.clear_session().await;
                false
            }
        }
    }

    // === Server-side checks ===

    /// Ask the server whether the current user is an administrator
    ///
    /// Any failure counts as "no".
    pub async fn verify_admin_access(&self) -> bool {
        match self.api.json::<AdminCheck>(ApiRequest::get(VERIFY_ADMIN_PATH)).await {
            Ok(check) => check.is_admin,
            Err(e) => {
                tracing::warn!(error = %e, "admin verification failed");
                false
            }
        }
    }

    /// Ask the server whether the current user holds `permission`
    pub async fn verify_permission(&self, permission: &str) -> bool {
        let request = match ApiRequest::post(VERIFY_PERMISSION_PATH)
            .json(&serde_json::json!({ "permission": permission }))
        {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "permission verification failed");
                return false;
            }
        };

        match self.api.json::<PermissionCheck>(request).await {
            Ok(check) => check.has_permission,
            Err(e) => {
                tracing::warn!(permission, error = %e, "permission verification failed");
                false
            }
        }
    }
}

/// Server `message` for a failed login, or [`LOGIN_FAILED_MESSAGE`]
pub fn login_failure_message(err: &ClientError) -> String {
    match err {
        ClientError::Server {
            message: Some(message),
            ..
        } => message.clone(),
        _ => LOGIN_FAILED_MESSAGE.to_string(),
    }
}

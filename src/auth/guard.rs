//! Route guards
//!
//! A guard decides whether navigation to a target route may proceed. It never
//! navigates itself: the caller receives a [`GuardOutcome`] and acts on it.
//!
//! ```text
//! AuthGuard        unauthenticated ──▶ {login}?redirect={target}
//!                  stale profile   ──▶ refresh (401 ──▶ {login})
//! AdminGuard       not admin       ──▶ report ──▶ {home} + notice
//! PermissionGuard  missing grant   ──▶ report ──▶ {home} + notice
//! ```

use super::AuthStore;
use crate::core::transport::ApiRequest;
use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use serde::Serialize;
use std::sync::Arc;

const UNAUTHORIZED_ACCESS_PATH: &str = "/api/security/log-unauthorized-access";

/// Message to surface alongside a redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn access_denied(area: &str) -> Self {
        Self {
            title: "Access denied".to_string(),
            description: format!("You do not have permission to access the {area}."),
        }
    }
}

/// Decision taken by a guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Allow,
    Redirect {
        location: String,
        notice: Option<Notice>,
    },
}

impl GuardOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardOutcome::Allow)
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            GuardOutcome::Allow => None,
            GuardOutcome::Redirect { location, .. } => Some(location),
        }
    }

    fn redirect(location: impl Into<String>) -> Self {
        GuardOutcome::Redirect {
            location: location.into(),
            notice: None,
        }
    }
}

/// Routes and timings shared by all guards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardSettings {
    pub login_path: String,
    pub home_path: String,

    /// Profiles older than this are re-fetched by [`AuthGuard`]
    pub profile_max_age: TimeDelta,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            home_path: "/".to_string(),
            profile_max_age: TimeDelta::minutes(5),
        }
    }
}

impl GuardSettings {
    /// Login route carrying the originally requested target
    pub fn login_redirect(&self, target: &str) -> String {
        format!("{}?redirect={}", self.login_path, urlencoding::encode(target))
    }
}

/// A navigation check
#[async_trait]
pub trait RouteGuard: Send + Sync {
    async fn check(&self, target: &str) -> GuardOutcome;
}

/// Requires a signed-in user with a reasonably fresh profile
#[derive(Debug, Clone)]
pub struct AuthGuard {
    auth: Arc<AuthStore>,
    settings: GuardSettings,
}

impl AuthGuard {
    pub fn new(auth: Arc<AuthStore>, settings: GuardSettings) -> Self {
        Self { auth, settings }
    }
}

#[async_trait]
impl RouteGuard for AuthGuard {
    async fn check(&self, target: &str) -> GuardOutcome {
        if !self.auth.is_authenticated() {
            tracing::warn!(route = target, "protected route denied: not authenticated");
            return GuardOutcome::redirect(self.settings.login_redirect(target));
        }

        let has_session = self.auth.state().user.is_some() && self.auth.token().is_some();
        if has_session && self.auth.profile_is_stale(self.settings.profile_max_age) {
            if let Err(err) = self.auth.fetch_user_profile().await {
                if err.is_unauthorized() {
                    // fetch_user_profile already ended the session
                    tracing::warn!(route = target, "session expired");
                    return GuardOutcome::redirect(self.settings.login_path.clone());
                }
                tracing::warn!(
                    route = target,
                    error = %err,
                    "profile refresh failed, keeping session"
                );
            }
        }

        tracing::debug!(route = target, "protected route granted");
        GuardOutcome::Allow
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UnauthorizedAccess<'a> {
    route: &'a str,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_email: Option<String>,
}

/// Tell the backend about a refused navigation; failures are only logged
async fn report_unauthorized_access(auth: &AuthStore, route: &str) {
    let report = UnauthorizedAccess {
        route,
        timestamp: Utc::now().to_rfc3339(),
        user_email: auth.user().map(|u| u.email),
    };

    let result = match ApiRequest::post(UNAUTHORIZED_ACCESS_PATH).json(&report) {
        Ok(request) => auth.api().send(request).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        tracing::error!(route, error = %e, "failed to report unauthorized access");
    }
}

/// Requires server-confirmed administrator access
#[derive(Debug, Clone)]
pub struct AdminGuard {
    auth: Arc<AuthStore>,
    settings: GuardSettings,
}

impl AdminGuard {
    pub fn new(auth: Arc<AuthStore>, settings: GuardSettings) -> Self {
        Self { auth, settings }
    }
}

#[async_trait]
impl RouteGuard for AdminGuard {
    async fn check(&self, target: &str) -> GuardOutcome {
        if !self.auth.is_authenticated() {
            tracing::warn!(route = target, "admin route denied: not authenticated");
            return GuardOutcome::redirect(self.settings.login_redirect(target));
        }

        if !self.auth.verify_admin_access().await {
            tracing::warn!(route = target, "admin route denied: not an administrator");
            report_unauthorized_access(&self.auth, target).await;
            return GuardOutcome::Redirect {
                location: self.settings.home_path.clone(),
                notice: Some(Notice::access_denied("administrator area")),
            };
        }

        tracing::debug!(route = target, "admin route granted");
        GuardOutcome::Allow
    }
}

/// Requires a server-confirmed permission
#[derive(Debug, Clone)]
pub struct PermissionGuard {
    auth: Arc<AuthStore>,
    settings: GuardSettings,
    permission: String,
}

impl PermissionGuard {
    pub fn new(
        auth: Arc<AuthStore>,
        settings: GuardSettings,
        permission: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            settings,
            permission: permission.into(),
        }
    }

    pub fn permission(&self) -> &str {
        &self.permission
    }
}

#[async_trait]
impl RouteGuard for PermissionGuard {
    async fn check(&self, target: &str) -> GuardOutcome {
        if !self.auth.is_authenticated() {
            tracing::warn!(route = target, "route denied: not authenticated");
            return GuardOutcome::redirect(self.settings.login_redirect(target));
        }

        if !self.auth.verify_permission(&self.permission).await {
            tracing::warn!(
                route = target,
                permission = %self.permission,
                "route denied: missing permission"
            );
            report_unauthorized_access(&self.auth, target).await;
            return GuardOutcome::Redirect {
                location: self.settings.home_path.clone(),
                notice: Some(Notice::access_denied("requested page")),
            };
        }

        GuardOutcome::Allow
    }
}

//! # StaffDesk Client
//!
//! Typed REST client and observable entity stores for the StaffDesk HR backend.
//!
//! ## Features
//!
//! - **Generic Entity Store**: One CRUD engine for every REST resource, with loading/error tracking
//! - **Observable State**: Every store publishes snapshots through `tokio::sync::watch`
//! - **Domain Stores**: Users, work entries and vacation requests with their extra endpoints
//! - **Authentication**: Session handling, persisted tokens and server-verified access checks
//! - **Route Guards**: Navigation decisions returned as values, never performed
//! - **Validated Payloads**: Request bodies checked locally before they are sent
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use staffdesk::prelude::*;
//!
//! let desk = StaffDesk::new(ClientConfig::from_yaml_file("staffdesk.yaml")?)?;
//! desk.auth.login(&Credentials::new("lee@staffdesk.io", "secret")).await?;
//!
//! let entries = desk.work_entries.get_my_entries(None).await?;
//! let balance = desk.vacation_requests.get_my_balance(None).await?;
//!
//! if !desk.admin_guard().check("/admin").await.is_allowed() {
//!     // navigate elsewhere
//! }
//! ```

pub mod auth;
pub mod config;
pub mod core;
pub mod entities;
pub mod http;
pub mod resources;
pub mod store;
pub mod telemetry;

#[cfg(test)]
mod test_support;

use crate::auth::{
    AdminGuard, AuthGuard, AuthStore, FileTokenStore, MemoryTokenStore, PermissionGuard,
    TokenStore,
};
use crate::config::ClientConfig;
use crate::core::{ApiClient, ClientResult, HttpTransport};
use crate::http::ReqwestTransport;
use crate::resources::{UserStore, VacationRequestStore, WorkEntryStore};
use std::sync::Arc;

/// Every store of one client session, sharing a single [`ApiClient`]
///
/// The bearer token obtained by [`AuthStore::login`] is therefore seen by all
/// other stores immediately.
#[derive(Debug, Clone)]
pub struct StaffDesk {
    pub config: ClientConfig,
    pub api: ApiClient,
    pub auth: Arc<AuthStore>,
    pub users: Arc<UserStore>,
    pub work_entries: Arc<WorkEntryStore>,
    pub vacation_requests: Arc<VacationRequestStore>,
}

impl StaffDesk {
    /// Client talking HTTP to `config.base_url`
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Client over any transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let api = ApiClient::new(transport);
        let tokens: Arc<dyn TokenStore> = match &config.token_file {
            Some(path) => Arc::new(FileTokenStore::new(path)),
            None => Arc::new(MemoryTokenStore::new()),
        };
        let page_size = config.default_page_size;

        tracing::debug!(
            base_url = %config.base_url,
            page_size,
            persistent_token = config.token_file.is_some(),
            "staffdesk client configured"
        );

        Self {
            auth: Arc::new(AuthStore::new(api.clone(), tokens)),
            users: Arc::new(UserStore::new(api.clone(), page_size)),
            work_entries: Arc::new(WorkEntryStore::new(api.clone(), page_size)),
            vacation_requests: Arc::new(VacationRequestStore::new(api.clone(), page_size)),
            api,
            config,
        }
    }

    pub fn auth_guard(&self) -> AuthGuard {
        AuthGuard::new(self.auth.clone(), self.config.guard_settings())
    }

    pub fn admin_guard(&self) -> AdminGuard {
        AdminGuard::new(self.auth.clone(), self.config.guard_settings())
    }

    pub fn permission_guard(&self, permission: impl Into<String>) -> PermissionGuard {
        PermissionGuard::new(self.auth.clone(), self.config.guard_settings(), permission)
    }
}

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        ApiClient, ApiRequest, Blob, ClientError, ClientResult, Entity, FileUpload, HttpTransport,
        NoFilter, QueryParams, Resource, calendar,
    };

    // === Stores ===
    pub use crate::resources::{UserStore, VacationRequestStore, WorkEntryStore};
    pub use crate::store::{EntityStore, Slot, StoreState};

    // === Entities ===
    pub use crate::entities::*;

    // === Auth ===
    pub use crate::auth::{
        AdminGuard, AuthGuard, AuthState, AuthStore, AuthUser, Credentials, FileTokenStore,
        GuardOutcome, GuardSettings, MemoryTokenStore, Notice, PermissionGuard, RouteGuard,
        TokenStore,
    };

    // === Config ===
    pub use crate::config::ClientConfig;
    pub use crate::http::ReqwestTransport;
    pub use crate::{StaffDesk, impl_resource};

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, NaiveDate, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;
    pub use validator::Validate;
}

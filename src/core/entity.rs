//! Entity traits defining the core abstraction for all server records

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::Validate;

/// Base trait for every record managed by the backend.
///
/// All entities have:
/// - id: Unique identifier assigned by the server
/// - created_at: Creation timestamp
/// - updated_at: Last modification timestamp
///
/// The stores never look past these fields; domain data is opaque to them.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Human-readable entity name used to label diagnostics (e.g., "WorkEntry")
    fn entity_name() -> &'static str;

    /// Get the unique identifier for this entity instance
    fn id(&self) -> Uuid;

    /// Get the creation timestamp
    fn created_at(&self) -> DateTime<Utc>;

    /// Get the last update timestamp
    fn updated_at(&self) -> DateTime<Utc>;
}

/// Binds an entity to the REST resource serving it and to its payload shapes.
///
/// `Patch` is expected to be a strict subset of `Update`; the store sends it
/// with `PATCH`, so every field should be optional and skipped when absent.
pub trait Resource: Entity + DeserializeOwned {
    /// Payload for `POST {base}`
    type Create: Serialize + Validate + Send + Sync;

    /// Payload for `PUT {base}/{id}`
    type Update: Serialize + Validate + Send + Sync;

    /// Payload for `PATCH {base}/{id}`
    type Patch: Serialize + Validate + Send + Sync;

    /// Filter fields merged into listing query strings
    type Filter: Serialize + Send + Sync;

    /// Base resource path (e.g., "/api/work-entries")
    fn base_path() -> &'static str;
}

/// Filter for resources that accept no listing filter
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NoFilter {}

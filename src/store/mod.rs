//! Generic entity store
//!
//! An [`EntityStore`] mediates between consumers and one REST resource. It
//! keeps the last fetched page and the last touched item, and reports
//! loading/error state the same way for every operation:
//!
//! 1. `loading = true`, `error = None`
//! 2. one request through the shared [`ApiClient`]
//! 3. on success, mirror the server's representation into local state
//! 4. on failure, log, record [`ClientError::user_message`], return the error
//! 5. `loading = false`, whatever happened
//!
//! Domain stores hold an `EntityStore` and reuse [`EntityStore::tracked`]
//! for their own endpoints.
//!
//! # Concurrency
//!
//! Overlapping calls on one store share the single `loading`/`error`/
//! `current_item` slots. The visible flags reflect whichever call started or
//! finished last; calls are not queued.

pub mod state;

pub use state::{Slot, StoreState};

use crate::core::api::ApiClient;
use crate::core::entity::Resource;
use crate::core::error::{ClientError, ClientResult};
use crate::core::query::QueryParams;
use crate::core::transport::ApiRequest;
use futures::Stream;
use state::LoadingGuard;
use std::future::Future;
use tokio::sync::watch;
use uuid::Uuid;
use validator::Validate;

/// Default page size when none is configured
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Client-side cache and CRUD wrapper for one REST resource
pub struct EntityStore<T: Resource> {
    api: ApiClient,
    base_path: String,
    entity_name: String,
    state: Slot<StoreState<T>>,
}

impl<T: Resource> std::fmt::Debug for EntityStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("base_path", &self.base_path)
            .field("entity_name", &self.entity_name)
            .finish()
    }
}

impl<T: Resource> EntityStore<T> {
    /// Store for `T` at its declared base path
    pub fn new(api: ApiClient, page_size: u32) -> Self {
        Self::with_path(api, T::base_path(), T::entity_name(), page_size)
    }

    /// Store with an explicit base path and diagnostic entity name
    pub fn with_path(
        api: ApiClient,
        base_path: impl Into<String>,
        entity_name: impl Into<String>,
        page_size: u32,
    ) -> Self {
        Self {
            api,
            base_path: base_path.into().trim_end_matches('/').to_string(),
            entity_name: entity_name.into(),
            state: Slot::new(StoreState::new(page_size)),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    /// `{base}/{suffix}`
    pub fn path(&self, suffix: impl std::fmt::Display) -> String {
        format!("{}/{}", self.base_path, suffix)
    }

    // === State access ===

    pub fn state(&self) -> StoreState<T> {
        self.state.get()
    }

    pub fn items(&self) -> Vec<T> {
        self.state.with(|s| s.items.clone())
    }

    pub fn current_item(&self) -> Option<T> {
        self.state.with(|s| s.current_item.clone())
    }

    pub fn loading(&self) -> bool {
        self.state.with(|s| s.loading)
    }

    pub fn error(&self) -> Option<String> {
        self.state.with(|s| s.error.clone())
    }

    pub fn total(&self) -> u64 {
        self.state.with(|s| s.total)
    }

    pub fn page(&self) -> u32 {
        self.state.with(|s| s.page)
    }

    pub fn page_size(&self) -> u32 {
        self.state.with(|s| s.page_size)
    }

    pub fn has_items(&self) -> bool {
        self.state.with(StoreState::has_items)
    }

    pub fn has_error(&self) -> bool {
        self.state.with(StoreState::has_error)
    }

    pub fn is_loading(&self) -> bool {
        self.loading()
    }

    pub fn total_pages(&self) -> u64 {
        self.state.with(StoreState::total_pages)
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreState<T>> {
        self.state.subscribe()
    }

    pub fn changes(&self) -> impl Stream<Item = StoreState<T>> + Send + 'static {
        self.state.changes()
    }

    /// Apply a local mutation to the state
    pub fn modify_state(&self, f: impl FnOnce(&mut StoreState<T>)) {
        self.state.modify(f);
    }

    // === Request wrapper ===

    /// Run one request under the store's loading/error contract
    ///
    /// `operation` labels the diagnostic logged on failure.
    pub async fn tracked<R, Fut>(&self, operation: &'static str, request: Fut) -> ClientResult<R>
    where
        Fut: Future<Output = ClientResult<R>>,
    {
        let _loading = LoadingGuard::begin(&self.state);

        match request.await {
            Ok(value) => Ok(value),
            Err(err) => {
                self.record_failure(operation, &err);
                Err(err)
            }
        }
    }

    fn record_failure(&self, operation: &'static str, err: &ClientError) {
        tracing::error!(
            entity = %self.entity_name,
            operation,
            status = ?err.status(),
            error = %err,
            "{} store error",
            self.entity_name
        );
        let message = err.user_message();
        self.state.modify(|s| s.error = Some(message));
    }

    /// Pagination counters followed by the filter fields
    pub fn listing_params<F: serde::Serialize + ?Sized>(
        &self,
        filter: Option<&F>,
    ) -> ClientResult<QueryParams> {
        let (page, page_size) = self.state.with(|s| (s.page, s.page_size));
        let mut params = QueryParams::paged(page, page_size);
        if let Some(filter) = filter {
            params.merge(filter)?;
        }
        Ok(params)
    }

    // === CRUD ===

    /// Fetch the current page, replacing `items` and the pagination counters
    pub async fn get_all(&self, filter: Option<&T::Filter>) -> ClientResult<Vec<T>> {
        self.tracked("get_all", async {
            let params = self.listing_params(filter)?;
            let request = ApiRequest::get(self.base_path.as_str()).query(params);
            let page = self.api.paginated::<T>(request).await?;

            self.state.modify(|s| {
                s.items = page.data.clone();
                s.total = page.total;
                s.page = page.page;
                s.page_size = page.page_size;
            });
            Ok(page.data)
        })
        .await
    }

    /// Fetch one entity into `current_item`
    pub async fn get_by_id(&self, id: Uuid) -> ClientResult<T> {
        self.tracked("get_by_id", async {
            let entity: T = self.api.single(ApiRequest::get(self.path(id))).await?;
            self.set_current_item(Some(entity.clone()));
            Ok(entity)
        })
        .await
    }

    /// Create an entity; it is prepended to `items` only while on page 1
    pub async fn create(&self, payload: &T::Create) -> ClientResult<T> {
        self.tracked("create", async {
            payload.validate()?;
            let request = ApiRequest::post(self.base_path.as_str()).json(payload)?;
            let entity: T = self.api.single(request).await?;

            self.state.modify(|s| {
                if s.page == 1 {
                    s.items.insert(0, entity.clone());
                }
                s.current_item = Some(entity.clone());
            });
            Ok(entity)
        })
        .await
    }

    /// Full update with `PUT`
    pub async fn update(&self, id: Uuid, payload: &T::Update) -> ClientResult<T> {
        self.tracked("update", async {
            payload.validate()?;
            let request = ApiRequest::put(self.path(id)).json(payload)?;
            let entity: T = self.api.single(request).await?;
            self.apply_mutation(id, &entity);
            Ok(entity)
        })
        .await
    }

    /// Partial update with `PATCH`
    pub async fn patch(&self, id: Uuid, payload: &T::Patch) -> ClientResult<T> {
        self.tracked("patch", async {
            payload.validate()?;
            let request = ApiRequest::patch(self.path(id)).json(payload)?;
            let entity: T = self.api.single(request).await?;
            self.apply_mutation(id, &entity);
            Ok(entity)
        })
        .await
    }

    /// Delete server-side, then drop the entity from local state
    pub async fn delete(&self, id: Uuid) -> ClientResult<()> {
        self.tracked("delete", async {
            self.api.send(ApiRequest::delete(self.path(id))).await?;
            self.state.modify(|s| {
                s.items.retain(|item| item.id() != id);
                if s.current_item.as_ref().is_some_and(|item| item.id() == id) {
                    s.current_item = None;
                }
            });
            Ok(())
        })
        .await
    }

    /// Re-run [`get_all`](Self::get_all), discarding the result
    pub async fn refresh(&self, filter: Option<&T::Filter>) -> ClientResult<()> {
        self.get_all(filter).await.map(|_| ())
    }

    // === Local mutations ===

    pub fn clear_current_item(&self) {
        self.set_current_item(None);
    }

    /// Empty `items` and reset `total`
    pub fn clear_items(&self) {
        self.state.modify(|s| {
            s.items.clear();
            s.total = 0;
        });
    }

    pub fn clear_error(&self) {
        self.state.modify(|s| s.error = None);
    }

    /// Page used by the next listing; does not fetch
    pub fn set_page(&self, page: u32) {
        self.state.modify(|s| s.page = page);
    }

    /// Page size used by the next listing; does not fetch
    pub fn set_page_size(&self, page_size: u32) {
        self.state.modify(|s| s.page_size = page_size);
    }

    pub fn set_current_item(&self, item: Option<T>) {
        self.state.modify(|s| s.current_item = item);
    }

    /// Replace the entry with `id` in `items`, if cached
    pub fn replace_item(&self, id: Uuid, entity: &T) {
        self.state.modify(|s| replace_by_id(&mut s.items, id, entity));
    }

    /// Replace each returned entity that is present in `items`
    pub fn replace_items(&self, entities: &[T]) {
        self.state.modify(|s| {
            for entity in entities {
                replace_by_id(&mut s.items, entity.id(), entity);
            }
        });
    }

    /// Replace in `items` and make it the current item
    fn apply_mutation(&self, id: Uuid, entity: &T) {
        self.state.modify(|s| {
            replace_by_id(&mut s.items, id, entity);
            s.current_item = Some(entity.clone());
        });
    }

    /// Replace `items` and `total` from a listing that does not echo pagination
    pub fn set_listing(&self, items: Vec<T>, total: u64) {
        self.state.modify(|s| {
            s.items = items;
            s.total = total;
        });
    }

    pub fn set_total(&self, total: u64) {
        self.state.modify(|s| s.total = total);
    }
}

/// Overwrite the element whose id matches; no-op when absent
pub fn replace_by_id<T: Resource>(items: &mut [T], id: Uuid, entity: &T) {
    if let Some(slot) = items.iter_mut().find(|item| item.id() == id) {
        *slot = entity.clone();
    }
}

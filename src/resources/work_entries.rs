//! Work entry store: own entries, admin approval workflow and reporting

use crate::core::api::{ApiClient, Blob};
use crate::core::calendar;
use crate::core::error::ClientResult;
use crate::core::query::QueryParams;
use crate::core::transport::ApiRequest;
use crate::entities::{
    DEFAULT_BREAK_MINUTES, WorkEntry, WorkEntryAdminUpdate, WorkEntryApproval,
    WorkEntryBulkAction, WorkEntryCreate, WorkEntryExportOptions, WorkEntryFilter,
    WorkEntryPatch, WorkEntryRejection, WorkEntryStatistics, WorkEntryStatus, WorkEntryUpdate,
};
use crate::store::{EntityStore, Slot, replace_by_id};
use chrono::NaiveDate;
use futures::Stream;
use std::ops::Deref;
use tokio::sync::watch;
use uuid::Uuid;
use validator::Validate;

const ADMIN_PATH: &str = "/api/admin/work-entries";

/// Work entries store
///
/// `items` holds the admin listing; the signed-in user's own entries live in
/// a separate `my_entries` slot. Both listings share `total`.
#[derive(Debug)]
pub struct WorkEntryStore {
    store: EntityStore<WorkEntry>,
    my_entries: Slot<Vec<WorkEntry>>,
    statistics: Slot<Option<WorkEntryStatistics>>,
}

impl Deref for WorkEntryStore {
    type Target = EntityStore<WorkEntry>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl WorkEntryStore {
    pub fn new(api: ApiClient, page_size: u32) -> Self {
        Self {
            store: EntityStore::new(api, page_size),
            my_entries: Slot::default(),
            statistics: Slot::default(),
        }
    }

    pub fn store(&self) -> &EntityStore<WorkEntry> {
        &self.store
    }

    pub fn my_entries(&self) -> Vec<WorkEntry> {
        self.my_entries.get()
    }

    pub fn subscribe_my_entries(&self) -> watch::Receiver<Vec<WorkEntry>> {
        self.my_entries.subscribe()
    }

    pub fn my_entries_changes(&self) -> impl Stream<Item = Vec<WorkEntry>> + Send + 'static {
        self.my_entries.changes()
    }

    pub fn statistics(&self) -> Option<WorkEntryStatistics> {
        self.statistics.get()
    }

    pub fn subscribe_statistics(&self) -> watch::Receiver<Option<WorkEntryStatistics>> {
        self.statistics.subscribe()
    }

    // === Own entries ===

    /// Signed-in user's entries for the current page
    pub async fn get_my_entries(
        &self,
        filter: Option<&WorkEntryFilter>,
    ) -> ClientResult<Vec<WorkEntry>> {
        self.store
            .tracked("get_my_entries", async {
                let params = self.store.listing_params(filter)?;
                let request = ApiRequest::get(self.store.path("me")).query(params);
                let page = self.api().paginated::<WorkEntry>(request).await?;

                self.my_entries.set(page.data.clone());
                self.store.set_total(page.total);
                Ok(page.data)
            })
            .await
    }

    pub async fn create_my_entry(&self, payload: &WorkEntryCreate) -> ClientResult<WorkEntry> {
        self.store
            .tracked("create_my_entry", async {
                payload.validate()?;
                let request = ApiRequest::post(self.store.base_path()).json(payload)?;
                let entry: WorkEntry = self.api().single(request).await?;

                self.my_entries.modify(|entries| entries.insert(0, entry.clone()));
                self.store.set_current_item(Some(entry.clone()));
                Ok(entry)
            })
            .await
    }

    pub async fn update_my_entry(
        &self,
        id: Uuid,
        payload: &WorkEntryUpdate,
    ) -> ClientResult<WorkEntry> {
        self.store
            .tracked("update_my_entry", async {
                payload.validate()?;
                let request = ApiRequest::put(self.store.path(id)).json(payload)?;
                let entry: WorkEntry = self.api().single(request).await?;

                self.my_entries
                    .modify(|entries| replace_by_id(entries, id, &entry));
                self.store.set_current_item(Some(entry.clone()));
                Ok(entry)
            })
            .await
    }

    pub async fn delete_my_entry(&self, id: Uuid) -> ClientResult<()> {
        self.store
            .tracked("delete_my_entry", async {
                self.api().send(ApiRequest::delete(self.store.path(id))).await?;

                self.my_entries.modify(|entries| entries.retain(|e| e.id != id));
                if self.current_item().is_some_and(|e| e.id == id) {
                    self.store.clear_current_item();
                }
                Ok(())
            })
            .await
    }

    /// Move a draft into the approval queue
    pub async fn submit_for_approval(&self, id: Uuid) -> ClientResult<WorkEntry> {
        let patch = WorkEntryPatch {
            status: Some(WorkEntryStatus::Pending),
            ..Default::default()
        };
        self.store.patch(id, &patch).await
    }

    // === Admin ===

    /// Every user's entries (admin only); updates `items` and `total`
    pub async fn get_all_entries(
        &self,
        filter: Option<&WorkEntryFilter>,
    ) -> ClientResult<Vec<WorkEntry>> {
        self.store
            .tracked("get_all_entries", async {
                let params = self.store.listing_params(filter)?;
                let request = ApiRequest::get(ADMIN_PATH).query(params);
                let page = self.api().paginated::<WorkEntry>(request).await?;

                self.store.set_listing(page.data.clone(), page.total);
                Ok(page.data)
            })
            .await
    }

    pub async fn approve_entry(
        &self,
        id: Uuid,
        payload: &WorkEntryApproval,
    ) -> ClientResult<WorkEntry> {
        self.store
            .tracked("approve_entry", async {
                let request =
                    ApiRequest::patch(format!("{ADMIN_PATH}/{id}/approve")).json(payload)?;
                let entry: WorkEntry = self.api().single(request).await?;
                self.store.replace_item(id, &entry);
                Ok(entry)
            })
            .await
    }

    pub async fn reject_entry(
        &self,
        id: Uuid,
        payload: &WorkEntryRejection,
    ) -> ClientResult<WorkEntry> {
        self.store
            .tracked("reject_entry", async {
                payload.validate()?;
                let request = ApiRequest::patch(format!("{ADMIN_PATH}/{id}/reject")).json(payload)?;
                let entry: WorkEntry = self.api().single(request).await?;
                self.store.replace_item(id, &entry);
                Ok(entry)
            })
            .await
    }

    pub async fn bulk_approve(
        &self,
        payload: &WorkEntryBulkAction,
    ) -> ClientResult<Vec<WorkEntry>> {
        self.bulk_action("bulk_approve", "bulk-approve", payload).await
    }

    pub async fn bulk_reject(
        &self,
        payload: &WorkEntryBulkAction,
    ) -> ClientResult<Vec<WorkEntry>> {
        self.bulk_action("bulk_reject", "bulk-reject", payload).await
    }

    async fn bulk_action(
        &self,
        operation: &'static str,
        action: &str,
        payload: &WorkEntryBulkAction,
    ) -> ClientResult<Vec<WorkEntry>> {
        self.store
            .tracked(operation, async {
                payload.validate()?;
                let request = ApiRequest::patch(format!("{ADMIN_PATH}/{action}")).json(payload)?;
                let entries: Vec<WorkEntry> = self.api().single(request).await?;
                self.store.replace_items(&entries);
                Ok(entries)
            })
            .await
    }

    /// Edit any entry, status included (admin only)
    pub async fn admin_update(
        &self,
        id: Uuid,
        payload: &WorkEntryAdminUpdate,
    ) -> ClientResult<WorkEntry> {
        self.store
            .tracked("admin_update", async {
                payload.validate()?;
                let request = ApiRequest::put(format!("{ADMIN_PATH}/{id}")).json(payload)?;
                let entry: WorkEntry = self.api().single(request).await?;
                self.store.replace_item(id, &entry);
                self.store.set_current_item(Some(entry.clone()));
                Ok(entry)
            })
            .await
    }

    pub async fn get_statistics(
        &self,
        filter: Option<&WorkEntryFilter>,
    ) -> ClientResult<WorkEntryStatistics> {
        self.store
            .tracked("get_statistics", async {
                let mut params = QueryParams::new();
                if let Some(filter) = filter {
                    params.merge(filter)?;
                }
                let request = ApiRequest::get(format!("{ADMIN_PATH}/statistics")).query(params);
                let statistics: WorkEntryStatistics = self.api().single(request).await?;
                self.statistics.set(Some(statistics.clone()));
                Ok(statistics)
            })
            .await
    }

    /// Download a spreadsheet or document export
    pub async fn export_entries(&self, options: &WorkEntryExportOptions) -> ClientResult<Blob> {
        self.store
            .tracked("export_entries", async {
                let mut params = QueryParams::new();
                params.merge(options)?;
                let request = ApiRequest::get(format!("{ADMIN_PATH}/export")).query(params);
                self.api().blob(request).await
            })
            .await
    }

    pub async fn get_entries_by_status(
        &self,
        status: WorkEntryStatus,
    ) -> ClientResult<Vec<WorkEntry>> {
        self.get_all_entries(Some(&WorkEntryFilter::with_status(status)))
            .await
    }

    pub async fn get_pending_entries(&self) -> ClientResult<Vec<WorkEntry>> {
        self.get_entries_by_status(WorkEntryStatus::Pending).await
    }

    // === Convenience ===

    /// Create an own entry from clock times; `break_minutes` defaults to 30
    ///
    /// Malformed clock times are rejected by payload validation, under the
    /// same loading/error handling as [`create_my_entry`](Self::create_my_entry).
    pub async fn create_quick_entry(
        &self,
        date: NaiveDate,
        start_time: &str,
        end_time: &str,
        break_minutes: Option<u32>,
    ) -> ClientResult<WorkEntry> {
        let break_minutes = break_minutes.unwrap_or(DEFAULT_BREAK_MINUTES);
        tracing::debug!(%date, start_time, end_time, break_minutes, "creating quick work entry");

        let payload = WorkEntryCreate {
            date,
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
            break_minutes: Some(break_minutes),
            notes: None,
        };
        self.create_my_entry(&payload).await
    }

    pub async fn get_today_entries(&self, today: NaiveDate) -> ClientResult<Vec<WorkEntry>> {
        self.get_my_entries(Some(&WorkEntryFilter::between(today, today)))
            .await
    }

    /// Own entries from Monday to Sunday of the week containing `today`
    pub async fn get_this_week_entries(&self, today: NaiveDate) -> ClientResult<Vec<WorkEntry>> {
        let (monday, sunday) = calendar::week_bounds(today);
        self.get_my_entries(Some(&WorkEntryFilter::between(monday, sunday)))
            .await
    }

    pub async fn get_this_month_entries(&self, today: NaiveDate) -> ClientResult<Vec<WorkEntry>> {
        let (first, last) = calendar::month_bounds(today);
        self.get_my_entries(Some(&WorkEntryFilter::between(first, last)))
            .await
    }

    pub fn clear_my_entries(&self) {
        self.my_entries.set(Vec::new());
    }

    pub fn clear_statistics(&self) {
        self.statistics.set(None);
    }

    pub fn calculate_duration(
        &self,
        start_time: &str,
        end_time: &str,
        break_minutes: u32,
    ) -> ClientResult<u32> {
        calendar::calculate_duration(start_time, end_time, break_minutes)
    }

    pub fn format_duration(&self, minutes: u32) -> String {
        calendar::format_duration(minutes)
    }
}

//! Vacation request store: own requests, balances and admin planning tools

use crate::core::api::{ApiClient, Blob};
use crate::core::calendar::{self, DateRangeError};
use crate::core::error::ClientResult;
use crate::core::query::QueryParams;
use crate::core::transport::{ApiRequest, multipart_parts};
use crate::entities::{
    VacationBalance, VacationCalendarEvent, VacationConflict, VacationExportOptions,
    VacationRequest, VacationRequestApproval, VacationRequestCreate, VacationRequestFilter,
    VacationRequestRejection, VacationRequestUpdate, VacationStatistics, VacationStatus,
    VacationType,
};
use crate::entities::vacation_request::cancellation_body;
use crate::store::{EntityStore, Slot, replace_by_id};
use chrono::NaiveDate;
use std::ops::Deref;
use tokio::sync::watch;
use uuid::Uuid;
use validator::Validate;

const ADMIN_PATH: &str = "/api/admin/vacation-requests";
const ATTACHMENTS_FIELD: &str = "attachments";

/// Vacation requests store
///
/// `items` holds the admin listing and `my_requests` the signed-in user's own
/// requests. Planning data (balance, calendar, conflicts, statistics) each
/// get their own slot.
#[derive(Debug)]
pub struct VacationRequestStore {
    store: EntityStore<VacationRequest>,
    my_requests: Slot<Vec<VacationRequest>>,
    statistics: Slot<Option<VacationStatistics>>,
    balance: Slot<Option<VacationBalance>>,
    calendar_events: Slot<Vec<VacationCalendarEvent>>,
    conflicts: Slot<Vec<VacationConflict>>,
}

impl Deref for VacationRequestStore {
    type Target = EntityStore<VacationRequest>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl VacationRequestStore {
    pub fn new(api: ApiClient, page_size: u32) -> Self {
        Self {
            store: EntityStore::new(api, page_size),
            my_requests: Slot::default(),
            statistics: Slot::default(),
            balance: Slot::default(),
            calendar_events: Slot::default(),
            conflicts: Slot::default(),
        }
    }

    pub fn store(&self) -> &EntityStore<VacationRequest> {
        &self.store
    }

    pub fn my_requests(&self) -> Vec<VacationRequest> {
        self.my_requests.get()
    }

    pub fn subscribe_my_requests(&self) -> watch::Receiver<Vec<VacationRequest>> {
        self.my_requests.subscribe()
    }

    pub fn statistics(&self) -> Option<VacationStatistics> {
        self.statistics.get()
    }

    pub fn balance(&self) -> Option<VacationBalance> {
        self.balance.get()
    }

    pub fn subscribe_balance(&self) -> watch::Receiver<Option<VacationBalance>> {
        self.balance.subscribe()
    }

    pub fn calendar_events(&self) -> Vec<VacationCalendarEvent> {
        self.calendar_events.get()
    }

    pub fn conflicts(&self) -> Vec<VacationConflict> {
        self.conflicts.get()
    }

    pub fn has_conflicts(&self) -> bool {
        self.conflicts.with(|c| !c.is_empty())
    }

    // === Own requests ===

    pub async fn get_my_requests(
        &self,
        filter: Option<&VacationRequestFilter>,
    ) -> ClientResult<Vec<VacationRequest>> {
        self.store
            .tracked("get_my_requests", async {
                let params = self.store.listing_params(filter)?;
                let request = ApiRequest::get(self.store.path("me")).query(params);
                let page = self.api().paginated::<VacationRequest>(request).await?;

                self.my_requests.set(page.data.clone());
                self.store.set_total(page.total);
                Ok(page.data)
            })
            .await
    }

    /// Submit a new request with its attachments
    pub async fn create_my_request(
        &self,
        payload: &VacationRequestCreate,
    ) -> ClientResult<VacationRequest> {
        self.store
            .tracked("create_my_request", async {
                payload.validate()?;
                let parts = multipart_parts(payload, ATTACHMENTS_FIELD, &payload.attachments)?;
                let request = ApiRequest::post(self.store.base_path()).multipart(parts);
                let created: VacationRequest = self.api().single(request).await?;

                self.my_requests
                    .modify(|requests| requests.insert(0, created.clone()));
                self.store.set_current_item(Some(created.clone()));
                Ok(created)
            })
            .await
    }

    pub async fn update_my_request(
        &self,
        id: Uuid,
        payload: &VacationRequestUpdate,
    ) -> ClientResult<VacationRequest> {
        self.store
            .tracked("update_my_request", async {
                payload.validate()?;
                let parts = multipart_parts(payload, ATTACHMENTS_FIELD, &payload.attachments)?;
                let request = ApiRequest::put(self.store.path(id)).multipart(parts);
                let updated: VacationRequest = self.api().single(request).await?;

                self.my_requests
                    .modify(|requests| replace_by_id(requests, id, &updated));
                self.store.set_current_item(Some(updated.clone()));
                Ok(updated)
            })
            .await
    }

    pub async fn cancel_my_request(&self, id: Uuid, reason: &str) -> ClientResult<VacationRequest> {
        self.store
            .tracked("cancel_my_request", async {
                let body = cancellation_body(reason)?;
                let request =
                    ApiRequest::patch(self.store.path(format!("{id}/cancel"))).json(&body)?;
                let cancelled: VacationRequest = self.api().single(request).await?;

                self.my_requests
                    .modify(|requests| replace_by_id(requests, id, &cancelled));
                Ok(cancelled)
            })
            .await
    }

    /// Allowance for `year`, or the current year when omitted
    pub async fn get_my_balance(&self, year: Option<i32>) -> ClientResult<VacationBalance> {
        self.store
            .tracked("get_my_balance", async {
                let mut params = QueryParams::new();
                if let Some(year) = year {
                    params.insert("year", year);
                }
                let request = ApiRequest::get(self.store.path("me/balance")).query(params);
                let balance: VacationBalance = self.api().single(request).await?;
                self.balance.set(Some(balance.clone()));
                Ok(balance)
            })
            .await
    }

    // === Admin ===

    pub async fn get_all_requests(
        &self,
        filter: Option<&VacationRequestFilter>,
    ) -> ClientResult<Vec<VacationRequest>> {
        self.store
            .tracked("get_all_requests", async {
                let params = self.store.listing_params(filter)?;
                let request = ApiRequest::get(ADMIN_PATH).query(params);
                let page = self.api().paginated::<VacationRequest>(request).await?;

                self.store.set_listing(page.data.clone(), page.total);
                Ok(page.data)
            })
            .await
    }

    pub async fn approve_request(
        &self,
        id: Uuid,
        payload: &VacationRequestApproval,
    ) -> ClientResult<VacationRequest> {
        self.store
            .tracked("approve_request", async {
                let request =
                    ApiRequest::patch(format!("{ADMIN_PATH}/{id}/approve")).json(payload)?;
                let approved: VacationRequest = self.api().single(request).await?;
                self.store.replace_item(id, &approved);
                Ok(approved)
            })
            .await
    }

    pub async fn reject_request(
        &self,
        id: Uuid,
        payload: &VacationRequestRejection,
    ) -> ClientResult<VacationRequest> {
        self.store
            .tracked("reject_request", async {
                payload.validate()?;
                let request = ApiRequest::patch(format!("{ADMIN_PATH}/{id}/reject")).json(payload)?;
                let rejected: VacationRequest = self.api().single(request).await?;
                self.store.replace_item(id, &rejected);
                Ok(rejected)
            })
            .await
    }

    pub async fn get_statistics(
        &self,
        filter: Option<&VacationRequestFilter>,
    ) -> ClientResult<VacationStatistics> {
        self.store
            .tracked("get_statistics", async {
                let mut params = QueryParams::new();
                if let Some(filter) = filter {
                    params.merge(filter)?;
                }
                let request = ApiRequest::get(format!("{ADMIN_PATH}/statistics")).query(params);
                let statistics: VacationStatistics = self.api().single(request).await?;
                self.statistics.set(Some(statistics.clone()));
                Ok(statistics)
            })
            .await
    }

    /// Approved and pending absences overlapping `start_date..=end_date`
    pub async fn get_calendar_events(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> ClientResult<Vec<VacationCalendarEvent>> {
        self.store
            .tracked("get_calendar_events", async {
                let params = QueryParams::new()
                    .with("startDate", start_date.to_string())
                    .with("endDate", end_date.to_string());
                let request = ApiRequest::get(format!("{ADMIN_PATH}/calendar")).query(params);
                let events: Vec<VacationCalendarEvent> = self.api().single(request).await?;
                self.calendar_events.set(events.clone());
                Ok(events)
            })
            .await
    }

    /// Conflicts a range would cause, ignoring `exclude_request_id` itself
    pub async fn check_conflicts(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        exclude_request_id: Option<Uuid>,
    ) -> ClientResult<Vec<VacationConflict>> {
        self.store
            .tracked("check_conflicts", async {
                let mut params = QueryParams::new()
                    .with("startDate", start_date.to_string())
                    .with("endDate", end_date.to_string());
                if let Some(exclude) = exclude_request_id {
                    params.insert("excludeRequestId", exclude.to_string());
                }
                let request = ApiRequest::get(format!("{ADMIN_PATH}/conflicts")).query(params);
                let conflicts: Vec<VacationConflict> = self.api().single(request).await?;
                self.conflicts.set(conflicts.clone());
                Ok(conflicts)
            })
            .await
    }

    pub async fn export_requests(&self, options: &VacationExportOptions) -> ClientResult<Blob> {
        self.store
            .tracked("export_requests", async {
                let mut params = QueryParams::new();
                params.merge(options)?;
                let request = ApiRequest::get(format!("{ADMIN_PATH}/export")).query(params);
                self.api().blob(request).await
            })
            .await
    }

    pub async fn get_requests_by_status(
        &self,
        status: VacationStatus,
    ) -> ClientResult<Vec<VacationRequest>> {
        let filter = VacationRequestFilter {
            status: Some(status),
            ..Default::default()
        };
        self.get_all_requests(Some(&filter)).await
    }

    pub async fn get_requests_by_type(
        &self,
        kind: VacationType,
    ) -> ClientResult<Vec<VacationRequest>> {
        let filter = VacationRequestFilter {
            kind: Some(kind),
            ..Default::default()
        };
        self.get_all_requests(Some(&filter)).await
    }

    pub async fn get_pending_requests(&self) -> ClientResult<Vec<VacationRequest>> {
        self.get_requests_by_status(VacationStatus::Pending).await
    }

    /// Approved requests covering `today`
    pub async fn get_current_vacations(
        &self,
        today: NaiveDate,
    ) -> ClientResult<Vec<VacationRequest>> {
        let filter = VacationRequestFilter {
            status: Some(VacationStatus::Approved),
            date_from: Some(today),
            date_to: Some(today),
            ..Default::default()
        };
        self.get_all_requests(Some(&filter)).await
    }

    // === Helpers ===

    pub fn calculate_working_days(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        calendar::working_days(start, end)
    }

    pub fn validate_dates(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<(), DateRangeError> {
        calendar::validate_vacation_dates(start, end, today)
    }

    pub fn clear_my_requests(&self) {
        self.my_requests.set(Vec::new());
    }

    pub fn clear_statistics(&self) {
        self.statistics.set(None);
    }

    pub fn clear_balance(&self) {
        self.balance.set(None);
    }

    pub fn clear_calendar_events(&self) {
        self.calendar_events.set(Vec::new());
    }

    pub fn clear_conflicts(&self) {
        self.conflicts.set(Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::{FileUpload, FormValue, RequestBody};
    use crate::test_support::ScriptedTransport;
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn request_json(id: Uuid, status: &str) -> Value {
        json!({
            "id": id,
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-01T10:00:00Z",
            "userId": "9d7b2c44-1f0a-4a43-8f55-2e6a8b7c9d10",
            "type": "annual",
            "startDate": "2024-07-01",
            "endDate": "2024-07-12",
            "dayCount": 10,
            "status": status
        })
    }

    fn single(value: Value) -> Value {
        json!({"data": value, "success": true})
    }

    fn store() -> (Arc<ScriptedTransport>, VacationRequestStore) {
        let transport = ScriptedTransport::new();
        let store = VacationRequestStore::new(ApiClient::new(transport.clone()), 10);
        (transport, store)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_create_sends_multipart_with_indexed_files() {
        let (transport, vacations) = store();
        let id = Uuid::new_v4();
        transport.respond_json(201, single(request_json(id, "pending")));

        let mut payload =
            VacationRequestCreate::new(VacationType::Annual, date(2024, 7, 1), date(2024, 7, 12));
        payload.reason = Some("Summer".to_string());
        payload.attachments = vec![
            FileUpload::new("booking.pdf", b"%PDF".to_vec()),
            FileUpload::new("itinerary.pdf", b"%PDF".to_vec()),
        ];
        vacations.create_my_request(&payload).await.unwrap();

        let RequestBody::Multipart(parts) = transport.last_request().body else {
            panic!("expected multipart body");
        };
        let text = |name: &str| {
            parts
                .iter()
                .find(|p| p.name == name)
                .map(|p| p.value.clone())
        };
        assert_eq!(text("type"), Some(FormValue::Text("annual".to_string())));
        assert_eq!(text("startDate"), Some(FormValue::Text("2024-07-01".to_string())));
        assert_eq!(text("reason"), Some(FormValue::Text("Summer".to_string())));
        assert!(text("emergencyContact").is_none());
        assert!(matches!(text("attachments[1]"), Some(FormValue::File(_))));

        assert_eq!(vacations.my_requests()[0].id, id);
        assert_eq!(vacations.current_item().map(|r| r.id), Some(id));
    }

    #[tokio::test]
    async fn test_cancel_replaces_in_my_requests() {
        let (transport, vacations) = store();
        let id = Uuid::new_v4();
        transport.respond_json(
            200,
            json!({"data": [request_json(id, "pending")], "total": 1, "page": 1, "pageSize": 10}),
        );
        vacations.get_my_requests(None).await.unwrap();

        transport.respond_json(200, single(request_json(id, "cancelled")));
        vacations.cancel_my_request(id, "Plans changed").await.unwrap();

        let request = transport.last_request();
        assert_eq!(request.path, format!("/api/vacation-requests/{id}/cancel"));
        assert_eq!(
            request.body,
            RequestBody::Json(json!({"cancellationReason": "Plans changed"}))
        );
        assert_eq!(vacations.my_requests()[0].status, VacationStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_balance_year_is_optional() {
        let (transport, vacations) = store();
        let balance = json!({
            "userId": "9d7b2c44-1f0a-4a43-8f55-2e6a8b7c9d10",
            "year": 2024,
            "totalDays": 25,
            "usedDays": 10,
            "pendingDays": 2,
            "remainingDays": 13,
            "carryOverDays": 3
        });
        transport.respond_json(200, single(balance.clone()));
        transport.respond_json(200, single(balance));

        vacations.get_my_balance(None).await.unwrap();
        assert!(transport.last_request().query.is_empty());

        vacations.get_my_balance(Some(2024)).await.unwrap();
        let request = transport.last_request();
        assert_eq!(request.path, "/api/vacation-requests/me/balance");
        assert_eq!(request.query.get("year"), Some(&json!(2024)));
        assert_eq!(vacations.balance().map(|b| b.remaining_days), Some(13.0));
    }

    #[tokio::test]
    async fn test_conflict_check_excludes_request() {
        let (transport, vacations) = store();
        let exclude = Uuid::new_v4();
        transport.respond_json(200, single(json!([])));

        vacations
            .check_conflicts(date(2024, 7, 1), date(2024, 7, 12), Some(exclude))
            .await
            .unwrap();

        let request = transport.last_request();
        assert_eq!(request.path, "/api/admin/vacation-requests/conflicts");
        assert_eq!(
            request.query.to_pairs(),
            vec![
                ("startDate".to_string(), "2024-07-01".to_string()),
                ("endDate".to_string(), "2024-07-12".to_string()),
                ("excludeRequestId".to_string(), exclude.to_string()),
            ]
        );
        assert!(!vacations.has_conflicts());
    }

    #[tokio::test]
    async fn test_current_vacations_filter() {
        let (transport, vacations) = store();
        transport.respond_json(
            200,
            json!({
                "data": [request_json(Uuid::new_v4(), "approved")],
                "total": 1,
                "page": 1,
                "pageSize": 10
            }),
        );

        vacations.get_current_vacations(date(2024, 7, 3)).await.unwrap();

        let query = transport.last_request().query;
        assert_eq!(query.get("status"), Some(&json!("approved")));
        assert_eq!(query.get("dateFrom"), Some(&json!("2024-07-03")));
        assert_eq!(query.get("dateTo"), Some(&json!("2024-07-03")));
        assert_eq!(vacations.items().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_approval_keeps_items() {
        let (transport, vacations) = store();
        let id = Uuid::new_v4();
        transport.respond_json(
            200,
            json!({"data": [request_json(id, "pending")], "total": 1, "page": 1, "pageSize": 10}),
        );
        vacations.get_pending_requests().await.unwrap();

        transport.respond_json(409, json!({"message": "Request overlaps an approved absence"}));
        let err = vacations
            .approve_request(
                id,
                &VacationRequestApproval {
                    approved_by: Uuid::new_v4(),
                    notes: None,
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(409));
        assert_eq!(vacations.items()[0].status, VacationStatus::Pending);
        assert_eq!(
            vacations.error().as_deref(),
            Some("Request overlaps an approved absence")
        );
    }

    #[test]
    fn test_date_helpers() {
        let (_, vacations) = store();
        assert_eq!(vacations.calculate_working_days(date(2024, 1, 1), date(2024, 1, 7)), 5);
        assert_eq!(
            vacations.validate_dates(date(2024, 1, 5), date(2024, 1, 5), date(2024, 1, 1)),
            Err(DateRangeError::SameDay)
        );
    }
}

//! Vacation requests, balances, calendar events and conflicts

use super::{ExportFormat, SortOrder};
use crate::core::transport::FileUpload;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VacationType {
    Annual,
    Sick,
    Personal,
    Training,
    Maternity,
    Paternity,
    Other,
}

wire_enum!(VacationType {
    Annual => "annual",
    Sick => "sick",
    Personal => "personal",
    Training => "training",
    Maternity => "maternity",
    Paternity => "paternity",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VacationStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

wire_enum!(VacationStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VacationRequest {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: VacationType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub day_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub status: VacationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    /// Stored file paths or URLs
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_phone: Option<String>,
}

impl_resource!(
    VacationRequest,
    "VacationRequest",
    "/api/vacation-requests",
    create: VacationRequestCreate,
    update: VacationRequestUpdate,
    patch: VacationRequestPatch,
    filter: VacationRequestFilter,
);

/// New request; sent as multipart so files can travel with it
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VacationRequestCreate {
    #[serde(rename = "type")]
    pub kind: VacationType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_phone: Option<String>,
    /// Sent as `attachments[i]` file parts
    #[serde(skip)]
    pub attachments: Vec<FileUpload>,
}

impl VacationRequestCreate {
    pub fn new(kind: VacationType, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            kind,
            start_date,
            end_date,
            reason: None,
            emergency_contact: None,
            emergency_phone: None,
            attachments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VacationRequestUpdate {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<VacationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_phone: Option<String>,
    #[serde(skip)]
    pub attachments: Vec<FileUpload>,
}

/// Partial edit; unlike [`VacationRequestUpdate`] it can also move the status
#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VacationRequestPatch {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<VacationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VacationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VacationRequestApproval {
    pub approved_by: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VacationRequestRejection {
    pub rejected_by: Uuid,
    #[validate(length(min = 1))]
    pub rejection_reason: String,
}

#[derive(Debug, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
struct Cancellation {
    #[validate(length(min = 1))]
    cancellation_reason: String,
}

/// Body of `PATCH {base}/{id}/cancel`
pub(crate) fn cancellation_body(
    reason: &str,
) -> crate::core::error::ClientResult<serde_json::Value> {
    let body = Cancellation {
        cancellation_reason: reason.to_string(),
    };
    body.validate()?;
    Ok(serde_json::to_value(body)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VacationSortBy {
    StartDate,
    CreatedAt,
    Status,
    Type,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VacationRequestFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<VacationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VacationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<VacationSortBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VacationBalance {
    pub user_id: Uuid,
    pub year: i32,
    pub total_days: f64,
    pub used_days: f64,
    pub pending_days: f64,
    pub remaining_days: f64,
    pub carry_over_days: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    Overlap,
    SamePeriod,
    TeamCapacity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VacationConflict {
    pub request_id: Uuid,
    pub conflicting_request_ids: Vec<Uuid>,
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
    pub description: String,
    pub affected_users: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VacationCalendarEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    #[serde(rename = "type")]
    pub kind: VacationType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: VacationStatus,
    pub title: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VacationStatistics {
    pub total_requests: u64,
    pub pending_requests: u64,
    pub approved_requests: u64,
    pub rejected_requests: u64,
    pub currently_on_vacation: u64,
    pub upcoming_vacations: u64,
    pub average_vacation_days: f64,
    pub conflict_count: u64,
    pub most_popular_type: VacationType,
}

/// Query for `GET /api/admin/vacation-requests/export`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VacationExportOptions {
    pub format: ExportFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<VacationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VacationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_approval_info: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_attachments: Option<bool>,
}

impl VacationExportOptions {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            date_from: None,
            date_to: None,
            user_id: None,
            kind: None,
            status: None,
            include_approval_info: None,
            include_attachments: None,
        }
    }
}

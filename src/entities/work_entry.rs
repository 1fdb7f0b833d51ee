//! Work time entries and their approval workflow

use super::{ExportFormat, SortOrder, clock_time};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Break applied by quick entries when none is given
pub const DEFAULT_BREAK_MINUTES: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkEntryStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

wire_enum!(WorkEntryStatus {
    Draft => "draft",
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkEntry {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub date: NaiveDate,
    /// `HH:MM`
    pub start_time: String,
    /// `HH:MM`
    pub end_time: String,
    #[serde(default)]
    pub break_minutes: u32,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: WorkEntryStatus,
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
}

impl_resource!(
    WorkEntry,
    "WorkEntry",
    "/api/work-entries",
    create: WorkEntryCreate,
    update: WorkEntryUpdate,
    patch: WorkEntryPatch,
    filter: WorkEntryFilter,
);

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WorkEntryCreate {
    pub date: NaiveDate,
    #[validate(custom(function = "clock_time"))]
    pub start_time: String,
    #[validate(custom(function = "clock_time"))]
    pub end_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Changes to an employee's own entry
#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WorkEntryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "clock_time"))]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "clock_time"))]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Partial edit; unlike [`WorkEntryUpdate`] it can also move the status
#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WorkEntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "clock_time"))]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "clock_time"))]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkEntryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// Admin edit of any entry
#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WorkEntryAdminUpdate {
    #[serde(flatten)]
    #[validate(nested)]
    pub entry: WorkEntryUpdate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkEntryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WorkEntryApproval {
    pub approved_by: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WorkEntryRejection {
    pub rejected_by: Uuid,
    #[validate(length(min = 1))]
    pub rejection_reason: String,
}

/// Approve or reject several entries at once
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WorkEntryBulkAction {
    #[validate(length(min = 1))]
    pub entry_ids: Vec<Uuid>,
    pub action_by: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Bulk rejection only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkEntrySortBy {
    Date,
    CreatedAt,
    Status,
    Duration,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkEntryFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkEntryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<WorkEntrySortBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
}

impl WorkEntryFilter {
    /// Entries dated within `from..=to`
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            date_from: Some(from),
            date_to: Some(to),
            ..Default::default()
        }
    }

    pub fn with_status(status: WorkEntryStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkEntryStatistics {
    pub total_entries: u64,
    pub pending_entries: u64,
    pub approved_entries: u64,
    pub rejected_entries: u64,
    pub total_hours: f64,
    pub average_hours_per_day: f64,
    pub average_hours_per_week: f64,
    pub current_week_hours: f64,
    pub current_month_hours: f64,
}

/// Formats the work entry export endpoint produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkEntryExportFormat {
    Xlsx,
    Csv,
    Pdf,
}

wire_enum!(WorkEntryExportFormat {
    Xlsx => "xlsx",
    Csv => "csv",
    Pdf => "pdf",
});

impl From<WorkEntryExportFormat> for ExportFormat {
    fn from(format: WorkEntryExportFormat) -> Self {
        match format {
            WorkEntryExportFormat::Xlsx => ExportFormat::Xlsx,
            WorkEntryExportFormat::Csv => ExportFormat::Csv,
            WorkEntryExportFormat::Pdf => ExportFormat::Pdf,
        }
    }
}

impl TryFrom<ExportFormat> for WorkEntryExportFormat {
    type Error = ExportFormat;

    fn try_from(format: ExportFormat) -> Result<Self, Self::Error> {
        match format {
            ExportFormat::Xlsx => Ok(Self::Xlsx),
            ExportFormat::Csv => Ok(Self::Csv),
            ExportFormat::Pdf => Ok(Self::Pdf),
            other => Err(other),
        }
    }
}

/// Query for `GET /api/admin/work-entries/export`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkEntryExportOptions {
    pub format: WorkEntryExportFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkEntryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_notes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_approval_info: Option<bool>,
}

impl WorkEntryExportOptions {
    pub fn new(format: WorkEntryExportFormat) -> Self {
        Self {
            format,
            date_from: None,
            date_to: None,
            user_id: None,
            status: None,
            include_notes: None,
            include_approval_info: None,
        }
    }
}

//! Query parameters, response envelopes and pagination utilities

use crate::core::error::{ClientError, ClientResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered query parameters for a listing request
///
/// Keys keep their first insertion position; inserting an existing key
/// overwrites its value. This is what makes "pagination first, filter after"
/// merging let filter fields win on collision.
///
/// # Encoding
/// - strings and numbers: `key=value`
/// - booleans: `key=true` / `key=false`
/// - arrays: one `key[]=value` pair per element
/// - null: omitted
///
/// # Example
/// ```rust,ignore
/// let mut params = QueryParams::paged(1, 10);
/// params.merge(&WorkEntryFilter::with_status(WorkEntryStatus::Pending))?;
/// // GET /api/work-entries?page=1&pageSize=10&status=pending
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryParams(IndexMap<String, Value>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a listing query with the store's pagination counters
    pub fn paged(page: u32, page_size: u32) -> Self {
        let mut params = Self::new();
        params.insert("page", page);
        params.insert("pageSize", page_size);
        params
    }

    /// Insert or overwrite a parameter
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Merge the fields of a serializable filter, overwriting existing keys
    ///
    /// The filter must serialize to a JSON object (or `null`, which merges
    /// nothing). Null-valued fields are skipped so an unset option never
    /// clobbers a pagination value.
    pub fn merge<F: Serialize + ?Sized>(&mut self, filter: &F) -> ClientResult<()> {
        match serde_json::to_value(filter)? {
            Value::Null => Ok(()),
            Value::Object(fields) => {
                for (key, value) in fields {
                    if !value.is_null() {
                        self.0.insert(key, value);
                    }
                }
                Ok(())
            }
            other => Err(ClientError::InvalidInput(format!(
                "query filter must be an object, got {other}"
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flatten into `(key, value)` string pairs ready for URL encoding
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.0.len());
        for (key, value) in &self.0 {
            match value {
                Value::Null => {}
                Value::Array(values) => {
                    let array_key = format!("{key}[]");
                    pairs.extend(
                        values
                            .iter()
                            .filter_map(scalar_to_string)
                            .map(|v| (array_key.clone(), v)),
                    );
                }
                other => {
                    if let Some(v) = scalar_to_string(other) {
                        pairs.push((key.clone(), v));
                    }
                }
            }
        }
        pairs
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        nested => Some(nested.to_string()),
    }
}

/// Single-item response envelope: `{ data, success, message? }`
///
/// Failure envelopes usually omit `data` or send `null`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub data: Option<T>,

    /// Missing `success` is read as a success
    #[serde(default = "default_success")]
    pub success: bool,

    #[serde(default)]
    pub message: Option<String>,
}

fn default_success() -> bool {
    true
}

/// Paginated response envelope: `{ data, total, page, pageSize, totalPages? }`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    /// The page of data, in server order
    pub data: Vec<T>,

    /// Total number of items (after filters)
    pub total: u64,

    /// Current page number (starts at 1)
    pub page: u32,

    /// Number of items per page
    pub page_size: u32,

    /// Total number of pages, when the server reports it
    #[serde(default)]
    pub total_pages: Option<u64>,
}

/// Ceiling division of `total` by `page_size`
///
/// Zero items, or a zero page size, yields zero pages.
pub fn total_pages(total: u64, page_size: u32) -> u64 {
    if total == 0 || page_size == 0 {
        0
    } else {
        total.div_ceil(u64::from(page_size))
    }
}

//! In-process StaffDesk backend for integration tests
//!
//! Serves the subset of the REST API the client talks to, keeps its data in
//! memory and records every request it receives.

#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::Utc;
use serde_json::{Value, json};
use staffdesk::StaffDesk;
use staffdesk::config::ClientConfig;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const USER_ID: &str = "3f1c1bd4-6c57-4f0e-9a43-0f1a1c2d3e4f";
pub const EMAIL: &str = "lee@staffdesk.io";
pub const PASSWORD: &str = "secret";

/// One request as seen by the backend
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

/// Multipart field as received
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub file_name: Option<String>,
    pub content: String,
}

#[derive(Debug, Default)]
pub struct BackendState {
    pub requests: Vec<Recorded>,
    pub token: Option<String>,
    pub logins: u32,
    pub admin: bool,
    pub permissions: Vec<String>,
    pub entries: Vec<Value>,
    pub uploads: Vec<Upload>,
    pub reports: Vec<Value>,
}

type Shared = Arc<Mutex<BackendState>>;

pub struct FakeBackend {
    pub base_url: String,
    state: Shared,
}

impl FakeBackend {
    pub async fn spawn() -> Self {
        let state: Shared = Arc::default();
        let app = router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url.clone())
    }

    pub fn client(&self) -> StaffDesk {
        StaffDesk::new(self.config()).unwrap()
    }

    /// Client already signed in as the test user
    pub async fn signed_in_client(&self) -> StaffDesk {
        let desk = self.client();
        desk.auth
            .login(&staffdesk::auth::Credentials::new(EMAIL, PASSWORD))
            .await
            .unwrap();
        desk
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut BackendState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.with_state(|s| s.requests.clone())
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Seed a draft entry and return its id
    pub fn seed_entry(&self, date: &str, start: &str, end: &str) -> Uuid {
        let id = Uuid::new_v4();
        let entry = entry_json(id, date, start, end, 30);
        self.with_state(|s| s.entries.push(entry));
        id
    }

    /// Invalidate the issued token, as an expiry would
    pub fn expire_session(&self) {
        self.with_state(|s| s.token = None);
    }
}

fn entry_json(id: Uuid, date: &str, start: &str, end: &str, break_minutes: u64) -> Value {
    let now = Utc::now().to_rfc3339();
    json!({
        "id": id,
        "createdAt": now,
        "updatedAt": now,
        "userId": USER_ID,
        "date": date,
        "startTime": start,
        "endTime": end,
        "breakMinutes": break_minutes,
        "status": "draft"
    })
}

fn user_json(state: &BackendState) -> Value {
    let roles = if state.admin {
        vec!["admin", "employee"]
    } else {
        vec!["employee"]
    };
    json!({
        "id": USER_ID,
        "email": EMAIL,
        "fullName": "Lee Park",
        "roles": roles,
        "permissions": state.permissions
    })
}

fn router(state: Shared) -> Router {
    Router::new()
        // === Auth ===
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/verify-admin", get(verify_admin))
        .route("/api/auth/verify-permission", post(verify_permission))
        .route("/api/security/log-unauthorized-access", post(report_access))
        // === Work entries ===
        .route("/api/work-entries", get(list_entries).post(create_entry))
        .route("/api/work-entries/me", get(list_entries))
        .route("/api/work-entries/{id}", put(update_entry).delete(delete_entry))
        .route("/api/admin/work-entries/export", get(export_entries))
        // === Vacation requests ===
        .route("/api/vacation-requests", post(create_vacation_request))
        .route("/api/vacation-requests/me/balance", get(vacation_balance))
        // === Users ===
        .route("/api/users", get(list_users))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let recorded = Recorded {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query: request.uri().query().map(str::to_string),
        authorization: request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    state.lock().unwrap().requests.push(recorded);
    next.run(request).await
}

fn authorized(state: &BackendState, headers: &HeaderMap) -> bool {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    matches!((presented, &state.token), (Some(p), Some(t)) if p == t)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Token expired"})),
    )
        .into_response()
}

fn envelope(status: StatusCode, data: Value) -> Response {
    (status, Json(json!({"success": true, "data": data}))).into_response()
}

// === Auth handlers ===

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    if body["email"] != EMAIL || body["password"] != PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid credentials"})),
        )
            .into_response();
    }

    state.logins += 1;
    let token = format!("token-{}", state.logins);
    state.token = Some(token.clone());
    Json(json!({"user": user_json(&state), "token": token})).into_response()
}

async fn logout(State(state): State<Shared>) -> StatusCode {
    state.lock().unwrap().token = None;
    StatusCode::NO_CONTENT
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = state.lock().unwrap();
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    Json(user_json(&state)).into_response()
}

async fn verify_admin(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = state.lock().unwrap();
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    Json(json!({"isAdmin": state.admin})).into_response()
}

async fn verify_permission(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let state = state.lock().unwrap();
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let granted = body["permission"]
        .as_str()
        .is_some_and(|p| state.permissions.iter().any(|held| held == p));
    Json(json!({"hasPermission": granted})).into_response()
}

async fn report_access(State(state): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    state.lock().unwrap().reports.push(body);
    StatusCode::CREATED
}

// === Work entry handlers ===

fn page_of(items: Vec<Value>, query: &HashMap<String, String>) -> Value {
    let number = |key: &str, default: usize| {
        query
            .get(key)
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(default)
            .max(1)
    };
    let page = number("page", 1);
    let page_size = number("pageSize", 10);
    let total = items.len();
    let data: Vec<Value> = items
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    json!({
        "success": true,
        "data": data,
        "total": total,
        "page": page,
        "pageSize": page_size
    })
}

async fn list_entries(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let state = state.lock().unwrap();
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    let in_range = |entry: &&Value| {
        let date = entry["date"].as_str().unwrap_or_default();
        query.get("dateFrom").is_none_or(|from| date >= from.as_str())
            && query.get("dateTo").is_none_or(|to| date <= to.as_str())
    };
    let entries = state.entries.iter().filter(in_range).cloned().collect();
    Json(page_of(entries, &query)).into_response()
}

async fn create_entry(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    let entry = entry_json(
        Uuid::new_v4(),
        body["date"].as_str().unwrap_or_default(),
        body["startTime"].as_str().unwrap_or_default(),
        body["endTime"].as_str().unwrap_or_default(),
        body["breakMinutes"].as_u64().unwrap_or(0),
    );
    state.entries.insert(0, entry.clone());
    envelope(StatusCode::CREATED, entry)
}

async fn update_entry(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    let Some(entry) = state.entries.iter_mut().find(|e| e["id"] == id.as_str()) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"message": "Work entry not found"})),
        )
            .into_response();
    };
    if let (Some(target), Some(changes)) = (entry.as_object_mut(), body.as_object()) {
        for (key, value) in changes {
            target.insert(key.clone(), value.clone());
        }
        target.insert("updatedAt".to_string(), json!(Utc::now().to_rfc3339()));
    }
    envelope(StatusCode::OK, entry.clone())
}

async fn delete_entry(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut state = state.lock().unwrap();
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    let before = state.entries.len();
    state.entries.retain(|e| e["id"] != id.as_str());
    if state.entries.len() == before {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"message": "Work entry not found"})),
        )
            .into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn export_entries(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let state = state.lock().unwrap();
    let mut csv = String::from("date,startTime,endTime\n");
    for entry in &state.entries {
        csv.push_str(&format!(
            "{},{},{}\n",
            entry["date"].as_str().unwrap_or_default(),
            entry["startTime"].as_str().unwrap_or_default(),
            entry["endTime"].as_str().unwrap_or_default()
        ));
    }
    let content_type = match query.get("format").map(String::as_str) {
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    };
    ([(header::CONTENT_TYPE, content_type)], csv).into_response()
}

// === Vacation handlers ===

async fn create_vacation_request(
    State(state): State<Shared>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content = field.text().await.unwrap();
        uploads.push(Upload {
            name,
            file_name,
            content,
        });
    }

    let mut state = state.lock().unwrap();
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    let text = |name: &str| {
        uploads
            .iter()
            .find(|u| u.name == name)
            .map(|u| u.content.clone())
            .unwrap_or_default()
    };
    let attachments: Vec<String> = uploads
        .iter()
        .filter_map(|u| u.file_name.as_ref())
        .map(|f| format!("/uploads/{f}"))
        .collect();
    let now = Utc::now().to_rfc3339();
    let request = json!({
        "id": Uuid::new_v4(),
        "createdAt": now,
        "updatedAt": now,
        "userId": USER_ID,
        "type": text("type"),
        "startDate": text("startDate"),
        "endDate": text("endDate"),
        "reason": text("reason"),
        "status": "pending",
        "attachments": attachments
    });

    state.uploads.extend(uploads);
    envelope(StatusCode::CREATED, request)
}

async fn vacation_balance(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let state = state.lock().unwrap();
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    let year: i32 = query
        .get("year")
        .and_then(|y| y.parse().ok())
        .unwrap_or(2026);
    envelope(
        StatusCode::OK,
        json!({
            "userId": USER_ID,
            "year": year,
            "totalDays": 30.0,
            "usedDays": 12.5,
            "pendingDays": 2.0,
            "remainingDays": 15.5,
            "carryOverDays": 3.0
        }),
    )
}

// === User handlers ===

async fn list_users() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"error": "Database unavailable"})),
    )
        .into_response()
}

//! In-process stand-in for the productivity backend. Sessions are cookie based like the real
//! server: login hands out an access cookie and a refresh cookie, protected routes answer 401 once
//! the access cookie is stale, and the refresh route swaps in a new access cookie.

#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use productivity_client::remote::ApiClient;
use productivity_client::remote::ReqwestTransport;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use url::Url;

pub const USER_ID: i64 = 1;

#[derive(Default)]
pub struct BackendState {
    access_version: AtomicU32,
    refresh_revoked: AtomicBool,
    pub refresh_calls: AtomicUsize,
    pub unauthorized_responses: AtomicUsize,
    tasks: Mutex<Vec<Value>>,
}

impl BackendState {
    /// Makes every access cookie handed out so far stale
    pub fn expire_sessions(&self) {
        self.access_version.fetch_add(1, Ordering::SeqCst);
    }

    pub fn revoke_refresh(&self) {
        self.refresh_revoked.store(true, Ordering::SeqCst);
    }

    pub fn task_status(&self, id: i64) -> Option<String> {
        self.tasks
            .lock()
            .expect("task mutex poisoned")
            .iter()
            .find(|task| task["id"] == json!(id))
            .and_then(|task| task["status"].as_str().map(str::to_owned))
    }

    fn access_cookie(&self) -> String {
        format!(
            "access_token=v{}; Path=/; HttpOnly",
            self.access_version.load(Ordering::SeqCst)
        )
    }

    fn has_valid_access(&self, headers: &HeaderMap) -> bool {
        let expected = format!("access_token=v{}", self.access_version.load(Ordering::SeqCst));
        cookies(headers).any(|cookie| cookie == expected)
    }
}

fn cookies(headers: &HeaderMap) -> impl Iterator<Item = String> + '_ {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .map(|cookie| cookie.trim().to_owned())
}

pub fn task_json(id: i64, title: &str, status: &str) -> Value {
    json!({
        "id": id, "user_id": USER_ID, "title": title, "description": null,
        "status": status, "priority": "Medium",
        "start_date": null, "due_date": null, "notify_at": null,
        "created_at": "2025-06-01T08:00:00Z", "is_deleted": false
    })
}

fn envelope(data: Value) -> Json<Value> {
    Json(json!({"success": true, "data": data, "msg": "ok"}))
}

fn failure(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"success": false, "msg": message, "status": status.as_u16()})),
    )
        .into_response()
}

type Shared = State<Arc<BackendState>>;

fn unauthorized(state: &BackendState) -> Response {
    state.unauthorized_responses.fetch_add(1, Ordering::SeqCst);
    failure(StatusCode::UNAUTHORIZED, "Access token expired")
}

async fn login(State(state): Shared, Json(body): Json<Value>) -> Response {
    if body["password"] != json!("secret") {
        return failure(StatusCode::UNAUTHORIZED, "Invalid email or password");
    }

    (
        AppendHeaders([
            (header::SET_COOKIE, state.access_cookie()),
            (
                header::SET_COOKIE,
                "refresh_token=r1; Path=/; HttpOnly".to_owned(),
            ),
        ]),
        envelope(json!({"id": USER_ID, "name": "Alice", "email": body["email"]})),
    )
        .into_response()
}

async fn refresh(State(state): Shared, headers: HeaderMap) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let has_refresh_cookie = cookies(&headers).any(|cookie| cookie == "refresh_token=r1");
    if !has_refresh_cookie || state.refresh_revoked.load(Ordering::SeqCst) {
        return failure(StatusCode::UNAUTHORIZED, "Refresh token expired");
    }

    (
        AppendHeaders([(header::SET_COOKIE, state.access_cookie())]),
        envelope(json!({"id": USER_ID, "name": "Alice", "email": "alice@example.com"})),
    )
        .into_response()
}

async fn verify(State(state): Shared, headers: HeaderMap) -> Response {
    if !state.has_valid_access(&headers) {
        return failure(StatusCode::FORBIDDEN, "Forbidden");
    }
    envelope(json!({"id": USER_ID, "name": "Alice", "email": "alice@example.com"})).into_response()
}

async fn task_by_id(
    State(state): Shared,
    headers: HeaderMap,
    Path((id, _user_id)): Path<(i64, i64)>,
) -> Response {
    if !state.has_valid_access(&headers) {
        return unauthorized(&state);
    }
    let tasks = state.tasks.lock().expect("task mutex poisoned");
    match tasks.iter().find(|task| task["id"] == json!(id)) {
        Some(task) => envelope(task.clone()).into_response(),
        None => failure(StatusCode::NOT_FOUND, "Task not found"),
    }
}

async fn task_view(
    State(state): Shared,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !state.has_valid_access(&headers) {
        return unauthorized(&state);
    }
    let tasks = state.tasks.lock().expect("task mutex poisoned").clone();
    if params.get("viewMode").map(String::as_str) == Some("list") {
        return envelope(json!({"results": tasks, "nextCursor": "", "hasNextPage": false}))
            .into_response();
    }

    let column = |title: &str| {
        let items: Vec<Value> = tasks
            .iter()
            .filter(|task| task["status"] == json!(title))
            .cloned()
            .collect();
        json!({"title": title, "totalCount": items.len(), "items": items})
    };
    envelope(json!({
        "columns": {
            "todo": column("To Do"),
            "in_progress": column("In Progress"),
            "done": column("Done")
        },
        "totalCount": tasks.len()
    }))
    .into_response()
}

async fn update_task(
    State(state): Shared,
    headers: HeaderMap,
    Path((id, _user_id)): Path<(i64, i64)>,
    Json(body): Json<Value>,
) -> Response {
    if !state.has_valid_access(&headers) {
        return unauthorized(&state);
    }
    let mut tasks = state.tasks.lock().expect("task mutex poisoned");
    let Some(task) = tasks.iter_mut().find(|task| task["id"] == json!(id)) else {
        return failure(StatusCode::NOT_FOUND, "Task not found");
    };
    task["status"] = body["status"].clone();
    task["title"] = body["title"].clone();
    envelope(task.clone()).into_response()
}

pub struct MockBackend {
    pub state: Arc<BackendState>,
    pub addr: SocketAddr,
}

impl MockBackend {
    pub async fn start(tasks: Vec<Value>) -> MockBackend {
        let state = Arc::new(BackendState {
            tasks: Mutex::new(tasks),
            ..BackendState::default()
        });
        let router = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/refresh-token", get(refresh))
            .route("/api/auth/verify-user", get(verify))
            .route("/api/task/get-by-id/:id/:user_id", get(task_by_id))
            .route("/api/task/get-by-view", get(task_view))
            .route("/api/task/update/:id/:user_id", put(update_task))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("mock backend should bind");
        let addr = listener.local_addr().expect("bound address");
        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("mock backend stopped");
        });

        MockBackend { state, addr }
    }

    pub fn client(&self) -> ApiClient<ReqwestTransport> {
        ApiClient::new(
            ReqwestTransport::new().expect("HTTP client should build"),
            Url::parse(&format!("http://{}/api", self.addr)).expect("valid api url"),
            Url::parse(&format!("http://{}/notifications", self.addr))
                .expect("valid notification url"),
        )
    }
}

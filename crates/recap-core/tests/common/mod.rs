// Mock GitHub REST API and OAuth token endpoint for integration tests
#![allow(dead_code)]

use axum::extract::{Form, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub const VALID_TOKEN: &str = "ghp_test_token";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub body: Value,
}

#[derive(Clone)]
struct MockState {
    secret_names: Arc<Vec<String>>,
    token_responses: Arc<Mutex<Vec<(StatusCode, Value)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", VALID_TOKEN))
        .unwrap_or(false)
}

fn bad_credentials() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Bad credentials"})),
    )
        .into_response()
}

async fn list_secrets(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path((owner, repo)): Path<(String, String)>,
    axum::extract::Query(query): axum::extract::Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return bad_credentials();
    }
    state.requests.lock().unwrap().push(RecordedRequest {
        path: format!("/repos/{}/{}/actions/secrets", owner, repo),
        body: json!(query),
    });

    // Serve one secret per page to exercise pagination
    let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let secrets: Vec<Value> = state
        .secret_names
        .iter()
        .skip(page - 1)
        .take(1)
        .map(|name| json!({"name": name, "created_at": "2025-01-01T00:00:00Z"}))
        .collect();
    Json(json!({"total_count": state.secret_names.len(), "secrets": secrets})).into_response()
}

async fn list_workflows(Path((_owner, _repo)): Path<(String, String)>) -> Json<Value> {
    Json(json!({
        "total_count": 1,
        "workflows": [{
            "id": 161335,
            "node_id": "MDg6V29ya2Zsb3cxNjEzMzU=",
            "name": "Generate movie recap",
            "path": ".github/workflows/main.yml",
            "state": "active"
        }]
    }))
}

/// Dispatches of this workflow get `200 OK` instead of `204 No Content`
pub const PROXIED_WORKFLOW: &str = "proxied.yml";

async fn dispatch(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path((owner, repo, workflow)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return bad_credentials();
    }
    state.requests.lock().unwrap().push(RecordedRequest {
        path: format!(
            "/repos/{}/{}/actions/workflows/{}/dispatches",
            owner, repo, workflow
        ),
        body,
    });
    // Stands in for an intermediary that answers without queuing the run
    if workflow == PROXIED_WORKFLOW {
        return (StatusCode::OK, Json(json!({"queued": false}))).into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn token(State(state): State<MockState>, Form(form): Form<HashMap<String, String>>) -> Response {
    state.requests.lock().unwrap().push(RecordedRequest {
        path: "/token".to_string(),
        body: json!(form),
    });

    let next = {
        let mut responses = state.token_responses.lock().unwrap();
        if responses.is_empty() {
            None
        } else {
            Some(responses.remove(0))
        }
    };
    match next {
        Some((status, body)) => (status, Json(body)).into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_request", "error_description": "no response queued"})),
        )
            .into_response(),
    }
}

pub struct MockApi {
    addr: SocketAddr,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockApi {
    /// `secret_names` is what the secrets endpoint lists; `token_responses`
    /// are served in order by `POST /token`.
    pub async fn start(secret_names: &[&str], token_responses: Vec<(StatusCode, Value)>) -> Self {
        let state = MockState {
            secret_names: Arc::new(secret_names.iter().map(|s| s.to_string()).collect()),
            token_responses: Arc::new(Mutex::new(token_responses)),
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let requests = state.requests.clone();

        let app = Router::new()
            .route("/repos/{owner}/{repo}/actions/secrets", get(list_secrets))
            .route("/repos/{owner}/{repo}/actions/workflows", get(list_workflows))
            .route(
                "/repos/{owner}/{repo}/actions/workflows/{workflow}/dispatches",
                post(dispatch),
            )
            .route("/token", post(token))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("Failed to bind mock API to 127.0.0.1:0: {}", e));
        let addr = listener.local_addr().unwrap();
        log::info!("Mock API listening on {}", addr);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap_or_else(|e| log::error!("Mock API error: {}", e));
        });

        MockApi {
            addr,
            shutdown_tx,
            requests,
        }
    }

    pub fn address(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn token_uri(&self) -> String {
        format!("{}/token", self.address())
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub async fn shutdown(self) {
        if self.shutdown_tx.send(()).is_err() {
            log::warn!("Mock API already shut down");
        }
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

//! Fixtures shared by the integration tests.
//!
//! [`FakeServices`] runs the salt registry and the status service on one
//! local axum server so the HTTP clients can be exercised end to end.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Recorded traffic and scripted answers.
#[derive(Default)]
pub struct FakeState {
    stored: Mutex<Vec<Value>>,
    status_script: Mutex<VecDeque<(u16, Value)>>,
    status_requests: Mutex<Vec<Value>>,
    registry_code: AtomicU16,
    registry_hits: AtomicUsize,
}

impl FakeState {
    /// Bodies received by `POST /api/store_salt`.
    pub fn stored(&self) -> Vec<Value> {
        self.stored.lock().unwrap().clone()
    }

    /// Bodies received by `POST /status`.
    pub fn status_requests(&self) -> Vec<Value> {
        self.status_requests.lock().unwrap().clone()
    }

    pub fn registry_hits(&self) -> usize {
        self.registry_hits.load(Ordering::SeqCst)
    }
}

/// A running fake registry plus status service.
pub struct FakeServices {
    pub base_url: String,
    pub state: Arc<FakeState>,
}

impl FakeServices {
    /// Start the server. The registry answers with `registry_code`; the
    /// status service replays `script` and then answers `pending`.
    pub async fn spawn(registry_code: u16, script: Vec<(u16, Value)>) -> Self {
        let state = Arc::new(FakeState {
            status_script: Mutex::new(script.into()),
            registry_code: AtomicU16::new(registry_code),
            ..FakeState::default()
        });

        let router = Router::new()
            .route("/api/store_salt", post(store_salt))
            .route("/status", post(status))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake services");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "fake services stopped");
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }
}

fn code(raw: u16) -> StatusCode {
    StatusCode::from_u16(raw).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn store_salt(
    State(state): State<Arc<FakeState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.registry_hits.fetch_add(1, Ordering::SeqCst);
    let status = code(state.registry_code.load(Ordering::SeqCst));
    if status.is_success() {
        state.stored.lock().unwrap().push(body);
        (status, Json(json!({"stored": true})))
    } else {
        (status, Json(json!({"error": "registry unavailable"})))
    }
}

async fn status(
    State(state): State<Arc<FakeState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.status_requests.lock().unwrap().push(body);
    let (raw, answer) = state
        .status_script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((200, json!({"status": "pending"})));
    (code(raw), Json(answer))
}

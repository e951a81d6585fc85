//! In-process mock of the Bizdesk REST backend.
//!
//! Stores each collection as a list of JSON objects and implements the
//! resource routes the client expects. Search matches `name` or
//! `customer_name` case-insensitively.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

#[derive(Default)]
pub struct MockState {
    pub collections: Mutex<HashMap<String, Vec<Value>>>,
    pub fail: AtomicBool,
    pub requests: AtomicUsize,
    pub last_auth: Mutex<Option<String>>,
    next_id: AtomicUsize,
}

impl MockState {
    pub fn records(&self, collection: &str) -> Vec<Value> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
}

#[derive(Deserialize)]
struct ListParams {
    #[serde(default)]
    page: usize,
    #[serde(default = "default_limit")]
    limit: usize,
    search: Option<String>,
}

fn default_limit() -> usize {
    20
}

type Reply = Result<Json<Value>, (StatusCode, String)>;

fn track(state: &MockState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    state.requests.fetch_add(1, Ordering::SeqCst);
    *state.last_auth.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if state.fail.load(Ordering::SeqCst) {
        return Err((StatusCode::SERVICE_UNAVAILABLE, "backend down".to_string()));
    }
    Ok(())
}

fn text_of(v: &Value) -> String {
    ["name", "customer_name"]
        .iter()
        .filter_map(|k| v.get(*k).and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

async fn list(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(collection): Path<String>,
    Query(params): Query<ListParams>,
) -> Reply {
    track(&state, &headers)?;
    let term = params.search.unwrap_or_default().to_lowercase();
    let page: Vec<Value> = state
        .records(&collection)
        .into_iter()
        .filter(|v| term.is_empty() || text_of(v).contains(&term))
        .skip(params.page * params.limit)
        .take(params.limit)
        .collect();
    Ok(Json(Value::Array(page)))
}

async fn create(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(collection): Path<String>,
    Json(mut body): Json<Value>,
) -> Reply {
    track(&state, &headers)?;
    if body.get("id").and_then(Value::as_str).unwrap_or("").is_empty() {
        let n = state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        body["id"] = Value::String(format!("{}-{}", &collection[..1], n));
    }
    state
        .collections
        .lock()
        .unwrap()
        .entry(collection)
        .or_default()
        .push(body.clone());
    Ok(Json(body))
}

async fn fetch_one(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path((collection, id)): Path<(String, String)>,
) -> Reply {
    track(&state, &headers)?;
    state
        .records(&collection)
        .into_iter()
        .find(|v| v["id"] == id.as_str())
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, format!("no {} {}", collection, id)))
}

async fn replace(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path((collection, id)): Path<(String, String)>,
    Json(mut body): Json<Value>,
) -> Reply {
    track(&state, &headers)?;
    body["id"] = Value::String(id.clone());
    let mut collections = state.collections.lock().unwrap();
    let slot = collections
        .get_mut(&collection)
        .and_then(|records| records.iter_mut().find(|v| v["id"] == id.as_str()))
        .ok_or((StatusCode::NOT_FOUND, format!("no {} {}", collection, id)))?;
    *slot = body.clone();
    Ok(Json(body))
}

async fn remove(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path((collection, id)): Path<(String, String)>,
) -> Result<StatusCode, (StatusCode, String)> {
    track(&state, &headers)?;
    let mut collections = state.collections.lock().unwrap();
    let records = collections.entry(collection.clone()).or_default();
    let before = records.len();
    records.retain(|v| v["id"] != id.as_str());
    if records.len() == before {
        return Err((StatusCode::NOT_FOUND, format!("no {} {}", collection, id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/{collection}", get(list).post(create))
        .route(
            "/{collection}/{id}",
            get(fetch_one).put(replace).delete(remove),
        )
        .with_state(state)
}

fn seeded(seed: Vec<(&str, Vec<Value>)>) -> Arc<MockState> {
    let state = MockState::default();
    {
        let mut collections = state.collections.lock().unwrap();
        for (name, records) in seed {
            collections.insert(name.to_string(), records);
        }
    }
    Arc::new(state)
}

/// Serve on an ephemeral port from the current tokio runtime.
pub async fn spawn(seed: Vec<(&str, Vec<Value>)>) -> MockBackend {
    let state = seeded(seed);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(Arc::clone(&state));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    MockBackend {
        base_url: format!("http://{}", addr),
        state,
    }
}

/// Serve from a dedicated thread, for tests that block on a child process.
pub fn spawn_in_thread(seed: Vec<(&str, Vec<Value>)>) -> MockBackend {
    let state = seeded(seed);
    let app = router(Arc::clone(&state));
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });
    let addr = rx.recv().unwrap();
    MockBackend {
        base_url: format!("http://{}", addr),
        state,
    }
}

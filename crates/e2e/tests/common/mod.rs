//! In-process stand-in for the SkyAR service

#![allow(dead_code)]

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const TEMPLATES: [&str; 6] = [
    "cloudy",
    "district9ship",
    "floatingcastle",
    "galaxy",
    "jupiter",
    "rainbow",
];

/// A status endpoint response: HTTP status and body
pub fn status(label: &str, progress: u32) -> (u16, Value) {
    (
        200,
        json!({ "status": label, "progress": progress, "message": format!("{} {}%", label, progress) }),
    )
}

struct FakeState {
    video_id: String,
    status_script: Vec<(u16, Value)>,
    download: Vec<u8>,
    status_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    download_calls: AtomicUsize,
}

/// Fake service answering every endpoint. Status responses follow the
/// script in order, repeating the last entry once it runs out.
pub struct FakeSkyAr {
    pub base_url: String,
    state: Arc<FakeState>,
}

impl FakeSkyAr {
    pub async fn start(video_id: &str, status_script: Vec<(u16, Value)>, download: Vec<u8>) -> Self {
        let state = Arc::new(FakeState {
            video_id: video_id.to_string(),
            status_script,
            download,
            status_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/health", get(health))
            .route("/api/templates", get(templates))
            .route("/api/upload", post(upload))
            .route("/api/process", post(process))
            .route("/api/status/:video_id", get(status_check))
            .route("/api/download/:video_id", get(download_result))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn status_calls(&self) -> usize {
        self.state.status_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.state.upload_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.state.download_calls.load(Ordering::SeqCst)
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "SkyAR Demo" }))
}

async fn templates() -> Json<Value> {
    let map: serde_json::Map<String, Value> = TEMPLATES
        .iter()
        .map(|name| (name.to_string(), json!(format!("skybox/{}.jpg", name))))
        .collect();
    Json(json!({ "templates": map }))
}

async fn upload(
    State(state): State<Arc<FakeState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, StatusCode> {
    state.upload_calls.fetch_add(1, Ordering::SeqCst);

    let mut received = false;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        if field.name() == Some("file") {
            let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
            received = !data.is_empty();
        }
    }

    if !received {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(Json(json!({ "video_id": state.video_id })))
}

async fn process(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> impl IntoResponse {
    if body.get("video_id").and_then(Value::as_str) == Some(state.video_id.as_str()) {
        (StatusCode::OK, Json(json!({ "success": true, "message": "Processing started" })))
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "detail": "Video not found" })))
    }
}

async fn status_check(
    State(state): State<Arc<FakeState>>,
    Path(_video_id): Path<String>,
) -> impl IntoResponse {
    let call = state.status_calls.fetch_add(1, Ordering::SeqCst);
    let index = call.min(state.status_script.len().saturating_sub(1));
    let (code, body) = state
        .status_script
        .get(index)
        .cloned()
        .unwrap_or_else(|| (200, json!({ "status": "processing" })));

    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(body),
    )
}

async fn download_result(
    State(state): State<Arc<FakeState>>,
    Path(_video_id): Path<String>,
) -> impl IntoResponse {
    state.download_calls.fetch_add(1, Ordering::SeqCst);
    state.download.clone()
}

/// Write a small stand-in video into `dir`
pub fn video_fixture(dir: &std::path::Path) -> PathBuf {
    let path = dir.join("annarbor.mp4");
    std::fs::write(&path, vec![0u8; 2048]).unwrap();
    path
}

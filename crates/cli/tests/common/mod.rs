//! One mock server playing both the Batimap backend and JOSM.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use batimap_backend::{BatimapApi, PollConfig};
use batimap_core::city::CityDTO;
use batimap_josm::{JosmClient, JosmImporter};
use serde_json::{json, Value};

pub const TASK_ID: &str = "0b6c7d1e-3f0a-4c55-8a0e-6d2f0b9c1a22";
pub const OBSOLETE_OSMID: i64 = 1076124;

/// How the `josm` job ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// `SUCCESS` with files dated `date`.
    Data { date: &'static str },
    /// `SUCCESS` with a null result (unknown city).
    NoData,
    Failure,
}

/// One remote-control call received on the JOSM side.
#[derive(Debug, Clone)]
pub struct JosmCall {
    pub path: String,
    pub query: HashMap<String, String>,
}

#[derive(Clone)]
pub struct Mock {
    pub base: String,
    pub outcome: JobOutcome,
    pub status_calls: Arc<AtomicUsize>,
    josm_calls: Arc<Mutex<Vec<JosmCall>>>,
}

impl Mock {
    pub fn josm_calls(&self) -> Vec<JosmCall> {
        self.josm_calls.lock().unwrap().clone()
    }

    /// JOSM endpoints hit, in arrival order. Version checks are left out.
    pub fn josm_paths(&self) -> Vec<String> {
        self.josm_calls()
            .into_iter()
            .map(|c| c.path)
            .filter(|p| p != "/version")
            .collect()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

pub fn city(date: &str) -> CityDTO {
    serde_json::from_value(json!({ "name": "Brest", "insee": "29019", "date": date })).unwrap()
}

async fn submit(Path(_insee): Path<String>) -> Response {
    (StatusCode::ACCEPTED, Json(json!({ "task_id": TASK_ID }))).into_response()
}

async fn fetch_city(Path(insee): Path<String>) -> Json<Value> {
    Json(json!({ "name": "Brest", "insee": insee, "date": "2009", "josm_ready": true }))
}

async fn obsolete() -> Json<Value> {
    Json(json!({
        "position": [-4.48, 48.39],
        "city": { "name": "Brest", "insee": "29019", "date": "2009" },
        "osmid": OBSOLETE_OSMID
    }))
}

async fn task_status(State(mock): State<Mock>) -> Json<Value> {
    let n = mock.status_calls.fetch_add(1, Ordering::SeqCst);
    if n == 0 {
        return Json(json!({ "state": "PENDING", "result": null }));
    }
    if n == 1 {
        return Json(json!({ "state": "PROGRESS", "result": { "current": 50, "total": 100 } }));
    }
    Json(match mock.outcome {
        JobOutcome::Failure => json!({ "state": "FAILURE", "result": "cadastre unavailable" }),
        JobOutcome::NoData => json!({ "state": "SUCCESS", "result": null }),
        JobOutcome::Data { date } => json!({
            "state": "SUCCESS",
            "result": {
                "buildingsUrl": format!("{}/files/present-buildings.osm", mock.base),
                "segmententationPredictionssUrl": format!("{}/files/missing-segmentation.osm", mock.base),
                "bbox": [-4.57, -4.42, 48.35, 48.46],
                "date": date
            }
        }),
    })
}

async fn josm(
    State(mock): State<Mock>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let path = uri.path().to_string();
    if let Some(file) = path.strip_prefix("/files/") {
        return if file.starts_with("present") {
            (StatusCode::OK, "<osm/>")
        } else {
            (StatusCode::NOT_FOUND, "not found")
        };
    }
    mock.josm_calls.lock().unwrap().push(JosmCall { path, query });
    (StatusCode::OK, "OK\r\n")
}

/// Serve the mock on an ephemeral port.
pub async fn spawn(outcome: JobOutcome) -> Mock {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mock = Mock {
        base: format!("http://{}", listener.local_addr().unwrap()),
        outcome,
        status_calls: Arc::default(),
        josm_calls: Arc::default(),
    };

    let router = Router::new()
        .route("/cities/obsolete", get(obsolete))
        .route("/cities/{insee}", get(fetch_city))
        .route("/cities/{insee}/josm", get(submit))
        .route("/tasks/{id}", get(task_status))
        .fallback(josm)
        .with_state(mock.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    mock
}

/// Backend client polling every 10 ms, and an importer, both on `mock`.
pub fn clients(mock: &Mock) -> (BatimapApi, JosmImporter) {
    let api = BatimapApi::new(mock.base.clone()).with_poll_config(PollConfig {
        interval: Duration::from_millis(10),
    });
    (api, JosmImporter::new(JosmClient::new(mock.base.clone())))
}

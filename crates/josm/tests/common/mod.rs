//! Mock JOSM remote-control listener shared by the integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;

/// One request received by the mock.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
}

#[derive(Clone)]
pub struct MockJosm {
    requests: Arc<Mutex<Vec<Recorded>>>,
    load_and_zoom_status: Arc<AtomicU16>,
}

impl Default for MockJosm {
    fn default() -> Self {
        Self {
            requests: Arc::default(),
            load_and_zoom_status: Arc::new(AtomicU16::new(200)),
        }
    }
}

impl MockJosm {
    /// Status returned by `load_and_zoom` from now on.
    pub fn answer_load_and_zoom_with(&self, status: u16) {
        self.load_and_zoom_status.store(status, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Remote-control calls only, in arrival order. HEAD checks are left out.
    pub fn calls(&self) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| !r.path.starts_with("/files/"))
            .collect()
    }

    pub fn calls_to(&self, endpoint: &str) -> Vec<Recorded> {
        let path = format!("/{endpoint}");
        self.calls().into_iter().filter(|r| r.path == path).collect()
    }

    pub fn position(&self, endpoint: &str) -> Option<usize> {
        let path = format!("/{endpoint}");
        self.calls().iter().position(|r| r.path == path)
    }
}

async fn handle(
    State(mock): State<MockJosm>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let path = uri.path().to_string();
    mock.requests.lock().unwrap().push(Recorded {
        method,
        path: path.clone(),
        query,
    });

    if let Some(file) = path.strip_prefix("/files/") {
        return if file.starts_with("present") {
            (StatusCode::OK, "<osm/>")
        } else {
            (StatusCode::NOT_FOUND, "not found")
        };
    }
    match path.as_str() {
        "/version" => (
            StatusCode::OK,
            r#"{"protocolversion":{"major":1,"minor":13},"application":"JOSM RemoteControl"}"#,
        ),
        "/load_and_zoom" => {
            let status = mock.load_and_zoom_status.load(Ordering::SeqCst);
            let status = StatusCode::from_u16(status).unwrap();
            if status.is_success() {
                (status, "OK\r\n")
            } else {
                (status, "download failed")
            }
        }
        _ => (StatusCode::OK, "OK\r\n"),
    }
}

/// Serve `mock` on an ephemeral port and return its origin.
pub async fn spawn_josm(mock: MockJosm) -> String {
    let router = Router::new().fallback(handle).with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

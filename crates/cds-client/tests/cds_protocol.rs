//! `CdsClient` against a local mock of the archive's task API.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Extension, Path};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use cds_client::{CdsClient, CdsError, Credentials, FetchSettings, Retriever, RetrieveRequest};
use era5_common::{ErrorKind, RequestDate};
use serde_json::{json, Value};
use tempfile::TempDir;

const PAYLOAD: &[u8] = b"CDF\x02 not really a dataset";

#[derive(Clone, Copy, PartialEq)]
enum Behaviour {
    /// queued → running → completed
    Completes,
    /// reply `failed` straight away
    Fails,
    /// reject credentials
    Unauthorized,
    /// never leave `queued`
    StaysQueued,
}

struct Mock {
    behaviour: Behaviour,
    polls: AtomicUsize,
    bodies: Mutex<Vec<Value>>,
    auth: Mutex<Option<String>>,
}

async fn submit(
    Extension(mock): Extension<Arc<Mock>>,
    Path(dataset): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    assert_eq!(dataset, "reanalysis-era5-single-levels");
    *mock.auth.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    mock.bodies.lock().unwrap().push(body);

    match mock.behaviour {
        Behaviour::Unauthorized => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Authentication failed", "reason": "invalid key"})),
        ),
        Behaviour::Fails => (
            StatusCode::ACCEPTED,
            Json(json!({
                "state": "failed",
                "request_id": "req-1",
                "error": {"message": "Request too large", "reason": "cost limits exceeded"}
            })),
        ),
        _ => (
            StatusCode::ACCEPTED,
            Json(json!({"state": "queued", "request_id": "req-1"})),
        ),
    }
}

async fn task(Extension(mock): Extension<Arc<Mock>>, Path(id): Path<String>) -> Json<Value> {
    assert_eq!(id, "req-1");
    let n = mock.polls.fetch_add(1, Ordering::SeqCst);
    if mock.behaviour == Behaviour::StaysQueued || n == 0 {
        let state = if n == 0 { "running" } else { "queued" };
        return Json(json!({"state": state, "request_id": id}));
    }
    Json(json!({
        "state": "completed",
        "request_id": id,
        "location": "/download/req-1.nc",
        "content_length": PAYLOAD.len()
    }))
}

async fn download() -> &'static [u8] {
    PAYLOAD
}

async fn start(behaviour: Behaviour) -> (SocketAddr, Arc<Mock>) {
    let mock = Arc::new(Mock {
        behaviour,
        polls: AtomicUsize::new(0),
        bodies: Mutex::new(Vec::new()),
        auth: Mutex::new(None),
    });
    let app = Router::new()
        .route("/api/v2/resources/:dataset", post(submit))
        .route("/api/v2/tasks/:id", get(task))
        .route("/download/:file", get(download))
        .layer(Extension(mock.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, mock)
}

fn client(addr: SocketAddr, max_wait_secs: u64) -> CdsClient {
    let creds = Credentials::new(format!("http://{}/api/v2", addr), "12345", "secret-key");
    let settings = FetchSettings {
        poll_interval_secs: 0,
        max_wait_secs,
        ..FetchSettings::default()
    };
    CdsClient::new(creds, &settings).unwrap()
}

fn request() -> RetrieveRequest {
    RetrieveRequest::new(
        &FetchSettings::default(),
        RequestDate::parse("2020-06-15").unwrap(),
        &["2m_temperature", "surface_pressure"],
    )
}

#[tokio::test]
async fn test_retrieve_polls_then_downloads() {
    let (addr, mock) = start(Behaviour::Completes).await;
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("out.nc");

    let bytes = client(addr, 60)
        .retrieve("reanalysis-era5-single-levels", &request(), &target)
        .await
        .unwrap();

    assert_eq!(bytes, PAYLOAD.len() as u64);
    assert_eq!(std::fs::read(&target).unwrap(), PAYLOAD);
    assert_eq!(mock.polls.load(Ordering::SeqCst), 2);

    let bodies = mock.bodies.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["variable"], json!(["2m_temperature", "surface_pressure"]));
    assert_eq!(bodies[0]["year"], "2020");
    assert_eq!(bodies[0]["month"], "06");
    assert_eq!(bodies[0]["day"], "15");
    assert_eq!(bodies[0]["time"], json!(["13:00"]));
    assert_eq!(bodies[0]["format"], "netcdf");

    // Basic auth with base64("12345:secret-key").
    let auth = mock.auth.lock().unwrap().clone().unwrap();
    assert_eq!(auth, "Basic MTIzNDU6c2VjcmV0LWtleQ==");
}

#[tokio::test]
async fn test_failed_task_reports_reason() {
    let (addr, _mock) = start(Behaviour::Fails).await;
    let dir = TempDir::new().unwrap();

    let err = client(addr, 60)
        .retrieve("reanalysis-era5-single-levels", &request(), &dir.path().join("x.nc"))
        .await
        .unwrap_err();

    match &err {
        CdsError::RequestFailed(msg) => assert!(msg.contains("cost limits exceeded"), "{}", msg),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.kind(), ErrorKind::RemoteAccess);
}

#[tokio::test]
async fn test_http_error_status() {
    let (addr, _mock) = start(Behaviour::Unauthorized).await;
    let dir = TempDir::new().unwrap();

    let err = client(addr, 60)
        .retrieve("reanalysis-era5-single-levels", &request(), &dir.path().join("x.nc"))
        .await
        .unwrap_err();

    match err {
        CdsError::Service { status, message } => {
            assert_eq!(status, 401);
            assert!(message.contains("Authentication failed"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_gives_up_after_max_wait() {
    let (addr, _mock) = start(Behaviour::StaysQueued).await;
    let dir = TempDir::new().unwrap();

    let err = client(addr, 0)
        .retrieve("reanalysis-era5-single-levels", &request(), &dir.path().join("x.nc"))
        .await
        .unwrap_err();

    assert!(matches!(err, CdsError::Timeout { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_unreachable_host() {
    // Bind then drop to get a port nothing listens on.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let dir = TempDir::new().unwrap();

    let err = client(addr, 60)
        .retrieve("reanalysis-era5-single-levels", &request(), &dir.path().join("x.nc"))
        .await
        .unwrap_err();

    assert!(matches!(err, CdsError::Http(_)));
    assert_eq!(err.kind(), ErrorKind::RemoteAccess);
}

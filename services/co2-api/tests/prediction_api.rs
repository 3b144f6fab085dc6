//! End-to-end behaviour of the prediction API against a fake archive.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use cds_client::{CdsError, FetchSettings, Fetcher, Retriever, RetrieveRequest};
use co2_api::config::ServiceConfig;
use co2_api::{create_router, AppState, Component};
use co2_model::PredictionBundle;
use serde_json::{json, Value};
use tempfile::TempDir;
use test_utils::{assert_approx_eq, model, scenario, Era5FileBuilder};
use tower::ServiceExt;

/// Serves synthetic files for the scenario point instead of calling the
/// archive.
#[derive(Default)]
struct FakeArchive {
    calls: AtomicUsize,
    fail_vegetation: bool,
    omit: Vec<&'static str>,
}

#[async_trait]
impl Retriever for FakeArchive {
    async fn retrieve(
        &self,
        _dataset: &str,
        request: &RetrieveRequest,
        target: &Path,
    ) -> cds_client::Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let vegetation = request.variable.iter().any(|v| v == "high_vegetation_cover");
        if vegetation && self.fail_vegetation {
            return Err(CdsError::RequestFailed("connection reset by peer".into()));
        }

        let fields = if vegetation {
            scenario::VEG_FIELDS
        } else {
            scenario::METEO_FIELDS
        };
        let builder = fields
            .iter()
            .filter(|(name, _)| !self.omit.contains(name))
            .fold(Era5FileBuilder::sample_grid(), |b, (name, v)| {
                b.uniform_field(name, *v)
            });
        let target = target.to_path_buf();
        let bytes = tokio::task::spawn_blocking(move || builder.write(&target))
            .await
            .map_err(|e| CdsError::RequestFailed(e.to_string()))??;
        Ok(bytes)
    }
}

struct Harness {
    app: Router,
    state: Arc<AppState>,
    archive: Arc<FakeArchive>,
    _cache: TempDir,
}

fn harness(archive: FakeArchive, with_model: bool) -> Harness {
    let cache = TempDir::new().unwrap();
    let archive = Arc::new(archive);
    let fetcher = Fetcher::new(archive.clone(), FetchSettings::default());
    let bundle = if with_model {
        Component::Ready(PredictionBundle::from_json(model::BUNDLE_JSON).unwrap())
    } else {
        Component::Unavailable("model bundle not found".into())
    };
    let state = Arc::new(AppState::new(
        Component::Ready(fetcher),
        bundle,
        cache.path().to_path_buf(),
    ));
    Harness {
        app: create_router(state.clone()),
        state,
        archive,
        _cache: cache,
    }
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn predict_uri() -> String {
    format!(
        "/predict?date={}&lat={}&lon={}",
        scenario::DATE,
        scenario::LATITUDE,
        scenario::LONGITUDE
    )
}

#[tokio::test]
async fn test_predicts_single_row() {
    let h = harness(FakeArchive::default(), true);

    let (status, body) = send(&h.app, Method::GET, &predict_uri(), None).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "predicted");
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["date"], "2020-06-15");
    assert_eq!(rows[0]["latitude"], 40.0);
    assert_eq!(rows[0]["longitude"], -75.0);
    assert_approx_eq!(rows[0]["co2"].as_f64().unwrap(), scenario::EXPECTED_CO2, 1e-6);
    assert!(body.get("missing_predictors").is_none());
}

#[tokio::test]
async fn test_vegetation_fetch_failure_is_single_error() {
    let h = harness(
        FakeArchive {
            fail_vegetation: true,
            ..FakeArchive::default()
        },
        true,
    );

    let (status, body) = send(&h.app, Method::GET, &predict_uri(), None).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let object = body.as_object().unwrap();
    assert_eq!(object.len(), 1, "{}", body);
    assert_eq!(body["error"]["kind"], "remote_access");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("connection reset"));
    assert!(body.get("rows").is_none());
}

#[tokio::test]
async fn test_missing_field_skips_prediction() {
    let h = harness(
        FakeArchive {
            omit: vec!["lai_lv"],
            ..FakeArchive::default()
        },
        true,
    );

    let (status, body) = send(&h.app, Method::GET, &predict_uri(), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "skipped_incomplete_features");
    assert_eq!(body["missing_predictors"], json!(["lai_lv"]));
    assert!(body["rows"][0].get("co2").is_none());
    assert_eq!(body["features"]["lai_lv"], Value::Null);
    assert_approx_eq!(body["features"]["t2m"].as_f64().unwrap(), 295.0, 1e-3);
}

#[tokio::test]
async fn test_without_model_returns_feature_free_table() {
    let h = harness(FakeArchive::default(), false);

    let (status, body) = send(&h.app, Method::GET, &predict_uri(), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "model_unavailable");
    let row = body["rows"][0].as_object().unwrap();
    assert_eq!(row.len(), 3);
    assert!(row.contains_key("date") && row.contains_key("latitude") && row.contains_key("longitude"));
}

#[tokio::test]
async fn test_repeat_request_uses_cache() {
    let h = harness(FakeArchive::default(), true);

    send(&h.app, Method::GET, &predict_uri(), None).await;
    let (status, _) = send(&h.app, Method::GET, &predict_uri(), None).await;

    assert_eq!(status, StatusCode::OK);
    // One meteorological and one vegetation retrieval in total.
    assert_eq!(h.archive.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_invalid_date() {
    let h = harness(FakeArchive::default(), true);

    let (status, body) = send(&h.app, Method::GET, "/predict?date=15/06/2020&lat=1&lon=2", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_input");
    assert_eq!(h.archive.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_non_finite_coordinate_rejected_before_fetch() {
    let h = harness(FakeArchive::default(), true);

    let (status, body) = send(&h.app, Method::GET, "/predict?date=2020-06-15&lat=NaN&lon=-75", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_input");
    assert!(body["error"]["message"].as_str().unwrap().contains("not a finite"));
    assert_eq!(h.archive.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_no_credentials_is_configuration_error() {
    let cache = TempDir::new().unwrap();
    let state = AppState::new(
        Component::Unavailable("CDS credentials unavailable".into()),
        Component::Ready(PredictionBundle::from_json(model::BUNDLE_JSON).unwrap()),
        cache.path().to_path_buf(),
    );
    let app = create_router(Arc::new(state));

    let (status, body) = send(&app, Method::GET, &predict_uri(), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["kind"], "configuration");

    let (status, body) = send(&app, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["model"], "ok");
    assert_eq!(body["ready"], false);

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_session_flow() {
    let h = harness(FakeArchive::default(), true);

    let (status, created) = send(&h.app, Method::POST, "/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["stage"], "idle");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, session) = send(
        &h.app,
        Method::PUT,
        &format!("/sessions/{}/date", id),
        Some(json!({"date": scenario::DATE})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["stage"], "date_selected");
    assert_eq!(h.archive.calls.load(Ordering::SeqCst), 0);

    let (status, session) = send(
        &h.app,
        Method::PUT,
        &format!("/sessions/{}/location", id),
        Some(json!({"latitude": scenario::LATITUDE, "longitude": scenario::LONGITUDE})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["stage"], "done");
    assert_eq!(session["attempt"], 1);
    assert_eq!(
        session["history"],
        json!(["fetching", "extracting", "assembling", "predicting", "done"])
    );
    assert_approx_eq!(
        session["result"]["rows"][0]["co2"].as_f64().unwrap(),
        scenario::EXPECTED_CO2,
        1e-6
    );

    let (status, fetched) = send(&h.app, Method::GET, &format!("/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["result"], session["result"]);

    let (status, _) = send(&h.app, Method::DELETE, &format!("/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&h.app, Method::GET, &format!("/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "not_found");
}

#[tokio::test]
async fn test_session_error_has_no_result() {
    let h = harness(
        FakeArchive {
            fail_vegetation: true,
            ..FakeArchive::default()
        },
        true,
    );
    let (_, created) = send(&h.app, Method::POST, "/sessions", None).await;
    let id = created["id"].as_str().unwrap().to_string();

    send(
        &h.app,
        Method::PUT,
        &format!("/sessions/{}/location", id),
        Some(json!({"latitude": 40.0, "longitude": -75.0})),
    )
    .await;
    let (_, session) = send(
        &h.app,
        Method::PUT,
        &format!("/sessions/{}/date", id),
        Some(json!({"date": "2020-06-15"})),
    )
    .await;

    assert_eq!(session["stage"], "error");
    assert_eq!(session["error"]["kind"], "remote_access");
    assert!(session.get("result").is_none());
}

#[tokio::test]
async fn test_idle_sessions_expire() {
    let h = harness(FakeArchive::default(), true);
    let (_, stale) = send(&h.app, Method::POST, "/sessions", None).await;
    let stale = stale["id"].as_str().unwrap().to_string();

    let later = Utc::now() + chrono::Duration::seconds(2 * 3600);
    assert_eq!(h.state.sweep_sessions(later).await, 1);
    let (status, _) = send(&h.app, Method::GET, &format!("/sessions/{}", stale), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_sweeps_expired_sessions() {
    let h = harness(FakeArchive::default(), true);
    let (_, first) = send(&h.app, Method::POST, "/sessions", None).await;
    let first = first["id"].as_str().unwrap().to_string();

    // Age the first session past the default TTL.
    {
        let mut sessions = h.state.sessions.write().await;
        let session = sessions.values_mut().next().unwrap();
        session.updated_at = Utc::now() - chrono::Duration::seconds(2 * 3600);
    }
    let (status, _) = send(&h.app, Method::POST, "/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(h.state.sessions.read().await.len(), 1);
    let (status, _) = send(&h.app, Method::GET, &format!("/sessions/{}", first), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_running_session_survives_sweep() {
    let h = harness(FakeArchive::default(), true);
    let (_, recent) = send(&h.app, Method::POST, "/sessions", None).await;
    let recent = recent["id"].as_str().unwrap().to_string();
    {
        let mut sessions = h.state.sessions.write().await;
        let session = sessions.values_mut().next().unwrap();
        session.stage = co2_api::session::Stage::Fetching;
    }

    let later = Utc::now() + chrono::Duration::seconds(2 * 3600);
    assert_eq!(h.state.sweep_sessions(later).await, 0);
    assert_eq!(h.state.sweep_sessions(Utc::now()).await, 0);
    let (status, _) = send(&h.app, Method::GET, &format!("/sessions/{}", recent), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[test]
fn test_session_ttl_is_configurable() {
    let dir = TempDir::new().unwrap();
    let config = ServiceConfig {
        cache_dir: dir.path().join("cache"),
        model_path: dir.path().join("missing.json"),
        credentials_path: Some(dir.path().join("missing-rc")),
        session_ttl: Duration::from_secs(90),
        ..ServiceConfig::default()
    };
    let state = AppState::from_config(&config);
    assert_eq!(state.session_ttl, Duration::from_secs(90));
    assert_eq!(ServiceConfig::default().session_ttl, Duration::from_secs(3600));
}

#[test]
fn test_state_from_config_degrades_without_model() {
    let dir = TempDir::new().unwrap();
    let rc = dir.path().join(".cdsapirc");
    std::fs::write(&rc, "url: http://127.0.0.1:1/api/v2\nkey: 1:k\n").unwrap();

    let config = ServiceConfig {
        cache_dir: dir.path().join("cache"),
        model_path: dir.path().join("missing.json"),
        settings_path: dir.path().join("missing.yaml"),
        credentials_path: Some(rc),
        ..ServiceConfig::default()
    };
    let state = AppState::from_config(&config);
    assert!(state.fetcher.is_ready());
    assert!(!state.bundle.is_ready());
    assert!(state.bundle.status().contains("not found"));
    assert_eq!(ServiceConfig::default().settings_path, Path::new("config/era5.yaml"));
}

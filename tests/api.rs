mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{test_config, write_artifact, write_constant_model};
use daily_load_forecaster::{api, config::WeatherProviderKind, controller::AppState};

/// Router over a failing weather provider and a models dir holding only `vendredi`
async fn app() -> (Router, MockServer, TempDir) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let models = TempDir::new().unwrap();
    write_constant_model(models.path(), "vendredi", 100.0);

    let cfg = test_config(WeatherProviderKind::OpenMeteo, &server.uri(), models.path());
    let state = AppState::new(cfg.clone()).unwrap();
    (api::router(state, &cfg), server, models)
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn send_json(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(app, method, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn calendar_profile_for_tabaski_friday() {
    let (app, _server, _models) = app().await;
    let (status, body) = send_json(&app, Method::GET, "/api/v1/calendar?date=2025-06-06").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["weekday"], "vendredi");
    assert_eq!(body["season"], "Transition");
    assert_eq!(body["profile_label"], "Transition vendredi");
    assert_eq!(body["is_weekend"], false);
    assert_eq!(body["holidays"]["is_holiday"], true);
    assert_eq!(body["holidays"]["is_tabaski"], true);
    assert_eq!(body["holiday_names"], serde_json::json!(["Tabaski"]));
}

#[tokio::test]
async fn malformed_date_is_rejected() {
    let (app, _server, _models) = app().await;

    let (status, body) = send_json(&app, Method::GET, "/api/v1/calendar?date=2025-13-40").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");

    let (status, _) = send(&app, Method::POST, "/api/v1/predictions?date=tomorrow").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/dashboard?date=06-06-2025").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_starts_with_zeros() {
    let (app, _server, _models) = app().await;
    let (status, body) = send_json(&app, Method::GET, "/api/v1/temperatures").await;

    assert_eq!(status, StatusCode::OK);
    let temps = body["temperatures"].as_array().unwrap();
    assert_eq!(temps.len(), 24);
    assert!(temps.iter().all(|t| t.as_f64() == Some(0.0)));
    assert!(body["fetched_for"].is_null());
}

#[tokio::test]
async fn failed_fetch_stores_synthetic_series() {
    let (app, _server, _models) = app().await;

    let (status, body) =
        send_json(&app, Method::POST, "/api/v1/temperatures?date=2025-06-06").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["date"], "2025-06-06");
    assert_eq!(body["source"], "fallback");
    assert!(body["reason"]["provider"].is_string());
    assert_eq!(body["temperatures"][0], 25.0);
    assert_eq!(body["temperatures"][5], 30.0);
    assert_eq!(body["temperatures"][6], 25.0);

    let (_, session) = send_json(&app, Method::GET, "/api/v1/temperatures").await;
    assert_eq!(session["fetched_for"], "2025-06-06");
    assert_eq!(session["temperatures"], body["temperatures"]);
}

#[tokio::test]
async fn prediction_applies_growth_and_hourly_discounts() {
    let (app, _server, _models) = app().await;
    send(&app, Method::POST, "/api/v1/temperatures?date=2025-06-06").await;

    let (status, body) =
        send_json(&app, Method::POST, "/api/v1/predictions?date=2025-06-06").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_id"], "rf_vendredi");

    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 24);
    let consumption = |h: usize| rows[h]["consumption_mw"].as_f64().unwrap();
    assert!((consumption(17) - 104.76).abs() < 1e-9);
    assert!((consumption(9) - 98.28).abs() < 1e-9);
    assert!((consumption(18) - 98.28).abs() < 1e-9);
    assert!((consumption(0) - 108.0).abs() < 1e-9);
    assert!((consumption(23) - 108.0).abs() < 1e-9);
    assert_eq!(rows[5]["temperature_c"], 30.0);
}

#[tokio::test]
async fn prediction_uses_session_series_before_any_fetch() {
    let (app, _server, _models) = app().await;
    let (status, body) =
        send_json(&app, Method::POST, "/api/v1/predictions?date=2025-06-06").await;

    assert_eq!(status, StatusCode::OK);
    let rows = body["rows"].as_array().unwrap();
    assert!(rows.iter().all(|r| r["temperature_c"] == 0.0));
}

#[tokio::test]
async fn missing_weekday_model_is_not_found() {
    let (app, _server, _models) = app().await;
    let (status, body) =
        send_json(&app, Method::POST, "/api/v1/predictions?date=2025-06-09").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
    assert_eq!(body["message"], "No model found for lundi");
}

#[tokio::test]
async fn corrupt_model_artifact_is_a_server_error() {
    let (app, _server, models) = app().await;
    write_artifact(models.path(), "vendredi", b"{ not json");

    let (status, body) =
        send_json(&app, Method::POST, "/api/v1/predictions?date=2025-06-06").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "InternalServerError");
    assert_ne!(body["message"], "No model found for vendredi");
}

#[tokio::test]
async fn health_lists_available_models() {
    let (app, _server, _models) = app().await;
    let (status, body) = send_json(&app, Method::GET, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["weather_provider"], "open_meteo");
    assert_eq!(body["models"]["available"], serde_json::json!(["vendredi"]));
    assert_eq!(body["models"]["missing"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn dashboard_renders_prediction() {
    let (app, _server, _models) = app().await;
    let (status, body) = send(
        &app,
        Method::GET,
        "/dashboard?date=2025-06-06&fetch=true&predict=true",
    )
    .await;
    let html = String::from_utf8(body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Prédiction consommation pour le 2025-06-06 (vendredi)"));
    assert!(html.contains("Vendredi 2025-06-06"));
    assert!(html.contains("Température (°C)"));
    assert!(html.contains("104.76"));
}

#[tokio::test]
async fn dashboard_reports_missing_model() {
    let (app, _server, _models) = app().await;
    let (status, body) = send(&app, Method::GET, "/dashboard?date=2025-06-09&predict=true").await;
    let html = String::from_utf8(body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("No model found for lundi"));
    assert!(!html.contains("Consommation ajustée"));
}

#[tokio::test]
async fn root_serves_dashboard_for_today() {
    let (app, _server, _models) = app().await;
    let (status, body) = send(&app, Method::GET, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("Températures horaires"));
}

#[tokio::test]
async fn dashboard_treats_empty_date_as_today() {
    let (app, _server, _models) = app().await;
    let (status, body) = send(&app, Method::GET, "/dashboard?date=").await;

    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("Températures horaires"));
}

#[tokio::test]
async fn dashboard_names_fixed_holiday() {
    let (app, _server, _models) = app().await;
    let (status, body) = send(&app, Method::GET, "/dashboard?date=2025-12-25").await;
    let html = String::from_utf8(body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Férié : Noël"), "{html}");
}

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;

use crate::controller::AppState;
use crate::domain::Weekday;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: chrono::DateTime<chrono::Utc>,
    weather_provider: String,
    models: ModelHealth,
}

#[derive(Debug, Serialize)]
pub struct ModelHealth {
    available: Vec<Weekday>,
    missing: Vec<Weekday>,
    cached: usize,
}

/// GET /health
///
/// Liveness. Missing weekday models degrade the status but never fail the check.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let models = state.forecaster.models();
    let available = models.available();
    let missing: Vec<Weekday> = Weekday::ALL
        .into_iter()
        .filter(|w| !available.contains(w))
        .collect();

    let response = HealthResponse {
        status: if missing.is_empty() { "healthy" } else { "degraded" },
        timestamp: chrono::Utc::now(),
        weather_provider: state.temperatures.provider_name().to_string(),
        models: ModelHealth {
            available,
            missing,
            cached: models.cached_count(),
        },
    };
    tracing::debug!(status = response.status, "Health check completed");

    Json(response)
}

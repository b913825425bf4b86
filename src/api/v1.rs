use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::{
    controller::{AppState, Session},
    domain::{CalendarProfile, DailyForecast},
    forecast::TemperatureReading,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/calendar", get(get_calendar))
        .route("/temperatures", get(get_temperatures).post(fetch_temperatures))
        .route("/predictions", post(predict))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: String,
}

/// Parse a `YYYY-MM-DD` query value
pub fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| ApiError::BadRequest(format!("invalid date {raw:?}: {e}")))
}

/// GET /api/v1/calendar?date=YYYY-MM-DD
pub async fn get_calendar(
    State(st): State<AppState>,
    Query(q): Query<DateQuery>,
) -> Result<Json<CalendarProfile>, ApiError> {
    let date = parse_date(&q.date)?;
    Ok(Json(st.forecaster.calendar().resolve(date)))
}

#[derive(Debug, Serialize)]
pub struct TemperatureResponse {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub reading: TemperatureReading,
}

/// POST /api/v1/temperatures?date=YYYY-MM-DD
///
/// Always succeeds for a valid date; provider failures show up as `"source": "fallback"`.
pub async fn fetch_temperatures(
    State(st): State<AppState>,
    Query(q): Query<DateQuery>,
) -> Result<Json<TemperatureResponse>, ApiError> {
    let date = parse_date(&q.date)?;
    let reading = st.refresh_temperatures(date).await;
    Ok(Json(TemperatureResponse { date, reading }))
}

/// GET /api/v1/temperatures
pub async fn get_temperatures(State(st): State<AppState>) -> Json<Session> {
    Json(st.session().await)
}

/// POST /api/v1/predictions?date=YYYY-MM-DD
pub async fn predict(
    State(st): State<AppState>,
    Query(q): Query<DateQuery>,
) -> Result<Json<DailyForecast>, ApiError> {
    let date = parse_date(&q.date)?;
    Ok(Json(st.predict(date).await?))
}

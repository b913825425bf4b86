//! Server-rendered dashboard
//!
//! One page: the calendar profile of the selected date, the displayed
//! temperature series and, on request, the adjusted consumption forecast as a
//! chart and a table. Buttons drive the same session as the JSON API.

use askama::Template;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
};
use chrono::NaiveDate;
use itertools::{Itertools, MinMaxResult};
use serde::Deserialize;
use tracing::error;

use super::error::ApiError;
use super::v1::parse_date;
use crate::controller::{AppState, Session};
use crate::domain::{CalendarProfile, DailyForecast};

const WIDTH: f64 = 720.0;
const HEIGHT: f64 = 280.0;
const MARGIN_LEFT: f64 = 56.0;
const MARGIN_RIGHT: f64 = 16.0;
const MARGIN_TOP: f64 = 16.0;
const MARGIN_BOTTOM: f64 = 36.0;
const Y_TICKS: usize = 5;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub date: Option<String>,
    #[serde(default)]
    pub fetch: bool,
    #[serde(default)]
    pub predict: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone)]
pub struct Tick {
    pub position: f64,
    pub label: String,
}

/// Hour-indexed line chart with precomputed SVG geometry
#[derive(Debug, Clone)]
pub struct LineChart {
    pub y_label: String,
    pub polyline: String,
    pub markers: Vec<Point>,
    pub x_ticks: Vec<Tick>,
    pub y_ticks: Vec<Tick>,
    pub width: f64,
    pub height: f64,
    pub plot_left: f64,
    pub plot_right: f64,
    pub plot_top: f64,
    pub plot_bottom: f64,
}

impl LineChart {
    pub fn hourly(values: &[f64], y_label: &str) -> Self {
        let plot_right = WIDTH - MARGIN_RIGHT;
        let plot_bottom = HEIGHT - MARGIN_BOTTOM;
        let (lo, hi) = match values.iter().copied().minmax_by(f64::total_cmp) {
            MinMaxResult::NoElements => (0.0, 1.0),
            MinMaxResult::OneElement(v) => (v - 1.0, v + 1.0),
            MinMaxResult::MinMax(lo, hi) if hi - lo < f64::EPSILON => (lo - 1.0, hi + 1.0),
            MinMaxResult::MinMax(lo, hi) => (lo, hi),
        };
        let step = (plot_right - MARGIN_LEFT) / (values.len().max(2) - 1) as f64;
        let scale_y = |v: f64| plot_bottom - (v - lo) / (hi - lo) * (plot_bottom - MARGIN_TOP);

        let markers: Vec<Point> = values
            .iter()
            .enumerate()
            .map(|(hour, v)| Point {
                x: MARGIN_LEFT + hour as f64 * step,
                y: scale_y(*v),
            })
            .collect();
        let polyline = markers
            .iter()
            .map(|p| format!("{:.1},{:.1}", p.x, p.y))
            .join(" ");

        let x_ticks = (0..values.len())
            .step_by(3)
            .map(|hour| Tick {
                position: MARGIN_LEFT + hour as f64 * step,
                label: format!("{hour}h"),
            })
            .collect();
        let y_ticks = (0..Y_TICKS)
            .map(|i| {
                let v = lo + (hi - lo) * i as f64 / (Y_TICKS - 1) as f64;
                Tick {
                    position: scale_y(v),
                    label: format!("{v:.1}"),
                }
            })
            .collect();

        Self {
            y_label: y_label.to_string(),
            polyline,
            markers,
            x_ticks,
            y_ticks,
            width: WIDTH,
            height: HEIGHT,
            plot_left: MARGIN_LEFT,
            plot_right,
            plot_top: MARGIN_TOP,
            plot_bottom,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableRow {
    pub hour: String,
    pub temperature: String,
    pub consumption: String,
}

#[derive(Debug, Clone)]
pub struct PredictionView {
    pub title: String,
    pub chart: LineChart,
    pub rows: Vec<TableRow>,
    pub total: String,
    pub peak: String,
}

impl PredictionView {
    pub fn new(forecast: &DailyForecast) -> Self {
        let rows = forecast
            .rows
            .iter()
            .map(|r| TableRow {
                hour: format!("{:02}:00", r.hour),
                temperature: format!("{:.1}", r.temperature_c),
                consumption: format!("{:.2}", r.consumption_mw),
            })
            .collect();
        let peak = forecast
            .peak()
            .map(|r| format!("{:.2} MW à {:02}:00", r.consumption_mw, r.hour))
            .unwrap_or_default();

        Self {
            title: prediction_title(forecast.profile.date, &forecast.profile),
            chart: LineChart::hourly(&forecast.consumption(), "Consommation (MW)"),
            rows,
            total: format!("{:.2}", forecast.total_mwh()),
            peak,
        }
    }
}

pub fn prediction_title(date: NaiveDate, profile: &CalendarProfile) -> String {
    format!(
        "Prédiction consommation pour le {} ({})",
        date.format("%Y-%m-%d"),
        profile.weekday
    )
}

#[derive(Debug, Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub date: String,
    pub weekday: String,
    pub season: String,
    pub profile_label: String,
    pub is_weekend: bool,
    pub is_holiday: bool,
    pub holidays: Vec<String>,
    pub temperature_source: String,
    pub fallback_reason: Option<String>,
    pub temperature_chart: LineChart,
    pub prediction: Option<PredictionView>,
    pub error: Option<String>,
}

impl DashboardTemplate {
    pub fn new(
        profile: &CalendarProfile,
        session: &Session,
        prediction: Option<Result<DailyForecast, ApiError>>,
    ) -> Self {
        let temperature_source = match (&session.fetched_for, &session.fallback) {
            (None, _) => "aucune donnée".to_string(),
            (Some(day), None) => format!("observées ({day})"),
            (Some(day), Some(_)) => format!("synthétiques ({day})"),
        };
        let (prediction, error) = match prediction {
            Some(Ok(forecast)) => (Some(PredictionView::new(&forecast)), None),
            Some(Err(e)) => (None, Some(e.message())),
            None => (None, None),
        };

        Self {
            date: profile.date.format("%Y-%m-%d").to_string(),
            weekday: profile.weekday.capitalized(),
            season: profile.season.to_string(),
            profile_label: profile.profile_label.clone(),
            is_weekend: profile.is_weekend,
            is_holiday: profile.holidays.is_holiday,
            holidays: profile.holiday_names.clone(),
            temperature_source,
            fallback_reason: session.fallback.as_ref().map(ToString::to_string),
            temperature_chart: LineChart::hourly(
                session.temperatures.values(),
                "Température (°C)",
            ),
            prediction,
            error,
        }
    }
}

/// GET / and GET /dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    Query(q): Query<DashboardQuery>,
) -> Result<Response, ApiError> {
    // the form submits an empty field when no date is picked
    let date = match q.date.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => parse_date(raw)?,
        None => chrono::Local::now().date_naive(),
    };

    if q.fetch {
        state.refresh_temperatures(date).await;
    }
    let prediction = if q.predict {
        Some(state.predict(date).await.map_err(ApiError::from))
    } else {
        None
    };

    let profile = state.forecaster.calendar().resolve(date);
    let session = state.session().await;
    let template = DashboardTemplate::new(&profile, &session, prediction);

    match template.render() {
        Ok(html) => Ok(Html(html).into_response()),
        Err(e) => {
            error!(error = %e, "Template render error");
            Err(ApiError::InternalError(e.to_string()))
        }
    }
}

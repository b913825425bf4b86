//! Application state shared by the HTTP handlers
//!
//! The dashboard keeps one `Session`: the temperature series currently on
//! screen. It starts as 24 zeros, is replaced wholesale by each fetch, and is
//! what predictions run on.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::Config;
use crate::domain::{DailyForecast, HourlyTemperatures};
use crate::forecast::{
    build_provider, ConsumptionForecaster, FallbackReason, ForecastError, TemperatureReading,
    TemperatureSource,
};
use crate::ml::ModelRegistry;

/// Temperatures currently displayed, with where they came from
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub temperatures: HourlyTemperatures,
    /// Date the series was fetched for; `None` until the first fetch
    pub fetched_for: Option<NaiveDate>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub fallback: Option<FallbackReason>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            temperatures: HourlyTemperatures::zeros(),
            fetched_for: None,
            fetched_at: None,
            fallback: None,
        }
    }
}

impl Session {
    fn replace(&mut self, date: NaiveDate, reading: TemperatureReading) {
        *self = Self {
            fallback: reading.fallback_reason().cloned(),
            temperatures: reading.into_temperatures(),
            fetched_for: Some(date),
            fetched_at: Some(Utc::now()),
        };
    }
}

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub forecaster: Arc<ConsumptionForecaster>,
    pub temperatures: TemperatureSource,
    session: Arc<RwLock<Session>>,
}

impl AppState {
    pub fn new(cfg: Config) -> Result<Self> {
        let provider = build_provider(&cfg.weather)?;
        let temperatures =
            TemperatureSource::new(provider, cfg.weather.location(), cfg.weather.max_temperature_c);
        let forecaster = ConsumptionForecaster::new(
            cfg.calendar.holiday_calendar(),
            ModelRegistry::new(cfg.models.dir.clone()),
            cfg.adjustment.policy(),
        );

        info!(
            models_dir = %cfg.models.dir.display(),
            available = ?forecaster.models().available(),
            "forecaster ready"
        );

        Ok(Self::from_parts(cfg, forecaster, temperatures))
    }

    pub fn from_parts(
        cfg: Config,
        forecaster: ConsumptionForecaster,
        temperatures: TemperatureSource,
    ) -> Self {
        Self {
            cfg,
            forecaster: Arc::new(forecaster),
            temperatures,
            session: Arc::new(RwLock::new(Session::default())),
        }
    }

    pub async fn session(&self) -> Session {
        self.session.read().await.clone()
    }

    /// Fetch temperatures for `date` and make them the displayed series
    pub async fn refresh_temperatures(&self, date: NaiveDate) -> TemperatureReading {
        let reading = self.temperatures.fetch(date).await;
        self.session.write().await.replace(date, reading.clone());
        reading
    }

    /// Predict `date` with the displayed temperature series
    pub async fn predict(&self, date: NaiveDate) -> Result<DailyForecast, ForecastError> {
        let temperatures = self.session.read().await.temperatures.clone();
        self.forecaster.predict(date, &temperatures)
    }
}

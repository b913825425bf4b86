use chrono::{Datelike, NaiveDate};
use thiserror::Error;
use tracing::{error, info, warn};

use super::{AdjustmentPolicy, FeatureAssembler};
use crate::domain::{DailyForecast, HolidayCalendar, HourlyTemperatures, PredictionRow, Weekday};
use crate::ml::{ModelError, ModelRegistry, Regressor};

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("No model found for {0}")]
    ModelUnavailable(Weekday),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("model returned {0} predictions, expected 24")]
    PredictionCount(usize),
}

/// Calendar resolution, model lookup, feature assembly, inference and adjustment
pub struct ConsumptionForecaster {
    calendar: HolidayCalendar,
    models: ModelRegistry,
    assembler: FeatureAssembler,
    policy: AdjustmentPolicy,
}

impl ConsumptionForecaster {
    pub fn new(calendar: HolidayCalendar, models: ModelRegistry, policy: AdjustmentPolicy) -> Self {
        Self {
            calendar,
            models,
            assembler: FeatureAssembler::new(),
            policy,
        }
    }

    pub fn calendar(&self) -> &HolidayCalendar {
        &self.calendar
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    /// Predict the adjusted hourly consumption of `date`.
    ///
    /// No inference is attempted when the weekday has no artifact. An artifact
    /// that exists but cannot be read or decoded is a `Model` error.
    pub fn predict(
        &self,
        date: NaiveDate,
        temperatures: &HourlyTemperatures,
    ) -> Result<DailyForecast, ForecastError> {
        let weekday = Weekday::from_date(date);
        let model = match self.models.load(weekday) {
            Ok(model) => model,
            Err(ModelError::NotFound { path, .. }) => {
                error!(%weekday, path = %path.display(), "no model artifact");
                return Err(ForecastError::ModelUnavailable(weekday));
            }
            Err(e) => {
                error!(%weekday, error = %e, "model artifact unusable");
                return Err(e.into());
            }
        };

        if !self.calendar.supported_years().any(|y| y == date.year()) {
            warn!(%date, "no variable holiday table for this year, only fixed holidays apply");
        }
        self.predict_with(model.as_ref(), date, temperatures)
    }

    pub fn predict_with(
        &self,
        model: &dyn Regressor,
        date: NaiveDate,
        temperatures: &HourlyTemperatures,
    ) -> Result<DailyForecast, ForecastError> {
        let profile = self.calendar.resolve(date);
        let frame = self
            .assembler
            .assemble(&profile, temperatures, model.feature_names())?;

        let raw = model.predict_batch(&frame)?;
        if raw.len() != temperatures.values().len() {
            return Err(ForecastError::PredictionCount(raw.len()));
        }
        let adjusted = self.policy.apply(&raw);

        let rows: Vec<PredictionRow> = adjusted
            .into_iter()
            .zip(temperatures.values())
            .enumerate()
            .map(|(hour, (consumption_mw, temperature_c))| PredictionRow {
                hour: hour as u32,
                temperature_c: *temperature_c,
                consumption_mw,
            })
            .collect();

        let forecast = DailyForecast {
            profile,
            model_id: model.model_id().to_string(),
            rows,
        };
        info!(
            %date,
            weekday = %forecast.profile.weekday,
            model_id = %forecast.model_id,
            total_mwh = forecast.total_mwh(),
            "consumption forecast ready"
        );
        Ok(forecast)
    }
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::calendar::CalendarProfile;

pub const HOURS_PER_DAY: usize = 24;

#[derive(Debug, Error, PartialEq)]
#[error("expected 24 hourly temperatures, got {0}")]
pub struct SeriesLengthError(pub usize);

/// Temperatures for hours 0..23 of one day, in °C
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct HourlyTemperatures(Vec<f64>);

impl HourlyTemperatures {
    pub fn new(values: Vec<f64>) -> Result<Self, SeriesLengthError> {
        if values.len() != HOURS_PER_DAY {
            return Err(SeriesLengthError(values.len()));
        }
        Ok(Self(values))
    }

    /// Series shown before any temperatures were fetched
    pub fn zeros() -> Self {
        Self(vec![0.0; HOURS_PER_DAY])
    }

    /// Synthetic series used when no observation is available: `25 + (h mod 6)`
    pub fn synthetic() -> Self {
        Self((0..HOURS_PER_DAY).map(|h| 25.0 + (h % 6) as f64).collect())
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn at(&self, hour: usize) -> f64 {
        self.0[hour]
    }
}

impl TryFrom<Vec<f64>> for HourlyTemperatures {
    type Error = SeriesLengthError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<HourlyTemperatures> for Vec<f64> {
    fn from(series: HourlyTemperatures) -> Self {
        series.0
    }
}

/// One hour of the final, adjusted forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub hour: u32,
    pub temperature_c: f64,
    pub consumption_mw: f64,
}

/// Adjusted consumption forecast for a whole day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyForecast {
    pub profile: CalendarProfile,
    pub model_id: String,
    pub rows: Vec<PredictionRow>,
}

impl DailyForecast {
    pub fn consumption(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.consumption_mw).collect()
    }

    pub fn total_mwh(&self) -> f64 {
        self.rows.iter().map(|r| r.consumption_mw).sum()
    }

    /// Hour with the highest consumption
    pub fn peak(&self) -> Option<&PredictionRow> {
        self.rows
            .iter()
            .max_by(|a, b| a.consumption_mw.total_cmp(&b.consumption_mw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_series() {
        let series = HourlyTemperatures::synthetic();
        assert_eq!(series.values().len(), 24);
        assert_eq!(&series.values()[..7], &[25.0, 26.0, 27.0, 28.0, 29.0, 30.0, 25.0]);
        assert_eq!(series.at(23), 30.0);
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert_eq!(HourlyTemperatures::new(vec![1.0; 23]), Err(SeriesLengthError(23)));
        assert!(serde_json::from_str::<HourlyTemperatures>("[1.0, 2.0]").is_err());
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let json = serde_json::to_string(&HourlyTemperatures::zeros()).unwrap();
        assert!(json.starts_with("[0.0,"));
        let back: HourlyTemperatures = serde_json::from_str(&json).unwrap();
        assert_eq!(back, HourlyTemperatures::zeros());
    }
}

//! Hourly temperature observations
//!
//! Two providers can supply the temperatures of a day at a fixed point:
//! the Meteostat JSON API and the Open-Meteo archive API. Whatever happens on
//! the provider side, `TemperatureSource::fetch` always yields exactly 24
//! capped values; failures are absorbed into a synthetic series and reported
//! through `TemperatureReading::Fallback` instead of an error.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{WeatherConfig, WeatherProviderKind};
use crate::domain::{HourlyTemperatures, HOURS_PER_DAY};

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("weather API error: HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("weather response has no `{0}` field")]
    MissingField(&'static str),
}

/// Geographic location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub name: Option<String>,
}

impl GeoLocation {
    pub fn dakar() -> Self {
        Self {
            latitude: 14.7167,
            longitude: -17.4677,
            name: Some("Dakar".to_string()),
        }
    }
}

/// A source of hourly temperature readings for one day (00:00 to 23:00)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TemperatureProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Readings in hour order; `None` where the provider has a gap
    async fn hourly_temperatures(
        &self,
        location: &GeoLocation,
        date: NaiveDate,
    ) -> Result<Vec<Option<f64>>, WeatherError>;
}

fn http_client(timeout: Duration) -> Result<Client, WeatherError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static("daily-load-forecaster/0.1"),
    );
    Ok(Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()?)
}

/// Meteostat JSON API client (`point/hourly`)
pub struct MeteostatClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl MeteostatClient {
    pub fn new(base_url: String, api_key: Option<String>, timeout: Duration) -> Result<Self, WeatherError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url,
            api_key,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MeteostatResponse {
    #[serde(default)]
    data: Vec<serde_json::Map<String, serde_json::Value>>,
}

#[async_trait]
impl TemperatureProvider for MeteostatClient {
    fn name(&self) -> &'static str {
        "meteostat"
    }

    async fn hourly_temperatures(
        &self,
        location: &GeoLocation,
        date: NaiveDate,
    ) -> Result<Vec<Option<f64>>, WeatherError> {
        let url = format!("{}/point/hourly", self.base_url.trim_end_matches('/'));
        let day = date.format("%Y-%m-%d").to_string();
        debug!(%url, %day, "fetching hourly temperatures from Meteostat");

        let mut request = self.client.get(&url).query(&[
            ("lat", location.latitude.to_string()),
            ("lon", location.longitude.to_string()),
            ("start", day.clone()),
            ("end", day),
            ("tz", "UTC".to_string()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header("x-rapidapi-key", key);
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(WeatherError::Status(resp.status()));
        }
        let body: MeteostatResponse = resp.json().await?;

        if body.data.is_empty() {
            return Ok(Vec::new());
        }
        if !body.data.iter().any(|row| row.contains_key("temp")) {
            return Err(WeatherError::MissingField("temp"));
        }
        Ok(body
            .data
            .iter()
            .map(|row| row.get("temp").and_then(serde_json::Value::as_f64))
            .collect())
    }
}

/// Open-Meteo historical archive client (`v1/archive`)
pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, WeatherError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    hourly: Option<OpenMeteoHourly>,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoHourly {
    temperature_2m: Option<Vec<Option<f64>>>,
}

#[async_trait]
impl TemperatureProvider for OpenMeteoClient {
    fn name(&self) -> &'static str {
        "open_meteo"
    }

    async fn hourly_temperatures(
        &self,
        location: &GeoLocation,
        date: NaiveDate,
    ) -> Result<Vec<Option<f64>>, WeatherError> {
        let url = format!("{}/v1/archive", self.base_url.trim_end_matches('/'));
        let day = date.format("%Y-%m-%d").to_string();
        debug!(%url, %day, "fetching hourly temperatures from Open-Meteo");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("start_date", day.clone()),
                ("end_date", day),
                ("hourly", "temperature_2m".to_string()),
                ("timezone", "GMT".to_string()),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(WeatherError::Status(resp.status()));
        }
        let body: OpenMeteoResponse = resp.json().await?;

        body.hourly
            .and_then(|h| h.temperature_2m)
            .ok_or(WeatherError::MissingField("hourly.temperature_2m"))
    }
}

/// Build the provider selected in configuration
pub fn build_provider(cfg: &WeatherConfig) -> Result<Arc<dyn TemperatureProvider>, WeatherError> {
    let timeout = Duration::from_secs(cfg.http_timeout_seconds);
    let provider: Arc<dyn TemperatureProvider> = match cfg.provider {
        WeatherProviderKind::Meteostat => Arc::new(MeteostatClient::new(
            cfg.base_url.clone(),
            cfg.api_key.clone(),
            timeout,
        )?),
        WeatherProviderKind::OpenMeteo => {
            if cfg.api_key.is_some() {
                warn!("weather.api_key is ignored by the open_meteo provider");
            }
            Arc::new(OpenMeteoClient::new(cfg.base_url.clone(), timeout)?)
        }
    };
    Ok(provider)
}

/// Why the synthetic series was used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Transport, HTTP or decoding failure
    Provider(String),
    /// The provider returned no rows
    Empty,
    /// The provider returned rows without any temperature value
    MissingField,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider(e) => write!(f, "provider error: {e}"),
            Self::Empty => write!(f, "provider returned no data"),
            Self::MissingField => write!(f, "provider returned no temperature values"),
        }
    }
}

/// Outcome of a temperature fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum TemperatureReading {
    Observed {
        temperatures: HourlyTemperatures,
    },
    Fallback {
        temperatures: HourlyTemperatures,
        reason: FallbackReason,
    },
}

impl TemperatureReading {
    pub fn temperatures(&self) -> &HourlyTemperatures {
        match self {
            Self::Observed { temperatures } | Self::Fallback { temperatures, .. } => temperatures,
        }
    }

    pub fn into_temperatures(self) -> HourlyTemperatures {
        match self {
            Self::Observed { temperatures } | Self::Fallback { temperatures, .. } => temperatures,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            Self::Fallback { reason, .. } => Some(reason),
            Self::Observed { .. } => None,
        }
    }
}

/// Turn raw provider readings into exactly 24 capped values.
///
/// Gaps take the previous reading (leading gaps the first reading), short
/// series are padded with the last value and long ones truncated.
pub fn normalize_readings(
    readings: &[Option<f64>],
    max_temperature_c: f64,
) -> Result<HourlyTemperatures, FallbackReason> {
    if readings.is_empty() {
        return Err(FallbackReason::Empty);
    }
    let first = readings
        .iter()
        .flatten()
        .next()
        .copied()
        .ok_or(FallbackReason::MissingField)?;

    let mut last = first;
    let mut values: Vec<f64> = readings
        .iter()
        .take(HOURS_PER_DAY)
        .map(|r| {
            if let Some(v) = r {
                last = *v;
            }
            last
        })
        .collect();
    values.resize(HOURS_PER_DAY, last);

    let capped = values.into_iter().map(|t| t.min(max_temperature_c)).collect();
    HourlyTemperatures::new(capped).map_err(|e| FallbackReason::Provider(e.to_string()))
}

/// Temperature series for a day at the configured location, never failing
#[derive(Clone)]
pub struct TemperatureSource {
    provider: Arc<dyn TemperatureProvider>,
    location: GeoLocation,
    max_temperature_c: f64,
}

impl TemperatureSource {
    pub fn new(
        provider: Arc<dyn TemperatureProvider>,
        location: GeoLocation,
        max_temperature_c: f64,
    ) -> Self {
        Self {
            provider,
            location,
            max_temperature_c,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn fetch(&self, date: NaiveDate) -> TemperatureReading {
        let outcome = match self.provider.hourly_temperatures(&self.location, date).await {
            Ok(readings) => normalize_readings(&readings, self.max_temperature_c),
            Err(WeatherError::MissingField(_)) => Err(FallbackReason::MissingField),
            Err(e) => Err(FallbackReason::Provider(e.to_string())),
        };

        match outcome {
            Ok(temperatures) => {
                info!(%date, provider = self.provider.name(), "fetched hourly temperatures");
                TemperatureReading::Observed { temperatures }
            }
            Err(reason) => {
                warn!(%date, provider = self.provider.name(), %reason, "using synthetic temperatures");
                TemperatureReading::Fallback {
                    temperatures: HourlyTemperatures::synthetic(),
                    reason,
                }
            }
        }
    }
}

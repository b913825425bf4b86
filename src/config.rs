use anyhow::{Context, Result};
use chrono::NaiveDate;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::domain::{HolidayCalendar, VariableEvent};
use crate::forecast::{AdjustmentPolicy, GeoLocation, HourlyDiscount};
use crate::telemetry::LogFormat;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub weather: WeatherConfig,
    pub models: ModelsConfig,
    #[serde(default)]
    pub adjustment: AdjustmentConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    60
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherProviderKind {
    Meteostat,
    OpenMeteo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    pub provider: WeatherProviderKind,
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub http_timeout_seconds: u64,
    pub max_temperature_c: f64,
}

impl WeatherConfig {
    pub fn location(&self) -> GeoLocation {
        GeoLocation {
            latitude: self.latitude,
            longitude: self.longitude,
            name: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdjustmentConfig {
    pub growth_rate: f64,
    pub rules: Vec<HourlyDiscount>,
}

impl Default for AdjustmentConfig {
    fn default() -> Self {
        let policy = AdjustmentPolicy::default();
        Self {
            growth_rate: policy.growth_rate,
            rules: policy.rules,
        }
    }
}

impl AdjustmentConfig {
    pub fn policy(&self) -> AdjustmentPolicy {
        AdjustmentPolicy {
            growth_rate: self.growth_rate,
            rules: self.rules.clone(),
        }
    }
}

/// Variable holiday date for a year missing from (or corrected in) the built-in table
#[derive(Debug, Clone, Deserialize)]
pub struct ExtraHoliday {
    pub event: VariableEvent,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarConfig {
    #[serde(default)]
    pub extra_holidays: Vec<ExtraHoliday>,
}

impl CalendarConfig {
    pub fn holiday_calendar(&self) -> HolidayCalendar {
        let mut calendar = HolidayCalendar::default();
        for extra in &self.extra_holidays {
            calendar.set_variable(extra.event, extra.date);
        }
        calendar
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from("config/default.toml")
    }

    /// Load a TOML file overridden by `FORECAST__SECTION__KEY` environment variables
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("FORECAST__").split("__"));
        let cfg: Config = figment
            .extract()
            .with_context(|| format!("loading configuration from {}", path.as_ref().display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.weather.http_timeout_seconds == 0 {
            anyhow::bail!("weather.http_timeout_seconds must be positive");
        }
        if self.server.request_timeout_secs == 0 {
            anyhow::bail!("server.request_timeout_secs must be positive");
        }
        if !(-90.0..=90.0).contains(&self.weather.latitude)
            || !(-180.0..=180.0).contains(&self.weather.longitude)
        {
            anyhow::bail!("weather location is out of range");
        }
        if self.adjustment.growth_rate <= -1.0 {
            anyhow::bail!("adjustment.growth_rate must be greater than -1");
        }
        for rule in &self.adjustment.rules {
            if rule.factor < 0.0 {
                anyhow::bail!("adjustment factor {} is negative", rule.factor);
            }
            if let Some(hour) = rule.hours.iter().find(|h| **h > 23) {
                anyhow::bail!("adjustment hour {hour} is outside 0..23");
            }
        }
        Ok(())
    }
}

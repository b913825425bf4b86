//! Hourly electricity consumption forecasting for one calendar day in Dakar.
//!
//! Per-weekday random-forest models are fed a 24-row feature table built from
//! the date (season, weekday profile, holidays) and hourly temperatures, then
//! the raw output is scaled by a growth factor and hourly discounts.

pub mod api;
pub mod config;
pub mod controller;
pub mod domain;
pub mod forecast;
pub mod ml;
pub mod telemetry;

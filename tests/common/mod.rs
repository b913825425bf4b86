#![allow(dead_code)]

use std::path::Path;

use daily_load_forecaster::config::{
    Config, ModelsConfig, ServerConfig, WeatherConfig, WeatherProviderKind,
};
use daily_load_forecaster::ml::{ModelMetadata, RandomForest};
use smartcore::ensemble::random_forest_regressor::RandomForestRegressorParameters;

pub const DAKAR_LAT: &str = "14.7167";
pub const DAKAR_LON: &str = "-17.4677";

pub fn test_config(provider: WeatherProviderKind, base_url: &str, models_dir: &Path) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            request_timeout_secs: 10,
        },
        weather: WeatherConfig {
            provider,
            base_url: base_url.to_string(),
            api_key: None,
            latitude: 14.7167,
            longitude: -17.4677,
            http_timeout_seconds: 5,
            max_temperature_c: 35.0,
        },
        models: ModelsConfig {
            dir: models_dir.to_path_buf(),
        },
        adjustment: Default::default(),
        calendar: Default::default(),
        logging: Default::default(),
    }
}

/// Write a forest fitted on constant targets, so it predicts `value` for every hour
pub fn write_constant_model(dir: &Path, weekday: &str, value: f64) {
    let rows: Vec<Vec<f64>> = (0..24).map(|h| vec![h as f64, 25.0]).collect();
    let forest = RandomForest::fit(
        ModelMetadata::new(
            format!("rf_{weekday}"),
            vec!["hour".to_string(), "temperature".to_string()],
        ),
        &rows,
        &[value; 24],
        RandomForestRegressorParameters {
            n_trees: 3,
            ..Default::default()
        },
    )
    .unwrap();
    write_artifact(dir, weekday, &forest.to_json().unwrap());
}

pub fn write_artifact(dir: &Path, weekday: &str, bytes: &[u8]) {
    let path = dir.join(format!("random_forest_{weekday}.json"));
    std::fs::write(path, bytes).unwrap();
}

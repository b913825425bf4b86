//! Machine Learning Module
//!
//! Pre-trained per-weekday consumption models and the tabular input they
//! consume:
//! - `FeatureFrame`: named columns, one row per hour
//! - `ModelMetadata`: identity and input schema stored with each artifact
//! - `models`: the `Regressor` trait and the smartcore random-forest artifact
//! - `registry`: artifact resolution and the process-lifetime model cache
//!
//! Training happens offline; this crate only loads and evaluates artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::Weekday;

pub mod models;
pub mod registry;

pub use models::*;
pub use registry::*;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("No model found for {weekday} ({})", path.display())]
    NotFound { weekday: Weekday, path: PathBuf },

    #[error("Failed to read model artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid model artifact {}: {reason}", path.display())]
    InvalidArtifact { path: PathBuf, reason: String },

    #[error("Feature mismatch: {0}")]
    FeatureMismatch(String),

    #[error("Malformed feature frame: {0}")]
    Frame(String),

    #[error("Model training failed: {0}")]
    Training(String),

    #[error("Model inference failed: {0}")]
    Inference(String),
}

/// Model Metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_id: String,
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub training_samples: Option<usize>,
    /// Exact column order the model was fitted on
    pub feature_names: Vec<String>,
}

impl ModelMetadata {
    pub fn new(model_id: impl Into<String>, feature_names: Vec<String>) -> Self {
        Self {
            model_id: model_id.into(),
            trained_at: Some(Utc::now()),
            training_samples: None,
            feature_names,
        }
    }
}

/// Table of model inputs: named columns, one row per sample
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureFrame {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, ModelError> {
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(ModelError::Frame(format!(
                "row {} has {} values for {} columns",
                i,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Caller guarantees every row has one value per column
    pub(crate) fn from_aligned(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }

    pub fn value(&self, row: usize, name: &str) -> Option<f64> {
        let idx = self.column_index(name)?;
        self.rows.get(row).map(|r| r[idx])
    }
}

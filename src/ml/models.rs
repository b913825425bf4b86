//! ML Model Definitions
//!
//! The serving side of the per-weekday consumption models. An artifact is a
//! smartcore `RandomForestRegressor` serialized with serde, next to the
//! metadata the serving side needs to build its input.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

use super::{FeatureFrame, ModelError, ModelMetadata};

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Trait for trained regressors
pub trait Regressor: Send + Sync {
    fn model_id(&self) -> &str;

    /// Ordered feature names the model was trained on
    fn feature_names(&self) -> &[String];

    /// Predict one value per frame row, in row order
    fn predict_batch(&self, frame: &FeatureFrame) -> Result<Vec<f64>, ModelError>;
}

/// Random forest regressor artifact
#[derive(Debug, Serialize, Deserialize)]
pub struct RandomForest {
    pub metadata: ModelMetadata,
    forest: Forest,
}

impl RandomForest {
    /// Fit a forest on `rows`, one target per row. Production artifacts are
    /// fitted offline; this builds fixtures and re-exports.
    pub fn fit(
        metadata: ModelMetadata,
        rows: &[Vec<f64>],
        targets: &[f64],
        params: RandomForestRegressorParameters,
    ) -> Result<Self, ModelError> {
        if metadata.feature_names.is_empty() {
            return Err(ModelError::Training("no feature names".to_string()));
        }
        if rows.is_empty() || rows.len() != targets.len() {
            return Err(ModelError::Training(format!(
                "{} rows for {} targets",
                rows.len(),
                targets.len()
            )));
        }
        let frame = FeatureFrame::new(metadata.feature_names.clone(), rows.to_vec())?;
        let x = to_matrix(&frame);
        let forest = RandomForestRegressor::fit(&x, &targets.to_vec(), params)
            .map_err(|e| ModelError::Training(e.to_string()))?;

        Ok(Self {
            metadata: ModelMetadata {
                training_samples: Some(rows.len()),
                ..metadata
            },
            forest,
        })
    }

    /// Decode and validate a JSON artifact
    pub fn from_json(bytes: &[u8]) -> Result<Self, String> {
        let raw: Value = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        let n_features = raw
            .pointer("/metadata/feature_names")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        if n_features == 0 {
            return Err("metadata lists no feature names".to_string());
        }
        if let Some(feature) = max_split_feature(&raw) {
            if feature >= n_features {
                return Err(format!(
                    "forest splits on feature {feature}, metadata lists {n_features}"
                ));
            }
        }
        serde_json::from_value(raw).map_err(|e| e.to_string())
    }

    pub fn to_json(&self) -> Result<Vec<u8>, ModelError> {
        serde_json::to_vec(self).map_err(|e| ModelError::Training(e.to_string()))
    }
}

/// Row-major copy of the frame, one matrix row per frame row
fn to_matrix(frame: &FeatureFrame) -> DenseMatrix<f64> {
    let flat: Vec<f64> = frame.rows().iter().flatten().copied().collect();
    DenseMatrix::new(frame.n_rows(), frame.columns().len(), flat, false)
}

/// Highest feature index any split node of the serialized forest reads
fn max_split_feature(value: &Value) -> Option<usize> {
    match value {
        Value::Object(map) => {
            let own = match (map.get("split_feature"), map.get("split_value")) {
                (Some(feature), Some(split)) if !split.is_null() => {
                    feature.as_u64().map(|f| f as usize)
                }
                _ => None,
            };
            map.values().filter_map(max_split_feature).chain(own).max()
        }
        Value::Array(items) => items.iter().filter_map(max_split_feature).max(),
        _ => None,
    }
}

impl Regressor for RandomForest {
    fn model_id(&self) -> &str {
        &self.metadata.model_id
    }

    fn feature_names(&self) -> &[String] {
        &self.metadata.feature_names
    }

    fn predict_batch(&self, frame: &FeatureFrame) -> Result<Vec<f64>, ModelError> {
        if frame.columns() != self.metadata.feature_names.as_slice() {
            return Err(ModelError::FeatureMismatch(format!(
                "model {} expects {} columns {:?}, frame has {:?}",
                self.metadata.model_id,
                self.metadata.feature_names.len(),
                self.metadata.feature_names,
                frame.columns()
            )));
        }
        if frame.n_rows() == 0 {
            return Ok(Vec::new());
        }

        let x = to_matrix(frame);
        self.forest
            .predict(&x)
            .map_err(|e| ModelError::Inference(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) fn constant_forest(model_id: &str, feature_names: Vec<String>, value: f64) -> RandomForest {
    let rows: Vec<Vec<f64>> = (0..24)
        .map(|h| vec![h as f64; feature_names.len()])
        .collect();
    RandomForest::fit(
        ModelMetadata::new(model_id, feature_names),
        &rows,
        &[value; 24],
        RandomForestRegressorParameters {
            n_trees: 3,
            ..Default::default()
        },
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// Two plateaus: hours before noon at 100, after at 300. Temperature is constant.
    fn step_forest() -> RandomForest {
        let rows: Vec<Vec<f64>> = (0..48).map(|i| vec![25.0, (i % 24) as f64]).collect();
        let targets: Vec<f64> = rows
            .iter()
            .map(|r| if r[1] < 12.0 { 100.0 } else { 300.0 })
            .collect();
        let params = RandomForestRegressorParameters {
            max_depth: None,
            min_samples_leaf: 1,
            min_samples_split: 2,
            n_trees: 10,
            m: Some(2),
            keep_samples: false,
            seed: 7,
        };
        RandomForest::fit(
            ModelMetadata::new("rf_step", names(&["temperature", "hour"])),
            &rows,
            &targets,
            params,
        )
        .unwrap()
    }

    #[test]
    fn test_forest_learns_step() {
        let forest = step_forest();
        assert_eq!(forest.metadata.training_samples, Some(48));

        let frame = FeatureFrame::new(
            names(&["temperature", "hour"]),
            vec![vec![25.0, 2.0], vec![25.0, 20.0]],
        )
        .unwrap();
        let out = forest.predict_batch(&frame).unwrap();

        assert_eq!(out.len(), 2);
        assert!(out[0] < 200.0, "morning: {}", out[0]);
        assert!(out[1] > 200.0, "evening: {}", out[1]);
    }

    #[test]
    fn test_constant_forest() {
        let forest = constant_forest("flat", names(&["hour"]), 100.0);
        let rows = (0..24).map(|h| vec![h as f64]).collect();
        let frame = FeatureFrame::new(names(&["hour"]), rows).unwrap();
        let out = forest.predict_batch(&frame).unwrap();
        assert!(out.iter().all(|v| (v - 100.0).abs() < 1e-9));
    }

    #[test]
    fn test_rejects_column_mismatch() {
        let forest = constant_forest("flat", names(&["hour", "month"]), 1.0);
        let frame = FeatureFrame::new(names(&["month", "hour"]), vec![vec![1.0, 2.0]]).unwrap();
        assert!(matches!(
            forest.predict_batch(&frame),
            Err(ModelError::FeatureMismatch(_))
        ));
    }

    #[test]
    fn test_json_artifact_keeps_predictions() {
        let forest = step_forest();
        let bytes = forest.to_json().unwrap();
        let restored = RandomForest::from_json(&bytes).unwrap();

        assert_eq!(restored.model_id(), "rf_step");
        assert_eq!(restored.feature_names(), &names(&["temperature", "hour"])[..]);

        let frame = FeatureFrame::new(
            names(&["temperature", "hour"]),
            (0..24).map(|h| vec![25.0, h as f64]).collect(),
        )
        .unwrap();
        assert_eq!(
            restored.predict_batch(&frame).unwrap(),
            forest.predict_batch(&frame).unwrap()
        );
    }

    #[test]
    fn test_rejects_metadata_narrower_than_forest() {
        let bytes = step_forest().to_json().unwrap();
        let mut raw: Value = serde_json::from_slice(&bytes).unwrap();
        raw["metadata"]["feature_names"] = serde_json::json!(["temperature"]);
        let narrowed = serde_json::to_vec(&raw).unwrap();

        let err = RandomForest::from_json(&narrowed).unwrap_err();
        assert!(err.contains("metadata lists 1"), "{err}");
    }

    #[test]
    fn test_rejects_malformed_artifacts() {
        assert!(RandomForest::from_json(b"{ not json").is_err());
        assert_eq!(
            RandomForest::from_json(br#"{"metadata": {"model_id": "x", "feature_names": []}}"#)
                .unwrap_err(),
            "metadata lists no feature names"
        );
        assert!(RandomForest::from_json(
            br#"{"metadata": {"model_id": "x", "feature_names": ["hour"]}, "forest": 3}"#
        )
        .is_err());
    }

    #[test]
    fn test_fit_rejects_mismatched_targets() {
        let err = RandomForest::fit(
            ModelMetadata::new("bad", names(&["hour"])),
            &[vec![1.0], vec![2.0]],
            &[1.0],
            RandomForestRegressorParameters::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ModelError::Training(_)));
    }
}

//! Model Registry
//!
//! Resolves the artifact for a weekday, decodes it and keeps it for the
//! lifetime of the process. Only successful loads are cached, so an artifact
//! added after a failed lookup is picked up on the next request.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::{ModelError, RandomForest, Regressor};
use crate::domain::Weekday;

/// Storage access for model artifacts
#[cfg_attr(test, mockall::automock)]
pub trait ArtifactReader: Send + Sync {
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;

    fn exists(&self, path: &Path) -> bool;
}

/// Reads artifacts from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsArtifactReader;

impl ArtifactReader for FsArtifactReader {
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

pub struct ModelRegistry {
    dir: PathBuf,
    reader: Box<dyn ArtifactReader>,
    models: RwLock<HashMap<Weekday, Arc<dyn Regressor>>>,
}

impl ModelRegistry {
    /// Registry over a directory on the local filesystem
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_reader(dir, FsArtifactReader)
    }

    pub fn with_reader(dir: impl Into<PathBuf>, reader: impl ArtifactReader + 'static) -> Self {
        Self {
            dir: dir.into(),
            reader: Box::new(reader),
            models: RwLock::new(HashMap::new()),
        }
    }

    /// `<dir>/random_forest_<weekday>.json`
    pub fn artifact_path(&self, weekday: Weekday) -> PathBuf {
        self.dir.join(format!("random_forest_{weekday}.json"))
    }

    /// Load the model for a weekday, reading storage only on the first success
    pub fn load(&self, weekday: Weekday) -> Result<Arc<dyn Regressor>, ModelError> {
        if let Some(model) = self.models.read().get(&weekday) {
            debug!(%weekday, "model cache hit");
            return Ok(Arc::clone(model));
        }

        let path = self.artifact_path(weekday);
        let bytes = self.reader.read(&path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                ModelError::NotFound {
                    weekday,
                    path: path.clone(),
                }
            } else {
                ModelError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        let forest = RandomForest::from_json(&bytes).map_err(|reason| ModelError::InvalidArtifact {
            path: path.clone(),
            reason,
        })?;

        info!(
            %weekday,
            model_id = %forest.metadata.model_id,
            trained_at = ?forest.metadata.trained_at,
            features = forest.metadata.feature_names.len(),
            "loaded model artifact"
        );

        let model: Arc<dyn Regressor> = Arc::new(forest);
        let mut models = self.models.write();
        Ok(Arc::clone(models.entry(weekday).or_insert(model)))
    }

    /// Weekdays that have an artifact in storage
    pub fn available(&self) -> Vec<Weekday> {
        Weekday::ALL
            .into_iter()
            .filter(|w| self.reader.exists(&self.artifact_path(*w)))
            .collect()
    }

    pub fn cached_count(&self) -> usize {
        self.models.read().len()
    }
}

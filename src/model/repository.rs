//! Storage for the single persisted model slot.
//!
//! A slot holds two records: the weights and a small info record. The info
//! record is written last and is what `exists` checks, so a slot whose save
//! was interrupted reads as empty rather than half-written.

use super::network::{Architecture, ModelWeights, RegressionModel};
use super::ModelError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Fixed logical identity of the persisted model.
pub const MODEL_KEY: &str = "model";

/// Summary persisted next to the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub architecture: Architecture,
    pub trained_at: DateTime<Utc>,
    pub epochs: usize,
    pub final_loss: f64,
    pub final_mae: f64,
    /// Crate version that produced the weights.
    pub version: String,
}

#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait ModelRepository: Send + Sync {
    /// Whether a complete model is persisted.
    async fn exists(&self) -> Result<bool, ModelError>;

    async fn load_info(&self) -> Result<Option<ModelInfo>, ModelError>;

    /// Load the persisted model, uncompiled.
    async fn load(&self) -> Result<RegressionModel, ModelError>;

    async fn save(&self, model: &RegressionModel, info: &ModelInfo) -> Result<(), ModelError>;
}

/// Keeps `model.json` and `model.info.json` in a directory.
pub struct FileModelRepository {
    dir: PathBuf,
}

impl FileModelRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn weights_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", MODEL_KEY))
    }

    pub fn info_path(&self) -> PathBuf {
        self.dir.join(format!("{}.info.json", MODEL_KEY))
    }

    async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ModelError> {
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl ModelRepository for FileModelRepository {
    async fn exists(&self) -> Result<bool, ModelError> {
        Ok(tokio::fs::try_exists(self.info_path()).await?)
    }

    async fn load_info(&self) -> Result<Option<ModelInfo>, ModelError> {
        let bytes = match tokio::fs::read(self.info_path()).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ModelError::Corrupted(format!("model info: {}", e)))
    }

    async fn load(&self) -> Result<RegressionModel, ModelError> {
        let path = self.weights_path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ModelError::NotFound)
            }
            Err(e) => return Err(e.into()),
        };
        let weights: ModelWeights = serde_json::from_slice(&bytes)
            .map_err(|e| ModelError::Corrupted(format!("weights: {}", e)))?;
        debug!(path = %path.display(), "Loaded model weights");
        RegressionModel::from_weights(weights)
    }

    async fn save(&self, model: &RegressionModel, info: &ModelInfo) -> Result<(), ModelError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let weights = serde_json::to_vec(&model.to_weights())?;
        Self::write_atomic(&self.weights_path(), &weights).await?;

        let info_bytes = serde_json::to_vec_pretty(info)?;
        Self::write_atomic(&self.info_path(), &info_bytes).await?;

        info!(dir = %self.dir.display(), key = MODEL_KEY, "Saved model");
        Ok(())
    }
}

/// Process-local repository. Stores the serialized form so loads behave
/// like a round trip through storage.
#[derive(Default)]
pub struct InMemoryModelRepository {
    slot: Mutex<Option<(String, ModelInfo)>>,
}

impl InMemoryModelRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelRepository for InMemoryModelRepository {
    async fn exists(&self) -> Result<bool, ModelError> {
        Ok(self.slot.lock().await.is_some())
    }

    async fn load_info(&self) -> Result<Option<ModelInfo>, ModelError> {
        Ok(self.slot.lock().await.as_ref().map(|(_, info)| info.clone()))
    }

    async fn load(&self) -> Result<RegressionModel, ModelError> {
        let slot = self.slot.lock().await;
        let (json, _) = slot.as_ref().ok_or(ModelError::NotFound)?;
        let weights: ModelWeights = serde_json::from_str(json)?;
        RegressionModel::from_weights(weights)
    }

    async fn save(&self, model: &RegressionModel, info: &ModelInfo) -> Result<(), ModelError> {
        let json = serde_json::to_string(&model.to_weights())?;
        *self.slot.lock().await = Some((json, info.clone()));
        Ok(())
    }
}

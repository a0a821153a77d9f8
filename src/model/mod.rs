//! The mood regression network and its persistence.

mod network;
mod optimizer;
mod repository;

pub use network::{
    Activation, Architecture, CompileOptions, DenseLayer, EpochMetrics, FitOptions,
    ModelWeights, RegressionModel,
};
pub use repository::{
    FileModelRepository, InMemoryModelRepository, ModelInfo, ModelRepository, MODEL_KEY,
};

#[cfg(feature = "mock")]
pub use repository::MockModelRepository;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("No persisted model")]
    NotFound,

    #[error("Persisted model is corrupted: {0}")]
    Corrupted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Model must be compiled before training")]
    NotCompiled,

    #[error("Expected input width {expected}, got {found}")]
    InputWidth { expected: usize, found: usize },

    #[error("Training rows do not line up: {inputs} inputs, {targets} targets")]
    ShapeMismatch { inputs: usize, targets: usize },

    #[error("No training rows")]
    EmptyTrainingSet,

    #[error("Loss diverged at epoch {epoch}")]
    Diverged { epoch: usize },
}

//! Training of the mood regression model from a dataset.

mod pipeline;
mod set;

pub use pipeline::{TrainingEvent, TrainingPipeline, TrainingReport};
pub use set::{CuratedLabels, TrainingPlan, TrainingSet};

use crate::dataset::DatasetError;
use crate::model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(
        "Dataset has {rows} rows, expected {categories} or {categories} x {replication}"
    )]
    DatasetShape {
        rows: usize,
        categories: usize,
        replication: usize,
    },

    #[error("Training inputs and outputs differ in length: {inputs} inputs, {outputs} outputs")]
    ShapeMismatch { inputs: usize, outputs: usize },

    #[error("Training set is empty")]
    Empty,

    #[error("Curated encoding for slot {slot} has no category rows to label it")]
    CuratedWithoutCategory { slot: usize },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Training task failed: {0}")]
    Interrupted(String),
}

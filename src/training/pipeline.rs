use super::set::{CuratedLabels, TrainingPlan, TrainingSet};
use super::TrainingError;
use crate::config::TrainingSettings;
use crate::dataset::DatasetLoader;
use crate::model::{
    Architecture, CompileOptions, EpochMetrics, FitOptions, ModelInfo, ModelRepository,
    RegressionModel,
};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// Progress of a training run, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrainingEvent {
    Started {
        examples: usize,
        epochs: usize,
        fresh_model: bool,
    },
    Epoch(EpochMetrics),
    Completed {
        final_loss: f64,
        final_mae: f64,
    },
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub examples: usize,
    pub fresh_model: bool,
    pub epochs: Vec<EpochMetrics>,
    pub info: ModelInfo,
}

impl TrainingReport {
    pub fn final_metrics(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }
}

pub struct TrainingPipeline {
    repository: Arc<dyn ModelRepository>,
    settings: TrainingSettings,
    progress: Option<UnboundedSender<TrainingEvent>>,
}

impl TrainingPipeline {
    pub fn new(repository: Arc<dyn ModelRepository>, settings: TrainingSettings) -> Self {
        Self {
            repository,
            settings,
            progress: None,
        }
    }

    /// Send every [`TrainingEvent`] to `sender`.
    pub fn with_progress(mut self, sender: UnboundedSender<TrainingEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn settings(&self) -> &TrainingSettings {
        &self.settings
    }

    /// The plan used by [`TrainingPipeline::run`]: every joint slot, plus
    /// the curated pairings when enabled.
    pub fn default_plan(&self) -> TrainingPlan {
        let plan = TrainingPlan::identity(self.settings.replication);
        if self.settings.include_curated {
            plan.with_curated(CuratedLabels::Resample)
        } else {
            plan
        }
    }

    /// Load `dataset_name`, assemble the default plan and train on it.
    pub async fn run(
        &self,
        loader: &DatasetLoader,
        dataset_name: &str,
    ) -> Result<TrainingReport, TrainingError> {
        let dataset = loader.load(dataset_name).await?;
        let set = TrainingSet::assemble(&dataset, &self.default_plan())?;
        self.train(set).await
    }

    /// Fit the persisted model (or a fresh one) on `set` and persist it.
    /// Nothing is saved when any step fails.
    pub async fn train(&self, set: TrainingSet) -> Result<TrainingReport, TrainingError> {
        let mut rng = match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let (mut model, fresh_model) = self.prepare_model(&mut rng).await?;

        let examples = set.len();
        info!(
            examples,
            epochs = self.settings.epochs,
            fresh_model,
            architecture = %model.architecture(),
            "Starting training"
        );
        self.emit(TrainingEvent::Started {
            examples,
            epochs: self.settings.epochs,
            fresh_model,
        });

        let options = FitOptions {
            epochs: self.settings.epochs,
            batch_size: self.settings.batch_size,
            validation_split: self.settings.validation_split,
        };
        let progress = self.progress.clone();
        let (model, history) = tokio::task::spawn_blocking(move || {
            let history = model.fit(set.inputs(), set.targets(), &options, &mut rng, |metrics| {
                debug!(
                    epoch = metrics.epoch,
                    loss = metrics.loss,
                    mae = metrics.mae,
                    val_loss = ?metrics.val_loss,
                    "Epoch finished"
                );
                if let Some(tx) = &progress {
                    let _ = tx.send(TrainingEvent::Epoch(*metrics));
                }
            });
            (model, history)
        })
        .await
        .map_err(|e| TrainingError::Interrupted(e.to_string()))?;
        let history = history?;

        let last = history.last().copied().ok_or(TrainingError::Empty)?;
        let info = ModelInfo {
            architecture: model.architecture().clone(),
            trained_at: Utc::now(),
            epochs: history.len(),
            final_loss: last.loss,
            final_mae: last.mae,
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        self.repository.save(&model, &info).await?;

        info!(
            final_loss = last.loss,
            final_mae = last.mae,
            "Training complete, model saved"
        );
        self.emit(TrainingEvent::Completed {
            final_loss: last.loss,
            final_mae: last.mae,
        });

        Ok(TrainingReport {
            examples,
            fresh_model,
            epochs: history,
            info,
        })
    }

    /// Load and recompile the persisted model, or build a fresh one when
    /// nothing is persisted. A persisted but unreadable model is an error.
    async fn prepare_model(
        &self,
        rng: &mut StdRng,
    ) -> Result<(RegressionModel, bool), TrainingError> {
        let compile = CompileOptions {
            learning_rate: self.settings.learning_rate,
            ..CompileOptions::default()
        };

        let (mut model, fresh) = match self.repository.load_info().await? {
            Some(info) => {
                debug!(trained_at = %info.trained_at, "Continuing from persisted model");
                let model = self.repository.load().await?;
                if *model.architecture() != Architecture::mood_regressor() {
                    warn!(
                        architecture = %model.architecture(),
                        "Persisted model has an unexpected architecture"
                    );
                }
                (model, false)
            }
            None => {
                info!("No persisted model, building a fresh one");
                (RegressionModel::build(Architecture::mood_regressor(), rng), true)
            }
        };
        model.compile(compile);
        Ok((model, fresh))
    }

    fn emit(&self, event: TrainingEvent) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(event);
        }
    }
}

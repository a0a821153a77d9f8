//! Inference: encoded mood in, post-processed audio features out.

use crate::config::PredictionSettings;
use crate::features::{AudioFeature, AudioFeatureVector, NormalizedFeatureVector};
use crate::model::{ModelError, ModelRepository};
use crate::mood::CombinedEncoding;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[source] ModelError),

    #[error("Inference failed: {0}")]
    Inference(#[source] ModelError),

    #[error("Invalid noise standard deviation {0}")]
    InvalidNoise(f64),
}

/// Round the discrete features, then force every feature except loudness
/// to be non-negative.
pub fn post_process(raw: AudioFeatureVector) -> AudioFeatureVector {
    let mut out = raw;
    for feature in [AudioFeature::Key, AudioFeature::TimeSignature, AudioFeature::Mode] {
        out.set(feature, out.get(feature).round());
    }
    for feature in AudioFeature::ALL {
        if feature != AudioFeature::Loudness {
            out.set(feature, out.get(feature).abs());
        }
    }
    out
}

pub struct PredictionService {
    repository: Arc<dyn ModelRepository>,
    noise: Option<Normal<f64>>,
    rng: Mutex<StdRng>,
}

impl PredictionService {
    pub fn new(
        repository: Arc<dyn ModelRepository>,
        settings: &PredictionSettings,
    ) -> Result<Self, PredictionError> {
        let std_dev = settings.noise_std_dev;
        let noise = if std_dev == 0.0 {
            None
        } else if std_dev.is_finite() && std_dev > 0.0 {
            Some(Normal::new(0.0, std_dev).map_err(|_| PredictionError::InvalidNoise(std_dev))?)
        } else {
            return Err(PredictionError::InvalidNoise(std_dev));
        };
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            repository,
            noise,
            rng: Mutex::new(rng),
        })
    }

    /// Predict the audio features for one encoded mood.
    pub async fn predict(
        &self,
        encoding: &CombinedEncoding,
    ) -> Result<AudioFeatureVector, PredictionError> {
        let model = self
            .repository
            .load()
            .await
            .map_err(PredictionError::ModelUnavailable)?;
        let output = model
            .predict(&encoding.to_array())
            .map_err(PredictionError::Inference)?;

        let mut normalized = NormalizedFeatureVector::default();
        {
            let mut rng = self.rng.lock().await;
            for (i, value) in output.iter().enumerate() {
                let jitter = match &self.noise {
                    Some(normal) => normal.sample(&mut *rng),
                    None => 0.0,
                };
                normalized.0[i] = *value as f64 + jitter;
            }
        }

        let features = post_process(normalized.denormalize());
        debug!(slot = encoding.hot_index(), "Predicted audio features");
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Architecture, InMemoryModelRepository, ModelInfo, RegressionModel};
    use crate::mood::{combine, Emotion, Event, Genre};
    use chrono::Utc;

    async fn repository_with_model() -> Arc<InMemoryModelRepository> {
        let repository = Arc::new(InMemoryModelRepository::new());
        let mut rng = StdRng::seed_from_u64(5);
        let model = RegressionModel::build(Architecture::mood_regressor(), &mut rng);
        let info = ModelInfo {
            architecture: Architecture::mood_regressor(),
            trained_at: Utc::now(),
            epochs: 0,
            final_loss: 0.0,
            final_mae: 0.0,
            version: "test".to_string(),
        };
        repository.save(&model, &info).await.unwrap();
        repository
    }

    fn quiet() -> PredictionSettings {
        PredictionSettings {
            noise_std_dev: 0.0,
            seed: Some(1),
        }
    }

    #[test]
    fn test_post_process_rules() {
        let raw = AudioFeatureVector([
            -0.2, 0.3, -0.9, 0.0, 4.6, -0.01, -12.5, 0.49, 0.1, -120.0, 3.5, 1.2,
        ]);
        let out = post_process(raw);
        assert_eq!(out.get(AudioFeature::Acousticness), 0.2);
        assert_eq!(out.get(AudioFeature::Energy), 0.9);
        assert_eq!(out.get(AudioFeature::Key), 5.0);
        assert_eq!(out.get(AudioFeature::Liveness), 0.01);
        assert_eq!(out.get(AudioFeature::Loudness), -12.5);
        assert_eq!(out.get(AudioFeature::Mode), 0.0);
        assert_eq!(out.get(AudioFeature::Tempo), 120.0);
        assert_eq!(out.get(AudioFeature::TimeSignature), 4.0);
        assert_eq!(out.get(AudioFeature::Valence), 1.2);
    }

    #[test]
    fn test_post_process_rounds_before_abs() {
        let raw = AudioFeatureVector([0.0, 0.0, 0.0, 0.0, -0.6, 0.0, 0.0, -0.4, 0.0, 0.0, 0.0, 0.0]);
        let out = post_process(raw);
        assert_eq!(out.get(AudioFeature::Key), 1.0);
        assert_eq!(out.get(AudioFeature::Mode), 0.0);
    }

    #[test]
    fn test_post_process_invariants_over_many_vectors() {
        let mut rng = StdRng::seed_from_u64(3);
        let spread = Normal::new(0.0, 50.0).unwrap();
        for _ in 0..1000 {
            let mut values = [0.0; 12];
            for v in values.iter_mut() {
                *v = spread.sample(&mut rng);
            }
            let out = post_process(AudioFeatureVector(values));
            for (feature, value) in out.iter() {
                if feature != AudioFeature::Loudness {
                    assert!(value >= 0.0, "{} is {}", feature, value);
                }
                if feature.is_discrete() {
                    assert_eq!(value.fract(), 0.0, "{} is {}", feature, value);
                }
            }
        }
    }

    #[test]
    fn test_invalid_noise() {
        let repository = Arc::new(InMemoryModelRepository::new());
        let settings = PredictionSettings {
            noise_std_dev: -1.0,
            seed: None,
        };
        assert!(matches!(
            PredictionService::new(repository, &settings),
            Err(PredictionError::InvalidNoise(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_model_is_unavailable() {
        let service =
            PredictionService::new(Arc::new(InMemoryModelRepository::new()), &quiet()).unwrap();
        let encoding = combine(Emotion::Happy, Event::None, Genre::None);
        let err = service.predict(&encoding).await.unwrap_err();
        assert!(matches!(
            err,
            PredictionError::ModelUnavailable(ModelError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_noise_free_prediction_is_deterministic() {
        let service = PredictionService::new(repository_with_model().await, &quiet()).unwrap();
        let encoding = combine(Emotion::Calm, Event::Study, Genre::None);
        let first = service.predict(&encoding).await.unwrap();
        let second = service.predict(&encoding).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.get(AudioFeature::Key).fract(), 0.0);
    }

    #[tokio::test]
    async fn test_noise_varies_output() {
        let settings = PredictionSettings {
            noise_std_dev: 0.1,
            seed: Some(9),
        };
        let service = PredictionService::new(repository_with_model().await, &settings).unwrap();
        let encoding = combine(Emotion::Calm, Event::None, Genre::None);
        let first = service.predict(&encoding).await.unwrap();
        let second = service.predict(&encoding).await.unwrap();
        // continuous features pick up fresh noise on every call
        assert_ne!(first.get(AudioFeature::Tempo), second.get(AudioFeature::Tempo));
    }

    #[cfg(feature = "mock")]
    #[tokio::test]
    async fn test_corrupted_model_is_unavailable() {
        let mut repository = crate::model::MockModelRepository::new();
        repository
            .expect_load()
            .times(1)
            .returning(|| Err(ModelError::Corrupted("truncated weights".to_string())));
        let service = PredictionService::new(Arc::new(repository), &quiet()).unwrap();

        let err = service
            .predict(&combine(Emotion::Happy, Event::None, Genre::None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PredictionError::ModelUnavailable(ModelError::Corrupted(_))
        ));
    }
}

//! Chromatica
//!
//! Maps a mood (emotion, event, genre) to target audio features with a small
//! regression network, then queries a recommendation service around that
//! target, widening the query until tracks come back.

pub mod config;
pub mod dataset;
pub mod features;
pub mod model;
pub mod mood;
pub mod prediction;
pub mod recommend;
pub mod training;

// Re-export commonly used types for convenience
pub use features::{AudioFeature, AudioFeatureVector, NormalizedFeatureVector};
pub use model::{FileModelRepository, InMemoryModelRepository, ModelRepository};
pub use mood::{combine, CombinedEncoding, Emotion, Event, Genre, MoodSelection};
pub use prediction::PredictionService;
pub use recommend::{QueryOutcome, RangeExpansionQuery, SpotifyClient};
pub use training::{TrainingPipeline, TrainingSet};

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub data_dir: Option<String>,
    pub model_dir: Option<String>,
    pub dataset_file: Option<String>,
    pub storage_url: Option<String>,

    // Feature configs
    pub training: Option<TrainingConfig>,
    pub prediction: Option<PredictionConfig>,
    pub recommendation: Option<RecommendationConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: Option<usize>,
    pub batch_size: Option<usize>,
    pub validation_split: Option<f64>,
    pub learning_rate: Option<f32>,
    pub replication: Option<usize>,
    pub include_curated: Option<bool>,
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PredictionConfig {
    /// 0 disables noise.
    pub noise_std_dev: Option<f64>,
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RecommendationConfig {
    pub token_url: Option<String>,
    pub api_base_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub limit: Option<u32>,
    pub default_seed_genre: Option<String>,
    pub max_attempts: Option<u32>,
    pub expansion_factor: Option<f64>,
    pub loudness_lower_factor: Option<f64>,
    pub loudness_upper_factor: Option<f64>,
    pub timeout_sec: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

mod file_config;

pub use file_config::{FileConfig, PredictionConfig, RecommendationConfig, TrainingConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;

pub const DEFAULT_DATASET_FILE: &str = "100_items.csv";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub data_dir: Option<PathBuf>,
    pub model_dir: Option<PathBuf>,
    pub dataset_file: Option<String>,
    pub storage_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub data_dir: PathBuf,
    pub model_dir: PathBuf,
    pub dataset_file: String,
    /// When set, datasets are fetched from this bucket instead of `data_dir`.
    pub storage_url: Option<String>,

    // Feature configs (with defaults)
    pub training: TrainingSettings,
    pub prediction: PredictionSettings,
    pub recommendation: RecommendationSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .or_else(|| cli.data_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("data_dir must be specified via --data-dir or in config file")
            })?;

        if !data_dir.exists() {
            bail!("Data directory does not exist: {:?}", data_dir);
        }
        if !data_dir.is_dir() {
            bail!("data_dir is not a directory: {:?}", data_dir);
        }

        let model_dir = file
            .model_dir
            .map(PathBuf::from)
            .or_else(|| cli.model_dir.clone())
            .unwrap_or_else(|| data_dir.join("model"));

        let dataset_file = file
            .dataset_file
            .or_else(|| cli.dataset_file.clone())
            .unwrap_or_else(|| DEFAULT_DATASET_FILE.to_string());

        let storage_url = file.storage_url.or_else(|| cli.storage_url.clone());

        let defaults = TrainingSettings::default();
        let t_file = file.training.unwrap_or_default();
        let training = TrainingSettings {
            epochs: t_file.epochs.unwrap_or(defaults.epochs),
            batch_size: t_file.batch_size.unwrap_or(defaults.batch_size),
            validation_split: t_file.validation_split.unwrap_or(defaults.validation_split),
            learning_rate: t_file.learning_rate.unwrap_or(defaults.learning_rate),
            replication: t_file.replication.unwrap_or(defaults.replication),
            include_curated: t_file.include_curated.unwrap_or(defaults.include_curated),
            seed: t_file.seed,
        };
        training.validate()?;

        let p_file = file.prediction.unwrap_or_default();
        let prediction = PredictionSettings {
            noise_std_dev: p_file
                .noise_std_dev
                .unwrap_or(PredictionSettings::default().noise_std_dev),
            seed: p_file.seed,
        };
        if !prediction.noise_std_dev.is_finite() || prediction.noise_std_dev < 0.0 {
            bail!(
                "prediction.noise_std_dev must be a non-negative number, got {}",
                prediction.noise_std_dev
            );
        }

        let defaults = RecommendationSettings::default();
        let r_file = file.recommendation.unwrap_or_default();
        let recommendation = RecommendationSettings {
            token_url: r_file.token_url.unwrap_or(defaults.token_url),
            api_base_url: r_file.api_base_url.unwrap_or(defaults.api_base_url),
            client_id: r_file.client_id.or_else(|| cli.client_id.clone()),
            client_secret: r_file.client_secret.or_else(|| cli.client_secret.clone()),
            limit: r_file.limit.unwrap_or(defaults.limit),
            default_seed_genre: r_file
                .default_seed_genre
                .unwrap_or(defaults.default_seed_genre),
            max_attempts: r_file.max_attempts.unwrap_or(defaults.max_attempts),
            expansion_factor: r_file.expansion_factor.unwrap_or(defaults.expansion_factor),
            loudness_lower_factor: r_file
                .loudness_lower_factor
                .unwrap_or(defaults.loudness_lower_factor),
            loudness_upper_factor: r_file
                .loudness_upper_factor
                .unwrap_or(defaults.loudness_upper_factor),
            timeout_sec: r_file.timeout_sec.unwrap_or(defaults.timeout_sec),
        };
        recommendation.validate()?;

        Ok(Self {
            data_dir,
            model_dir,
            dataset_file,
            storage_url,
            training,
            prediction,
            recommendation,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSettings {
    pub epochs: usize,
    pub batch_size: usize,
    pub validation_split: f64,
    pub learning_rate: f32,
    /// Copies of every category row in the training set.
    pub replication: usize,
    pub include_curated: bool,
    /// Fixed seed for weight init and shuffling; random when unset.
    pub seed: Option<u64>,
}

impl TrainingSettings {
    fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            bail!("training.epochs must be at least 1");
        }
        if self.batch_size == 0 {
            bail!("training.batch_size must be at least 1");
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            bail!(
                "training.validation_split must be in [0, 1), got {}",
                self.validation_split
            );
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            bail!("training.learning_rate must be positive");
        }
        if self.replication == 0 {
            bail!("training.replication must be at least 1");
        }
        Ok(())
    }
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 32,
            validation_split: 0.1,
            learning_rate: 0.01,
            replication: 100,
            include_curated: true,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSettings {
    pub noise_std_dev: f64,
    pub seed: Option<u64>,
}

impl Default for PredictionSettings {
    fn default() -> Self {
        Self {
            noise_std_dev: 0.1,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationSettings {
    pub token_url: String,
    pub api_base_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub limit: u32,
    pub default_seed_genre: String,
    pub max_attempts: u32,
    pub expansion_factor: f64,
    pub loudness_lower_factor: f64,
    pub loudness_upper_factor: f64,
    pub timeout_sec: u64,
}

impl RecommendationSettings {
    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            bail!("recommendation.max_attempts must be at least 1");
        }
        if self.limit == 0 {
            bail!("recommendation.limit must be at least 1");
        }
        let factors = [
            ("expansion_factor", self.expansion_factor),
            ("loudness_lower_factor", self.loudness_lower_factor),
            ("loudness_upper_factor", self.loudness_upper_factor),
        ];
        for (name, value) in factors {
            if !(value.is_finite() && value >= 1.0) {
                bail!("recommendation.{} must be at least 1.0, got {}", name, value);
            }
        }
        Ok(())
    }

    /// Client credentials, required only by commands that query the service.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Ok((id, secret)),
            _ => bail!(
                "client_id and client_secret must be set via --client-id/--client-secret or [recommendation] in config file"
            ),
        }
    }
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            client_id: None,
            client_secret: None,
            limit: 10,
            default_seed_genre: "pop".to_string(),
            max_attempts: 5,
            expansion_factor: 1.5,
            loudness_lower_factor: 1.8,
            loudness_upper_factor: 2.7,
            timeout_sec: 30,
        }
    }
}

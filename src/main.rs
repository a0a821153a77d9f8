use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chromatica::config::{AppConfig, CliConfig, FileConfig};
use chromatica::dataset::{DatasetLoader, FileSource, HttpFileSource, LocalFileSource};
use chromatica::model::FileModelRepository;
use chromatica::mood::{Emotion, Event, Genre, MoodSelection};
use chromatica::prediction::PredictionService;
use chromatica::recommend::{ExpansionPolicy, QueryOutcome, RangeExpansionQuery, SpotifyClient};
use chromatica::training::{TrainingEvent, TrainingPipeline};

const DATASET_FETCH_TIMEOUT_SEC: u64 = 60;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
#[command(version, about = "Mood based track recommendations")]
struct CliArgs {
    /// Path to a TOML config file. Its values override the flags below.
    #[clap(long, global = true, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the training table.
    #[clap(long, global = true, value_parser = parse_path)]
    pub data_dir: Option<PathBuf>,

    /// Directory where the model is persisted. Defaults to `<data-dir>/model`.
    #[clap(long, global = true, value_parser = parse_path)]
    pub model_dir: Option<PathBuf>,

    /// Name of the training table file.
    #[clap(long, global = true)]
    pub dataset_file: Option<String>,

    /// Storage bucket URL to fetch the training table from instead of the data dir.
    #[clap(long, global = true)]
    pub storage_url: Option<String>,

    /// Recommendation service client id.
    #[clap(long, global = true)]
    pub client_id: Option<String>,

    /// Recommendation service client secret.
    #[clap(long, global = true)]
    pub client_secret: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train the model on the training table and persist it.
    Train,

    /// Predict the audio features of a mood.
    Predict(MoodArgs),

    /// Predict the audio features of a mood and fetch matching tracks.
    Recommend {
        #[command(flatten)]
        mood: MoodArgs,

        /// Number of tracks to ask for.
        #[clap(long)]
        limit: Option<u32>,
    },

    /// Show the reference features the training table holds for a mood.
    Features(MoodArgs),
}

#[derive(Args, Debug)]
struct MoodArgs {
    #[clap(long, default_value = "none")]
    emotion: Emotion,

    #[clap(long, default_value = "none")]
    event: Event,

    #[clap(long, default_value = "none")]
    genre: Genre,
}

impl MoodArgs {
    fn selection(&self) -> MoodSelection {
        MoodSelection::new(self.emotion, self.event, self.genre)
    }
}

fn dataset_loader(config: &AppConfig) -> Result<DatasetLoader> {
    let source: Arc<dyn FileSource> = match &config.storage_url {
        Some(url) => Arc::new(
            HttpFileSource::new(url.clone(), DATASET_FETCH_TIMEOUT_SEC)
                .context("Failed to create storage client")?,
        ),
        None => Arc::new(LocalFileSource::new(config.data_dir.clone())),
    };
    Ok(DatasetLoader::new(source))
}

fn spawn_progress_printer(mut rx: UnboundedReceiver<TrainingEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                TrainingEvent::Started {
                    examples,
                    epochs,
                    fresh_model,
                } => println!(
                    "Training {} model on {} examples for {} epochs",
                    if fresh_model { "a fresh" } else { "the saved" },
                    examples,
                    epochs
                ),
                TrainingEvent::Epoch(m) => println!(
                    "Epoch {}: loss = {:.4}, MAE = {:.2}",
                    m.epoch, m.loss, m.mae
                ),
                TrainingEvent::Completed { .. } => println!("Training complete"),
            }
        }
    })
}

/// Returns whether the printer drained its channel without failing.
async fn wait_for_printer(printer: JoinHandle<()>) -> bool {
    match printer.await {
        Ok(()) => true,
        Err(e) => {
            warn!("Progress printer stopped early: {}", e);
            false
        }
    }
}

async fn train(config: &AppConfig, repository: Arc<FileModelRepository>) -> Result<()> {
    let loader = dataset_loader(config)?;
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let printer = spawn_progress_printer(rx);

    let pipeline = TrainingPipeline::new(repository, config.training.clone()).with_progress(tx);
    let report = pipeline
        .run(&loader, &config.dataset_file)
        .await
        .context("Training failed")?;
    drop(pipeline);
    wait_for_printer(printer).await;

    info!(
        epochs = report.epochs.len(),
        final_loss = report.info.final_loss,
        "Model saved to {:?}",
        config.model_dir
    );
    Ok(())
}

async fn predict(
    config: &AppConfig,
    repository: Arc<FileModelRepository>,
    mood: &MoodArgs,
) -> Result<()> {
    let service = PredictionService::new(repository, &config.prediction)?;
    let selection = mood.selection();
    let features = service
        .predict(&selection.encode())
        .await
        .with_context(|| format!("Prediction failed for {}", selection))?;
    println!("{}", selection);
    println!("{}", features);
    Ok(())
}

async fn recommend(
    config: &AppConfig,
    repository: Arc<FileModelRepository>,
    mood: &MoodArgs,
    limit: Option<u32>,
) -> Result<()> {
    config.recommendation.credentials()?;
    let service = PredictionService::new(repository, &config.prediction)?;
    let selection = mood.selection();
    let features = service
        .predict(&selection.encode())
        .await
        .with_context(|| format!("Prediction failed for {}", selection))?;

    let client = Arc::new(SpotifyClient::new(&config.recommendation)?);
    let query = RangeExpansionQuery::new(
        client,
        ExpansionPolicy::new(&config.recommendation),
        limit.unwrap_or(config.recommendation.limit),
    );
    let seed_genre = selection
        .genre
        .seed()
        .unwrap_or(config.recommendation.default_seed_genre.as_str());

    match query
        .run(&features, seed_genre)
        .await
        .context("Recommendation query failed")?
    {
        QueryOutcome::Matched { tracks, attempts } => {
            println!("Found {} tracks after {} attempt(s):", tracks.len(), attempts);
            for track in tracks {
                println!("  {} - {}", track.artists.join(", "), track.name);
                if let Some(url) = track.external_url.or(track.preview_url) {
                    println!("    {}", url);
                }
            }
        }
        QueryOutcome::Exhausted { attempts } => {
            println!("No songs found after {} attempts.", attempts);
        }
    }
    Ok(())
}

async fn features(config: &AppConfig, mood: &MoodArgs) -> Result<()> {
    let loader = dataset_loader(config)?;
    let dataset = loader
        .load(&config.dataset_file)
        .await
        .with_context(|| format!("Failed to load dataset {}", config.dataset_file))?;
    let selection = mood.selection();
    let slot = selection.joint_index();
    let row = dataset
        .row_for_label(slot)
        .with_context(|| format!("No reference row for {} (slot {})", selection, slot))?;
    println!("{}", selection);
    println!("{}", row);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let cli_config = CliConfig {
        data_dir: cli_args.data_dir.clone(),
        model_dir: cli_args.model_dir.clone(),
        dataset_file: cli_args.dataset_file.clone(),
        storage_url: cli_args.storage_url.clone(),
        client_id: cli_args.client_id.clone(),
        client_secret: cli_args.client_secret.clone(),
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;
    let repository = Arc::new(FileModelRepository::new(config.model_dir.clone()));

    match &cli_args.command {
        Command::Train => train(&config, repository).await,
        Command::Predict(mood) => predict(&config, repository, mood).await,
        Command::Recommend { mood, limit } => recommend(&config, repository, mood, *limit).await,
        Command::Features(mood) => features(&config, mood).await,
    }
}

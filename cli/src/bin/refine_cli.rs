use clap::{Parser, Subcommand};
use cli::BatchFile;
use color_eyre::eyre::{eyre, Result};
use mask_refine::{io, Pipeline, RefineConfig, Watermark, WatermarkCache};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refine a raw mask and write the alpha cutout
    Cutout {
        /// Source photo
        #[arg(short, long)]
        source: PathBuf,
        /// Raw segmentation mask, same size as the source
        #[arg(short, long)]
        mask: PathBuf,
        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,
        /// Pipeline configuration (.toml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory for per-stage debug renderings
        #[arg(long)]
        intermediates: Option<PathBuf>,
        /// Watermark asset stamped in the bottom-right corner
        #[arg(long)]
        watermark: Option<PathBuf>,
    },
    /// Print the alignment estimate for a source/mask pair as JSON
    Align {
        #[arg(short, long)]
        source: PathBuf,
        #[arg(short, long)]
        mask: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Process every job of a batch file concurrently
    Batch {
        /// Path to the batch file (.toml or .json)
        #[arg(short, long)]
        jobs: PathBuf,
    },
    /// Write a configuration file with every default
    InitConfig {
        #[arg(short, long, default_value = "refine.toml")]
        output: PathBuf,
    },
    /// Print the JSON schema of the configuration file
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Cutout { source, mask, output, config, intermediates, watermark } => {
            let mut config = load_config(config.as_deref())?;
            config.keep_intermediates |= intermediates.is_some();
            let pipeline = Arc::new(Pipeline::from_config(&config)?);
            let watermark = match watermark {
                Some(path) => Some(Arc::new(WatermarkCache::from_file(path)?)),
                None => None,
            };
            run_cutout(pipeline, source, mask, output, intermediates, watermark).await?;
        }
        Commands::Align { source, mask, config } => {
            let config = load_config(config.as_deref())?;
            let pipeline = Pipeline::from_config(&config)?;
            let source = read_rgba(&source).await?;
            let mask = read_rgba(&mask).await?;
            let result = tokio::task::spawn_blocking(move || -> mask_refine::Result<_> {
                let binary = pipeline.binarizer().binarize(&mask, source.dimensions())?;
                pipeline.aligner().estimate(&source, &binary)
            })
            .await??;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Batch { jobs } => {
            run_batch(&jobs).await?;
        }
        Commands::InitConfig { output } => {
            RefineConfig::default().to_file(&output)?;
            info!("Default configuration written to {:?}", output);
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&RefineConfig::schema())?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<RefineConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Ok(RefineConfig::from_file(path)?)
        }
        None => Ok(RefineConfig::default()),
    }
}

async fn read_rgba(path: &Path) -> Result<image::RgbaImage> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| eyre!("Failed to read {:?}: {}", path, e))?;
    Ok(tokio::task::spawn_blocking(move || io::decode_rgba(&bytes)).await??)
}

async fn run_cutout(
    pipeline: Arc<Pipeline>,
    source: PathBuf,
    mask: PathBuf,
    output: PathBuf,
    intermediates: Option<PathBuf>,
    watermark: Option<Arc<WatermarkCache>>,
) -> Result<()> {
    let source_image = read_rgba(&source).await?;
    let mask_image = read_rgba(&mask).await?;

    let (png, alignment) = tokio::task::spawn_blocking(move || -> mask_refine::Result<_> {
        let result = pipeline.process(&source_image, &mask_image)?;
        if let Some(dir) = &intermediates {
            result.save_intermediates(dir)?;
        }
        let cutout = match &watermark {
            Some(cache) => Watermark::default().apply(&result.cutout, cache)?,
            None => result.cutout,
        };
        Ok((io::encode_png(&cutout)?, result.alignment))
    })
    .await??;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&output, png).await?;
    info!(
        "Cutout {:?} -> {:?} (coarse {:?}, fine {:?})",
        source, output, alignment.coarse, alignment.fine
    );
    Ok(())
}

async fn run_batch(jobs_path: &Path) -> Result<()> {
    let batch = BatchFile::from_file(jobs_path)?;
    info!("Batch {:?}: {} jobs", jobs_path, batch.jobs.len());

    let pipeline = Arc::new(Pipeline::from_config(&batch.config)?);
    let watermark = match &batch.watermark {
        Some(path) => Some(Arc::new(WatermarkCache::from_file(path)?)),
        None => None,
    };
    tokio::fs::create_dir_all(&batch.output_dir).await?;

    let mut set = JoinSet::new();
    for job in batch.jobs.iter().cloned() {
        let output = job.output_path(&batch.output_dir);
        let pipeline = Arc::clone(&pipeline);
        let watermark = watermark.clone();
        set.spawn(async move {
            let result = run_cutout(pipeline, job.source, job.mask, output, None, watermark).await;
            (job.name, result)
        });
    }

    let mut failures = 0usize;
    while let Some(joined) = set.join_next().await {
        let (name, result) = joined?;
        if let Err(e) = result {
            failures += 1;
            error!("Job '{}' failed: {:?}", name, e);
        }
    }

    if failures > 0 {
        return Err(eyre!("{} of {} jobs failed", failures, batch.jobs.len()));
    }
    info!("✅ Batch completed!");
    Ok(())
}

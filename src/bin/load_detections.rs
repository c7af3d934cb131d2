use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use tg_cleandata::config;
use tg_cleandata::db;
use tg_cleandata::loader::{self, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Append object-detector output from CSV to the detect_data table"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// CSV with xmin_val, ymin, xmax_val, ymax, confidence, class, name, image_name
    #[arg(long)]
    csv: PathBuf,

    /// Rows per INSERT; defaults to `loader.batch_size`
    #[arg(long)]
    batch_size: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load_or_default(&args.config)?;
    cfg.ensure_dirs()?;

    let database_url = cfg.database_url();
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let opts = LoadOptions::new(args.batch_size.unwrap_or(cfg.loader.batch_size));

    info!(csv = %args.csv.display(), database_url = %database_url, "loading detections");
    let report = loader::load_detections(&pool, &args.csv, &opts).await?;
    let total = db::count_detections(&pool).await?;
    info!(
        inserted = report.inserted,
        chunks = report.chunks,
        table_rows = total,
        "Data successfully exported to detect_data"
    );

    Ok(())
}

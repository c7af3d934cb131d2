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
    about = "Clean a scraped-messages CSV and append it to the cleandata table"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// CSV produced by the channel scraper
    #[arg(long)]
    csv: PathBuf,

    /// Rows per INSERT; defaults to `loader.batch_size`
    #[arg(long)]
    batch_size: Option<usize>,

    /// Directory that relative media paths are checked against; defaults to `loader.media_root`
    #[arg(long)]
    media_root: Option<PathBuf>,
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

    let opts = LoadOptions {
        batch_size: args.batch_size.unwrap_or(cfg.loader.batch_size),
        media_root: args.media_root.or_else(|| cfg.media_root()),
    };

    info!(csv = %args.csv.display(), database_url = %database_url, "loading clean data");
    let report = loader::load_clean_data(&pool, &args.csv, &opts).await?;
    let total = db::count_clean_data(&pool).await?;
    info!(
        inserted = report.inserted,
        skipped_existing = report.skipped_existing(),
        table_rows = total,
        "Data successfully exported to cleandata"
    );

    Ok(())
}

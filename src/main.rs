use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use tg_cleandata::config;
use tg_cleandata::db;
use tg_cleandata::handlers::{self, AppState};

#[derive(Debug, Parser)]
#[command(author, version, about = "Serve the CleanData API")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Override `server.port` from the config
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let mut cfg = config::load_or_default(&args.config)?;
    if let Some(port) = args.port {
        cfg.server.port = port;
    }
    cfg.ensure_dirs()?;

    let database_url = cfg.database_url();
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let app = handlers::router(AppState::new(pool, cfg.api));

    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, database_url = %database_url, "CleanData API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    Ok(())
}

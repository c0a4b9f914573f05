use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use pomo_server::ServerConfig;
use pomo_store::Database;

#[derive(Parser, Debug)]
#[command(name = "pomod", version, about = "Pomodoro timer backend")]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Path to the SQLite database. Defaults to ~/.pomod/pomod.db.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Browser origin allowed to make cross-origin requests.
    #[arg(long, default_value = "http://localhost:3000")]
    cors_origin: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting pomod");

    let db_path = match args.db_path {
        Some(path) => path,
        None => dirs_home().join(".pomod").join("pomod.db"),
    };

    let db = Database::open(&db_path).context("failed to open database")?;

    let config = ServerConfig {
        port: args.port,
        cors_origin: args.cors_origin,
    };
    let _handle = pomo_server::start(config, db)
        .await
        .context("failed to start server")?;

    tracing::info!(port = args.port, "pomod ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;

    tracing::info!("Shutting down");
    Ok(())
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

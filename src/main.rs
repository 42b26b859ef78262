use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use study_commands::api;
use study_commands::engine::CommandEngine;
use study_commands::paths;

#[derive(Parser)]
#[command(name = "study-commands-server", about = "HTTP API for conversational study commands", version)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8787")]
    listen: SocketAddr,

    /// Directory holding settings.json and credentials
    #[arg(long, default_value = paths::DEFAULT_CONFIG_DIR)]
    config_dir: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let engine = match CommandEngine::from_config_dir(&args.config_dir) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            tracing::error!(config_dir = %args.config_dir.display(), error = %e, "failed to load configuration");
            process::exit(1);
        }
    };

    if let Err(e) = api::serve(engine, args.listen).await {
        tracing::error!(error = %e, "API server error");
        process::exit(1);
    }
}

// Recovery relay server

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use warden_server::ServerConfig;

#[derive(Parser)]
#[command(name = "warden-server")]
#[command(about = "Warden - guardian recovery relay", long_about = None)]
struct Cli {
    /// Config file (.toml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding config and environment
    #[arg(short, long)]
    bind: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::load_from_file(path)?,
        None => ServerConfig::default(),
    };
    config.merge_with_env()?;
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }
    config.validate()?;

    let level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    warden_server::serve(config).await
}

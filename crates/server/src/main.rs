use clap::Parser;
use simcity_viewer::ViewerConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Local web viewer for the SimCity simulation server.
#[derive(Debug, Parser)]
#[command(name = "simcity-viewer", version)]
struct Args {
    /// YAML config file (default: ~/.simcity-viewer/config.yaml).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Address to serve the dashboard on.
    #[arg(long)]
    listen: Option<SocketAddr>,
    /// Simulation server base url; overrides config and SIMCITY_API_URL.
    #[arg(long)]
    api_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let path = args.config.unwrap_or_else(ViewerConfig::default_path);
    let mut config = ViewerConfig::load(&path)?;
    config.api_url_from_env();
    if let Some(url) = args.api_url {
        config.api_url = url;
    }
    if let Some(listen) = args.listen {
        config.listen = listen;
    }

    tracing::info!(
        config = %path.display(),
        api_url = %config.api_url,
        grid = config.game.grid_size,
        players = config.game.players.len(),
        "starting simcity viewer"
    );
    simcity_viewer::serve(config.listen, config).await
}

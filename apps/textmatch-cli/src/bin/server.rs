use clap::Parser;
use std::sync::Arc;

use textmatch_cli::start_service;
use textmatch_core::config::Config;
use textmatch_core::logging::init_tracing;

#[derive(Parser)]
#[command(name = "textmatch-server")]
#[command(about = "Serve insert and keyword match queries over HTTP")]
struct Args {
    /// Bind address, overrides server.host/server.port
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info")?;
    let args = Args::parse();
    let config = Config::load()?;
    let settings = config.settings()?;
    tracing::info!(env = config.env_name(), index = %settings.index.name, "starting textmatch-server");

    let service = start_service(&settings).await.map_err(|e| {
        tracing::error!(error = %e, "provisioning failed, refusing to start");
        e
    })?;

    let bind = args.bind.unwrap_or_else(|| settings.server.bind_addr());
    textmatch_http::serve(Arc::new(service), &bind).await
}

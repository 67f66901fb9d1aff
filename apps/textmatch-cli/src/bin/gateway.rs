use clap::Parser;

use textmatch_core::config::Config;
use textmatch_core::logging::init_tracing;
use textmatch_http::gateway::Gateway;

#[derive(Parser)]
#[command(name = "textmatch-gateway")]
#[command(about = "Forward client requests to a textmatch-server")]
struct Args {
    /// Bind address, overrides gateway.host/gateway.port
    #[arg(long)]
    bind: Option<String>,

    /// Server base URL, overrides gateway.upstream_url
    #[arg(long)]
    upstream: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info")?;
    let args = Args::parse();
    let mut settings = Config::load()?.settings()?;
    if let Some(upstream) = args.upstream {
        settings.gateway.upstream_url = upstream;
    }

    let bind = args.bind.unwrap_or_else(|| settings.gateway.bind_addr());
    Gateway::new(&settings.gateway).serve(&bind).await
}

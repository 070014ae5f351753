//! crossbook - cross-venue arbitrage and tender decision bot
//! Mission: One decision loop against the simulator, no surprises
//! Philosophy: Pure decision functions, thin transport, explicit state

use anyhow::Result;
use clap::Parser;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crossbook::{client::SimClient, config::Config, engine::Engine};

#[derive(Parser, Debug)]
#[command(name = "crossbook", about = "Decision engine for a multi-venue trading simulation")]
struct Args {
    /// Poll interval of the outer decision loop (milliseconds)
    #[arg(long, env = "CROSSBOOK_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    /// Enable the passive quoting loop alongside arbitrage/tenders
    #[arg(long)]
    quoter: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(poll) = args.poll_interval_ms {
        config.poll_interval_ms = poll;
    }
    if args.quoter {
        config.quoter_enabled = true;
    }

    info!(
        securities = config.securities.len(),
        venues = config.venues.len(),
        quoter = config.quoter_enabled,
        "🚀 crossbook starting"
    );

    // Cooperative shutdown: the flag is read once per outer cycle, so an
    // in-flight evaluation always completes.
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for ctrl-c: {e}");
                return;
            }
            info!("ctrl-c received, finishing the current cycle");
            shutdown.store(true, Ordering::Relaxed);
        });
    }

    let client = SimClient::new(&config)?;
    let mut engine = Engine::new(client, config);
    engine.run(&shutdown).await
}

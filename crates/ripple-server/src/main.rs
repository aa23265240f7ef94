use anyhow::Result;
use clap::Parser;
use ripple_federation::{DbActorStore, Ed25519Verifier, HttpActorDiscovery, InboxProcessor};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod processor;
mod worker;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ripple=info")),
        )
        .init();

    let args = cli::Args::parse();
    let config = config::Config::load(&args.config)?;

    let engine = ripple_db::detect_database_engine(&config.database.url)?;
    let pool = ripple_db::create_pool(&config.database.url, config.database.max_connections).await?;
    ripple_db::run_migrations(&pool, engine).await?;

    let store = DbActorStore::new(pool.clone());
    let discovery = HttpActorDiscovery::with_options(
        pool.clone(),
        &config.server.user_agent,
        Duration::from_secs(config.federation.discovery_timeout_secs),
        config.federation.allow_discovery,
    )?;
    let recorder = processor::ActivityRecorder::new(pool.clone());
    let inbox = InboxProcessor::new(store, discovery, Ed25519Verifier, recorder);

    tracing::info!(
        domain = %config.server.domain,
        engine = engine.as_str(),
        "inbox delivery worker starting"
    );
    worker::run(pool, inbox, config.worker).await;
    Ok(())
}

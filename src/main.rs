use std::sync::Arc;

use parlor::chat::MessageLog;
use parlor::clock::{Clock, SystemClock};
use parlor::config::Config;
use parlor::presence::{Registry, Sweeper};
use parlor::store::{MemStore, SqliteStore, Store};
use parlor::{AppState, app};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("parlor=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => Arc::new(SqliteStore::connect(url).await?),
        None => Arc::new(MemStore::new()),
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let registry = Arc::new(Registry::new(store.clone(), clock.clone()));
    let log = Arc::new(MessageLog::new(store, clock));

    let sweeper = Sweeper::new(
        registry.clone(),
        log.clone(),
        config.inactivity_threshold,
        config.sweep_interval,
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper_task = tokio::spawn(sweeper.run(shutdown_rx));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app(AppState { registry, log }))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    // stop scheduling sweeps, but let an in-flight tick finish
    let _ = shutdown_tx.send(true);
    let _ = sweeper_task.await;
    Ok(())
}

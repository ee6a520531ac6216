// Maintenance entry point: recompute every account's resource counters
// against DATABASE_URL. Block ingestion is driven by the sync service
// embedding this crate.

use ledger_sync::{config::Config, db, run_migration_with_retry};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded: {:?}", config);

    let db_pool = db::connection::establish_connection(&config.database_url).await?;

    tracing::info!(
        "Starting resource tally migration (batch size {})",
        config.migration_batch_size
    );
    run_migration_with_retry(
        &db_pool,
        config.migration_batch_size,
        config.migration_max_retries,
    )
    .await?;
    tracing::info!("Resource tally migration finished");

    db_pool.close().await;
    Ok(())
}

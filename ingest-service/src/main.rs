use std::sync::Arc;

use tokio::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use assessment_service::{AttendanceService, InMemoryStore};
use ingest_service::{run_worker, IngestConfig, InMemoryDirectory, PunchRouter, RecomputeQueue};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ingest_service=info,assessment_service=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = IngestConfig::from_env();
    tracing::info!("Starting attendance ingest service v{}", config.version);
    tracing::info!(
        debounce_secs = config.recompute_debounce_secs,
        "recompute debounce configured"
    );

    // Wire the engine over the in-memory stores
    let store = Arc::new(InMemoryStore::new());
    let service = Arc::new(AttendanceService::with_store(store));
    let directory = Arc::new(InMemoryDirectory::new());
    let queue = Arc::new(RwLock::new(RecomputeQueue::new()));

    // The webhook collaborator drives this router; no transport is bundled.
    let _router = PunchRouter::new(
        directory,
        Arc::clone(&service),
        Arc::clone(&queue),
        config.clone(),
    );

    // Start the recompute worker
    let worker = tokio::spawn(run_worker(queue, service, config));

    tracing::info!("recompute worker running, Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    worker.abort();
    Ok(())
}

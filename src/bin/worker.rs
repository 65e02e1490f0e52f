use greyscaler::{
    config::AppConfig,
    services::{
        cache::ContentCache,
        fetch::HttpFetcher,
        kv::RedisKv,
        ledger::RetryLedger,
        pipeline::{self, ConvertPipeline},
        queue::RedisQueue,
    },
};
use std::time::Duration;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL_MS: u64 = 1000; // 1 second

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting greyscale conversion worker");

    // Load configuration
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Initialize queue and cache/ledger backend
    tracing::info!("Connecting to Redis");
    let queue = RedisQueue::new(&config.queue_url).expect("Failed to initialize job queue");
    let kv = RedisKv::new(&config.cache_url).expect("Failed to initialize cache backend");

    let pipeline = ConvertPipeline::new(
        HttpFetcher::new(Duration::from_secs(config.fetch_timeout_secs)),
        ContentCache::new(kv.clone(), Duration::from_secs(config.cache_ttl_secs)),
        RetryLedger::new(kv, Duration::from_secs(config.ledger_ttl_secs)),
        config.max_attempts,
    );

    tracing::info!(
        max_attempts = config.max_attempts,
        fetch_timeout_secs = config.fetch_timeout_secs,
        "Worker ready, starting job processing loop"
    );

    // Main processing loop: one delivery at a time, to completion
    loop {
        match pipeline::run_once(&queue, &pipeline).await {
            Ok(true) => {
                // Job processed, check for the next one immediately
                tracing::debug!("Delivery handled, checking for next job");
            }
            Ok(false) => {
                // No job available, sleep before next poll
                tracing::trace!("No jobs available, sleeping");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Error processing delivery, will retry");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
        }
    }
}

use greyscaler::{
    config::AppConfig,
    db::{self, results},
    models::result::ResultMessage,
    services::queue::RedisQueue,
};
use sqlx::PgPool;
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

    tracing::info!("Starting result saver worker");

    // Load configuration
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Initialize database
    tracing::info!("Connecting to PostgreSQL");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Initialize result queue
    tracing::info!("Connecting to Redis result queue");
    let queue = RedisQueue::new(&config.queue_url).expect("Failed to initialize result queue");

    tracing::info!("Saver ready, starting persistence loop");

    loop {
        match save_next_result(&queue, &db_pool).await {
            Ok(true) => {
                tracing::debug!("Result persisted, checking for next");
            }
            Ok(false) => {
                tracing::trace!("No results available, sleeping");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Error persisting result, will retry");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
        }
    }
}

/// Persist the next result from the outbound queue.
/// Returns Ok(true) if a message was handled, Ok(false) if none was available.
async fn save_next_result(
    queue: &RedisQueue,
    pool: &PgPool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let delivery = match queue.receive_result().await? {
        Some(delivery) => delivery,
        None => return Ok(false),
    };

    let result: ResultMessage = match serde_json::from_str(&delivery.payload) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %e, "Dropping malformed result message");
            queue.ack_result(&delivery).await?;
            return Ok(true);
        }
    };

    match results::insert_result(pool, &result).await {
        Ok(inserted) => {
            if inserted {
                tracing::info!(
                    job_id = %result.job_id,
                    result_type = %result.result_type,
                    "Result persisted"
                );
            } else {
                // Duplicate publication under at-least-once delivery.
                tracing::debug!(job_id = %result.job_id, "Result already persisted, dropping duplicate");
            }
            queue.ack_result(&delivery).await?;
            Ok(true)
        }
        Err(e) => {
            // Leave the message redeliverable until the store recovers.
            queue.release_result(&delivery).await?;
            Err(e.into())
        }
    }
}

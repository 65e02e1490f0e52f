mod app_state;
mod config;
mod db;
mod models;
mod routes;
mod services;

use axum::{middleware, routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use services::{kv::RedisKv, queue::RedisQueue};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing greyscaler API server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!(
        "conversion_jobs_submitted_total",
        "Total conversion jobs submitted"
    );
    metrics::describe_histogram!(
        "conversion_processing_seconds",
        "Time spent in cache lookup and greyscale conversion per job"
    );
    metrics::describe_counter!(
        "conversion_jobs_cached_total",
        "Jobs served from the content cache"
    );
    metrics::describe_counter!(
        "conversion_jobs_converted_total",
        "Jobs converted and written to the content cache"
    );
    metrics::describe_counter!(
        "conversion_jobs_unresolved_total",
        "Jobs that ended unresolved"
    );
    metrics::describe_counter!(
        "conversion_jobs_requeued_total",
        "Deliveries released back to the queue after a fetch failure"
    );
    metrics::describe_counter!(
        "conversion_jobs_malformed_total",
        "Queue messages dropped as malformed"
    );

    // Initialize database connection pool
    tracing::info!("Connecting to PostgreSQL result store");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run database migrations
    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Initialize Redis job queue
    tracing::info!("Connecting to Redis job queue");
    let queue = RedisQueue::new(&config.queue_url).expect("Failed to initialize job queue");

    // Initialize cache/ledger backend (health checks only on the API side)
    let cache_backend =
        RedisKv::new(&config.cache_url).expect("Failed to initialize cache backend");

    // Create shared application state
    let state = AppState::new(db_pool, queue, cache_backend, config.api_keys.clone());

    // Build API routes; conversion endpoints require an API key
    let protected = Router::new()
        .route("/api/v1/convert", post(routes::convert::submit_conversion))
        .route("/api/v1/result/{job_id}", get(routes::results::get_result))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            routes::auth::require_api_key,
        ));

    let app = Router::new()
        .merge(protected)
        .route("/health", get(routes::health::health_check))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(64 * 1024)); // URLs only, 64 KB is plenty

    tracing::info!("Starting greyscaler API on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}

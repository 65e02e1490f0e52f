use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Optional for worker processes.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string for the result store
    pub database_url: String,

    /// Redis connection string for the job/result queues
    pub queue_url: String,

    /// Redis connection string for the content cache and retry ledger.
    /// May point at the same instance as the queue.
    pub cache_url: String,

    /// Accepted API keys for the HTTP endpoints (comma-separated)
    pub api_keys: Vec<String>,

    /// Timeout for fetching a source image, in seconds
    pub fetch_timeout_secs: u64,

    /// Expiry for cached converted images, in seconds
    pub cache_ttl_secs: u64,

    /// Expiry for per-source retry counters, in seconds
    pub ledger_ttl_secs: u64,

    /// Fetch attempts per source before a job is reported unresolved
    pub max_attempts: u32,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}

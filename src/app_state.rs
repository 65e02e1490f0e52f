use sqlx::PgPool;
use std::sync::Arc;

use crate::services::{kv::RedisKv, queue::RedisQueue};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub queue: Arc<RedisQueue>,
    pub cache_backend: Arc<RedisKv>,
    pub api_keys: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(db: PgPool, queue: RedisQueue, cache_backend: RedisKv, api_keys: Vec<String>) -> Self {
        Self {
            db,
            queue: Arc::new(queue),
            cache_backend: Arc::new(cache_backend),
            api_keys: Arc::new(api_keys),
        }
    }
}

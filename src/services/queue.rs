use async_trait::async_trait;
use redis::AsyncCommands;

use crate::models::job::JobMessage;
use crate::models::result::ResultMessage;

const JOB_QUEUE_KEY: &str = "greyscale:jobs";
const JOB_PROCESSING_KEY: &str = "greyscale:jobs:processing";
const RESULT_QUEUE_KEY: &str = "greyscale:results";
const RESULT_PROCESSING_KEY: &str = "greyscale:results:processing";

/// One delivery of a queued message. The raw payload doubles as the removal
/// token for ack/release.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub payload: String,
}

/// Worker-facing queue operations, at-least-once semantics.
///
/// A received message sits in a processing list until it is either
/// acknowledged (removed for good) or released (pushed back to pending for
/// redelivery). Releasing un-acknowledged messages is the only retry
/// mechanism the pipeline uses.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn receive_job(&self) -> Result<Option<Delivery>, QueueError>;

    /// Remove a delivered message for good.
    async fn ack_job(&self, delivery: &Delivery) -> Result<(), QueueError>;

    /// Return a delivered message to the pending queue for redelivery.
    async fn release_job(&self, delivery: &Delivery) -> Result<(), QueueError>;

    /// Publish a terminal result to the outbound queue.
    async fn publish_result(&self, result: &ResultMessage) -> Result<(), QueueError>;
}

/// Redis-list queue: LPUSH to pending, RPOPLPUSH into a processing list on
/// receive, LREM to ack. Jobs and results use separate list pairs on the
/// same connection.
pub struct RedisQueue {
    client: redis::Client,
}

impl RedisQueue {
    pub fn new(redis_url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(QueueError::Redis)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, QueueError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)
    }

    async fn receive(&self, queue: &str, processing: &str) -> Result<Option<Delivery>, QueueError> {
        let mut conn = self.connection().await?;
        let payload: Option<String> = conn
            .rpoplpush(queue, processing)
            .await
            .map_err(QueueError::Redis)?;
        Ok(payload.map(|payload| Delivery { payload }))
    }

    async fn remove(&self, processing: &str, delivery: &Delivery) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        conn.lrem::<_, _, ()>(processing, 1, &delivery.payload)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    async fn push_back(
        &self,
        queue: &str,
        processing: &str,
        delivery: &Delivery,
    ) -> Result<(), QueueError> {
        // Pending first, processing second: a crash in between leaves a
        // duplicate, which at-least-once delivery already tolerates.
        let mut conn = self.connection().await?;
        conn.lpush::<_, _, ()>(queue, &delivery.payload)
            .await
            .map_err(QueueError::Redis)?;
        conn.lrem::<_, _, ()>(processing, 1, &delivery.payload)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    /// Enqueue a conversion job (submission API side).
    pub async fn enqueue_job(&self, job: &JobMessage) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(job).map_err(QueueError::Serialize)?;
        conn.lpush::<_, _, ()>(JOB_QUEUE_KEY, &payload)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    /// Dequeue a result for persistence (saver side).
    pub async fn receive_result(&self) -> Result<Option<Delivery>, QueueError> {
        self.receive(RESULT_QUEUE_KEY, RESULT_PROCESSING_KEY).await
    }

    pub async fn ack_result(&self, delivery: &Delivery) -> Result<(), QueueError> {
        self.remove(RESULT_PROCESSING_KEY, delivery).await
    }

    pub async fn release_result(&self, delivery: &Delivery) -> Result<(), QueueError> {
        self.push_back(RESULT_QUEUE_KEY, RESULT_PROCESSING_KEY, delivery)
            .await
    }

    /// Current number of pending conversion jobs.
    pub async fn job_queue_depth(&self) -> Result<u64, QueueError> {
        let mut conn = self.connection().await?;
        let depth: u64 = conn
            .llen(JOB_QUEUE_KEY)
            .await
            .map_err(QueueError::Redis)?;
        Ok(depth)
    }

    /// Check Redis connectivity (for health checks).
    pub async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn receive_job(&self) -> Result<Option<Delivery>, QueueError> {
        self.receive(JOB_QUEUE_KEY, JOB_PROCESSING_KEY).await
    }

    async fn ack_job(&self, delivery: &Delivery) -> Result<(), QueueError> {
        self.remove(JOB_PROCESSING_KEY, delivery).await
    }

    async fn release_job(&self, delivery: &Delivery) -> Result<(), QueueError> {
        self.push_back(JOB_QUEUE_KEY, JOB_PROCESSING_KEY, delivery)
            .await
    }

    async fn publish_result(&self, result: &ResultMessage) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(result).map_err(QueueError::Serialize)?;
        conn.lpush::<_, _, ()>(RESULT_QUEUE_KEY, &payload)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

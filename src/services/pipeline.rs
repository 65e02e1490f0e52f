use std::time::Instant;

use base64::Engine;
use tracing::{debug, info, warn};

use crate::models::job::JobMessage;
use crate::models::result::{ResultMessage, ResultType};
use crate::services::cache::ContentCache;
use crate::services::convert;
use crate::services::fetch::{FetchOutcome, ImageFetcher};
use crate::services::fingerprint;
use crate::services::kv::{KvBackend, KvError};
use crate::services::ledger::RetryLedger;
use crate::services::queue::{JobQueue, QueueError};

/// What the worker loop should do with a delivered message.
#[derive(Debug, Clone)]
pub enum Disposition {
    /// The job reached a terminal state: publish the result, then ack.
    Terminal(ResultMessage),
    /// No valid job to act on: ack without publishing anything.
    Discard,
    /// Not terminal yet: release the message for redelivery.
    Retry,
}

/// The conversion pipeline: fetch, fingerprint, cache, convert, retry
/// accounting.
///
/// [`process`](Self::process) decides the fate of one delivered message;
/// queue effects are left to [`run_once`] so the decision logic stays
/// independent of the queue backend. Only cache/ledger backend failures
/// surface as errors — every per-job failure mode maps to a [`Disposition`].
pub struct ConvertPipeline<F, K> {
    fetcher: F,
    cache: ContentCache<K>,
    ledger: RetryLedger<K>,
    max_attempts: u32,
}

impl<F: ImageFetcher, K: KvBackend> ConvertPipeline<F, K> {
    pub fn new(
        fetcher: F,
        cache: ContentCache<K>,
        ledger: RetryLedger<K>,
        max_attempts: u32,
    ) -> Self {
        Self {
            fetcher,
            cache,
            ledger,
            max_attempts,
        }
    }

    pub async fn process(&self, payload: &str) -> Result<Disposition, PipelineError> {
        let job: JobMessage = match serde_json::from_str(payload) {
            Ok(job) => job,
            Err(e) => {
                warn!(error = %e, "Discarding malformed job message");
                metrics::counter!("conversion_jobs_malformed_total").increment(1);
                return Ok(Disposition::Discard);
            }
        };

        let bytes = match self.fetcher.fetch(&job.url).await {
            FetchOutcome::Fetched(bytes) => bytes,
            FetchOutcome::Failed { reason } => {
                return self.handle_fetch_failure(&job, &reason).await;
            }
        };

        let image = match convert::decode(&bytes) {
            Ok(image) => image,
            Err(e) => {
                // Undecodable content stays undecodable on refetch, so this
                // is terminal without touching the retry ledger.
                warn!(job_id = %job.job_id, url = %job.url, error = %e, "Source is not a decodable image");
                metrics::counter!("conversion_jobs_unresolved_total").increment(1);
                return Ok(Disposition::Terminal(ResultMessage::unresolved(job.job_id)));
            }
        };

        let fingerprint = fingerprint::phash(&image);
        let start = Instant::now();

        let (encoded, result_type) = match self.cache.get(fingerprint).await? {
            Some(cached) => {
                debug!(job_id = %job.job_id, %fingerprint, "Content cache hit");
                metrics::counter!("conversion_jobs_cached_total").increment(1);
                (cached, ResultType::Cached)
            }
            None => {
                let png = match convert::to_greyscale_png(&image) {
                    Ok(png) => png,
                    Err(e) => {
                        warn!(job_id = %job.job_id, error = %e, "Greyscale conversion failed");
                        metrics::counter!("conversion_jobs_unresolved_total").increment(1);
                        return Ok(Disposition::Terminal(ResultMessage::unresolved(
                            job.job_id,
                        )));
                    }
                };
                let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
                self.cache.put(fingerprint, &encoded).await?;
                metrics::counter!("conversion_jobs_converted_total").increment(1);
                (encoded, ResultType::Converted)
            }
        };

        metrics::histogram!("conversion_processing_seconds").record(start.elapsed().as_secs_f64());

        info!(
            job_id = %job.job_id,
            %fingerprint,
            result_type = %result_type,
            "Job reached terminal state"
        );

        Ok(Disposition::Terminal(ResultMessage {
            job_id: job.job_id,
            image: encoded,
            result_type,
        }))
    }

    async fn handle_fetch_failure(
        &self,
        job: &JobMessage,
        reason: &str,
    ) -> Result<Disposition, PipelineError> {
        let attempts = self.ledger.record_failure(&job.url).await?;

        if attempts < u64::from(self.max_attempts) {
            info!(
                job_id = %job.job_id,
                url = %job.url,
                attempts,
                max_attempts = self.max_attempts,
                reason,
                "Fetch failed, releasing job for redelivery"
            );
            metrics::counter!("conversion_jobs_requeued_total").increment(1);
            return Ok(Disposition::Retry);
        }

        warn!(
            job_id = %job.job_id,
            url = %job.url,
            attempts,
            reason,
            "Fetch failed after max attempts, reporting unresolved"
        );
        metrics::counter!("conversion_jobs_unresolved_total").increment(1);
        Ok(Disposition::Terminal(ResultMessage::unresolved(job.job_id)))
    }
}

/// Handle one queue delivery to completion.
///
/// Returns `Ok(true)` if a message was processed, `Ok(false)` if the queue
/// was empty. Terminal results are published before the inbound message is
/// acknowledged: a crash between the two causes a duplicate publication
/// (absorbed by the saver's idempotent insert), never a lost result.
pub async fn run_once<Q, F, K>(
    queue: &Q,
    pipeline: &ConvertPipeline<F, K>,
) -> Result<bool, WorkerError>
where
    Q: JobQueue,
    F: ImageFetcher,
    K: KvBackend,
{
    let delivery = match queue.receive_job().await? {
        Some(delivery) => delivery,
        None => return Ok(false),
    };

    match pipeline.process(&delivery.payload).await {
        Ok(Disposition::Terminal(result)) => {
            queue.publish_result(&result).await?;
            queue.ack_job(&delivery).await?;
        }
        Ok(Disposition::Discard) => {
            queue.ack_job(&delivery).await?;
        }
        Ok(Disposition::Retry) => {
            queue.release_job(&delivery).await?;
        }
        Err(e) => {
            // Cache/ledger backend down: leave the message un-acknowledged
            // so it is redelivered once the backend recovers.
            queue.release_job(&delivery).await?;
            return Err(e.into());
        }
    }

    Ok(true)
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Cache/ledger backend error: {0}")]
    Backend(#[from] KvError),
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

//! Test helpers: an in-memory queue with the Redis queue's delivery
//! semantics, a scripted fetcher, and tiny PNG builders.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use greyscaler::models::job::JobMessage;
use greyscaler::models::result::ResultMessage;
use greyscaler::services::fetch::{FetchOutcome, ImageFetcher};
use greyscaler::services::queue::{Delivery, JobQueue, QueueError};

/// In-memory stand-in for the Redis-list queue: pending/processing pair with
/// ack and release, plus a captured list of published results.
#[derive(Default)]
pub struct MemoryQueue {
    pending: Mutex<VecDeque<String>>,
    processing: Mutex<Vec<String>>,
    published: Mutex<Vec<ResultMessage>>,
    acked: AtomicUsize,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, job: &JobMessage) {
        let payload = serde_json::to_string(job).unwrap();
        self.pending.lock().unwrap().push_back(payload);
    }

    pub fn enqueue_raw(&self, payload: &str) {
        self.pending.lock().unwrap().push_back(payload.to_string());
    }

    pub fn published(&self) -> Vec<ResultMessage> {
        self.published.lock().unwrap().clone()
    }

    pub fn acked_count(&self) -> usize {
        self.acked.load(Ordering::SeqCst)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn processing_len(&self) -> usize {
        self.processing.lock().unwrap().len()
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn receive_job(&self) -> Result<Option<Delivery>, QueueError> {
        let Some(payload) = self.pending.lock().unwrap().pop_front() else {
            return Ok(None);
        };
        self.processing.lock().unwrap().push(payload.clone());
        Ok(Some(Delivery { payload }))
    }

    async fn ack_job(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut processing = self.processing.lock().unwrap();
        if let Some(pos) = processing.iter().position(|p| p == &delivery.payload) {
            processing.remove(pos);
            self.acked.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn release_job(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut processing = self.processing.lock().unwrap();
        if let Some(pos) = processing.iter().position(|p| p == &delivery.payload) {
            processing.remove(pos);
        }
        drop(processing);
        self.pending
            .lock()
            .unwrap()
            .push_back(delivery.payload.clone());
        Ok(())
    }

    async fn publish_result(&self, result: &ResultMessage) -> Result<(), QueueError> {
        self.published.lock().unwrap().push(result.clone());
        Ok(())
    }
}

/// Fetcher serving canned bytes per URL; unknown URLs fail the fetch.
pub struct ScriptedFetcher {
    responses: HashMap<String, Vec<u8>>,
}

impl ScriptedFetcher {
    pub fn with(responses: &[(&str, Vec<u8>)]) -> Self {
        Self {
            responses: responses
                .iter()
                .map(|(url, bytes)| (url.to_string(), bytes.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl ImageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        match self.responses.get(url) {
            Some(bytes) => FetchOutcome::Fetched(bytes.clone()),
            None => FetchOutcome::Failed {
                reason: "HTTP status 404 Not Found".to_string(),
            },
        }
    }
}

/// A small RGB PNG whose content varies with `seed`.
pub fn test_png(seed: u8) -> Vec<u8> {
    let image = image::DynamicImage::ImageRgb8(image::ImageBuffer::from_fn(40, 40, |x, y| {
        image::Rgb([(x as u8).wrapping_mul(seed), y as u8, seed])
    }));
    let mut out = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

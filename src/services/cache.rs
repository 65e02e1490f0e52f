use std::time::Duration;

use crate::services::fingerprint::Fingerprint;
use crate::services::kv::{KvBackend, KvError};

const IMAGE_KEY_PREFIX: &str = "greyscale:image:";

/// Fingerprint-keyed cache of converted images.
///
/// Distinct URLs resolving to visually identical content share a fingerprint
/// and therefore a cache entry, so the conversion runs once per content
/// rather than once per job. Writes are idempotent: conversions of the same
/// fingerprint are treated as equivalent, so last-writer-wins needs no
/// locking and a raced double-conversion is only wasted work.
#[derive(Clone)]
pub struct ContentCache<K> {
    kv: K,
    ttl: Duration,
}

impl<K: KvBackend> ContentCache<K> {
    pub fn new(kv: K, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    /// Look up the base64-encoded greyscale PNG for a fingerprint.
    pub async fn get(&self, fingerprint: Fingerprint) -> Result<Option<String>, KvError> {
        self.kv
            .get(&format!("{IMAGE_KEY_PREFIX}{fingerprint}"))
            .await
    }

    /// Store a converted image under its fingerprint.
    pub async fn put(&self, fingerprint: Fingerprint, encoded: &str) -> Result<(), KvError> {
        self.kv
            .put_ex(&format!("{IMAGE_KEY_PREFIX}{fingerprint}"), encoded, self.ttl)
            .await
    }
}

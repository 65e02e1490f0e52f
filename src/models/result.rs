use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Placeholder carried in the `image` field of unresolved results.
pub const UNRESOLVED_SENTINEL: &str = "unresolved";

/// How a terminal result was produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResultType {
    /// Served from the content cache (a prior job produced the same fingerprint).
    Cached,
    /// Converted by this job and written to the cache.
    Converted,
    /// The source could not be fetched or decoded; no image is available.
    Unresolved,
}

/// Terminal outcome of a job, published on the outbound queue.
///
/// Exactly one of these is published per accepted job. `image` holds the
/// base64-encoded greyscale PNG, or [`UNRESOLVED_SENTINEL`] for unresolved
/// jobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultMessage {
    pub job_id: Uuid,
    pub image: String,
    pub result_type: ResultType,
}

impl ResultMessage {
    pub fn unresolved(job_id: Uuid) -> Self {
        Self {
            job_id,
            image: UNRESOLVED_SENTINEL.to_string(),
            result_type: ResultType::Unresolved,
        }
    }
}

/// A persisted result row, keyed by job id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResult {
    pub job_id: Uuid,
    pub image: String,
    pub result_type: ResultType,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ResultType::Cached).unwrap(),
            "\"cached\""
        );
        assert_eq!(
            serde_json::to_string(&ResultType::Converted).unwrap(),
            "\"converted\""
        );
        assert_eq!(
            serde_json::to_string(&ResultType::Unresolved).unwrap(),
            "\"unresolved\""
        );
    }

    #[test]
    fn result_type_parses_from_stored_text() {
        assert_eq!("cached".parse::<ResultType>().unwrap(), ResultType::Cached);
        assert_eq!(
            "converted".parse::<ResultType>().unwrap(),
            ResultType::Converted
        );
        assert!("bogus".parse::<ResultType>().is_err());
    }

    #[test]
    fn unresolved_carries_sentinel() {
        let msg = ResultMessage::unresolved(Uuid::nil());
        assert_eq!(msg.image, UNRESOLVED_SENTINEL);
        assert_eq!(msg.result_type, ResultType::Unresolved);

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["image"], "unresolved");
        assert_eq!(json["result_type"], "unresolved");
    }
}

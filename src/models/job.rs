use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A conversion job as published on the inbound queue.
///
/// The submission API mints the id and publishes the message; the worker
/// consumes one delivery at a time. The payload is immutable once published.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobMessage {
    pub job_id: Uuid,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_field_names() {
        let job = JobMessage {
            job_id: Uuid::nil(),
            url: "https://example.com/cat.png".to_string(),
        };
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["url"], "https://example.com/cat.png");
        assert_eq!(json["job_id"], "00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn round_trips_through_json() {
        let job = JobMessage {
            job_id: Uuid::new_v4(),
            url: "https://example.com/a.jpg".to_string(),
        };
        let payload = serde_json::to_string(&job).unwrap();
        let parsed: JobMessage = serde_json::from_str(&payload).unwrap();
        assert_eq!(parsed, job);
    }
}

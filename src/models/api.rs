use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to submit a URL for greyscale conversion.
#[derive(Debug, Deserialize, Validate)]
pub struct ConvertRequest {
    #[garde(length(min = 1, max = 2048), url)]
    pub url: String,
}

/// Response after submitting a conversion job.
#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub job_id: Uuid,
    pub status: String,
    pub message: String,
}

/// JSON error body used by the API endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

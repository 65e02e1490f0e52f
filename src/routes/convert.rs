use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::api::{ConvertRequest, ConvertResponse, ErrorResponse};
use crate::models::job::JobMessage;

/// POST /api/v1/convert — submit a URL for greyscale conversion.
pub async fn submit_conversion(
    State(state): State<AppState>,
    Json(request): Json<ConvertRequest>,
) -> Result<Json<ConvertResponse>, (StatusCode, Json<ErrorResponse>)> {
    if let Err(report) = request.validate() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(format!(
                "URL in the body is not a valid URL: {report}"
            ))),
        ));
    }

    // Only fetchable schemes; garde's url check also admits ftp:, file:, etc.
    if !request.url.starts_with("http://") && !request.url.starts_with("https://") {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("URL must use the http or https scheme")),
        ));
    }

    let job = JobMessage {
        job_id: Uuid::new_v4(),
        url: request.url,
    };

    match state.queue.enqueue_job(&job).await {
        Ok(()) => {
            metrics::counter!("conversion_jobs_submitted_total").increment(1);
            tracing::info!(job_id = %job.job_id, url = %job.url, "Job submitted");

            Ok(Json(ConvertResponse {
                job_id: job.job_id,
                status: "queued".to_string(),
                message: "Job submitted".to_string(),
            }))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to enqueue job");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Job queue is unavailable")),
            ))
        }
    }
}

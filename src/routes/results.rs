use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::results;
use crate::models::api::ErrorResponse;
use crate::models::result::ResultType;

/// GET /api/v1/result/{job_id} — download the converted image for a job.
pub async fn get_result(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let stored = results::get_result(&state.db, job_id).await.map_err(|e| {
        tracing::error!(job_id = %job_id, error = %e, "Result lookup failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Result store is unavailable")),
        )
    })?;

    let Some(stored) = stored else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                "No such result with job_id (the job may still be processing or no job with this id was submitted)",
            )),
        ));
    };

    if stored.result_type == ResultType::Unresolved {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse::new(
                "The source image could not be retrieved; the job ended unresolved",
            )),
        ));
    }

    let image_bytes = base64::engine::general_purpose::STANDARD
        .decode(&stored.image)
        .map_err(|e| {
            tracing::error!(job_id = %job_id, error = %e, "Stored image is not valid base64");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Stored result is corrupt")),
            )
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=image.png",
            ),
        ],
        image_bytes,
    )
        .into_response())
}

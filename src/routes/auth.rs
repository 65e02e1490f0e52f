use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;

use crate::app_state::AppState;
use crate::models::api::ErrorResponse;

const API_KEY_HEADER: &str = "x-api-key";

/// Reject requests whose `x-api-key` header is not in the configured key set.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(key) if state.api_keys.iter().any(|accepted| accepted == key) => {
            Ok(next.run(request).await)
        }
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Invalid or missing API Key")),
        )),
    }
}

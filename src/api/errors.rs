use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use super::dto::ApiFailureDto;
use crate::snapshot::models::now;

/// Message returned to clients when no reading can be served.
pub const READ_FAILURE: &str = "Failed to read sensor data";

/// Rendered as `500` with the `{ success: false, error, time }` envelope.
/// The underlying cause is logged, not sent to the client.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "Error reading sensor data");
        let body = Json(ApiFailureDto {
            success: false,
            error: READ_FAILURE.to_owned(),
            time: now(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

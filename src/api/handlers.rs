use axum::{extract::State, Json};
use utoipa::OpenApi;

use super::{
    dto::{ApiFailureDto, ApiReadingDto, HealthDto, SnapshotDto},
    errors::AppError,
};
use crate::snapshot::{models::now, SnapshotStore};

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Return the in-memory snapshot as-is. Never consults the mirror file.
#[utoipa::path(
    get,
    path = "/get",
    responses(
        (status = 200, description = "Current snapshot; sensor fields are null before the first successful poll", body = SnapshotDto),
    ),
    tag = "sensors"
)]
pub async fn get_snapshot(State(store): State<SnapshotStore>) -> Json<SnapshotDto> {
    Json(store.read().await.into())
}

/// Return the latest reading wrapped in a `success` envelope.
///
/// Falls back to the mirror file when no poll has succeeded since startup.
/// Answers `500` when neither holds a reading.
#[utoipa::path(
    get,
    path = "/api",
    responses(
        (status = 200, description = "Latest reading", body = ApiReadingDto),
        (status = 500, description = "No reading available", body = ApiFailureDto),
    ),
    tag = "sensors"
)]
pub async fn get_reading(
    State(store): State<SnapshotStore>,
) -> Result<Json<ApiReadingDto>, AppError> {
    let reading = store.read_with_fallback().await?;
    Ok(Json(reading.into()))
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with poll bookkeeping. Staleness is reported, never
/// treated as unhealthy.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is running", body = HealthDto),
    ),
    tag = "system"
)]
pub async fn health(State(store): State<SnapshotStore>) -> Json<HealthDto> {
    let snapshot = store.read().await;
    let status = store.status().await;
    Json(HealthDto::new(&snapshot, status, now()))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(get_snapshot, get_reading, health),
    components(schemas(SnapshotDto, ApiReadingDto, ApiFailureDto, HealthDto)),
    tags(
        (name = "sensors", description = "Cached sensor readings"),
        (name = "system",  description = "System endpoints"),
    ),
    info(
        title = "Sensor Gateway API",
        version = "0.1.0",
        description = "Serves the latest reading polled from the sensor device"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

pub mod dto;
pub mod errors;
pub mod handlers;

use axum::{routing::get, Router};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use handlers::ApiDoc;

use crate::snapshot::SnapshotStore;

pub fn router(store: SnapshotStore) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/get", get(handlers::get_snapshot))
        .route("/api", get(handlers::get_reading))
        .route("/health", get(handlers::health))
        .with_state(store)
        .split_for_parts();

    router.route(
        "/api-docs/openapi.json",
        get(move || async move { axum::Json(api) }),
    )
}

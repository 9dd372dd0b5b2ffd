pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::resume::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/resumes",
            get(handlers::handle_list).post(handlers::handle_create),
        )
        .route(
            "/api/v1/resumes/:id",
            get(handlers::handle_get)
                .put(handlers::handle_update)
                .delete(handlers::handle_delete),
        )
        .route(
            "/api/v1/resumes/:id/photo",
            post(handlers::handle_attach_photo).delete(handlers::handle_detach_photo),
        )
        // Room above the 2048 KB photo cap so size rejection happens in
        // validation, with a field-level error, not at the transport layer.
        .layer(DefaultBodyLimit::max(8 * 1024 * 1024))
        .with_state(state)
}

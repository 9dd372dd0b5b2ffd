use std::sync::Arc;

use sqlx::PgPool;

use crate::storage::BlobStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Blob storage behind a trait object so tests can swap in an
    /// in-memory implementation.
    pub storage: Arc<dyn BlobStore>,
}

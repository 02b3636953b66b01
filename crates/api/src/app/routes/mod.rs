use axum::{
    Router,
    routing::{get, post},
};

pub mod analytics;
pub mod records;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/records", get(records::list_records))
        .route("/records/:id/approve", post(records::approve_record))
        .route("/analytics/summary", get(analytics::summary))
}

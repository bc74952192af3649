use axum::{Router, routing::get};

pub mod activity;
pub mod bins;
pub mod system;
pub mod units;

/// Router for all warehouse endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/summary", get(system::summary))
        .nest("/units", units::router())
        .nest("/bins", bins::router())
        .nest("/reassignments", units::reassignment_router())
        .nest("/activity", activity::router())
}

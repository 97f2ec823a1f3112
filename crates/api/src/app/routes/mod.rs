use axum::{
    routing::{get, post},
    Router,
};

pub mod allocations;
pub mod batches;
pub mod system;

/// Router for the versioned allocation endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/batches", post(batches::create_batch).get(batches::list_batches))
        .route("/allocations", post(allocations::allocate))
}

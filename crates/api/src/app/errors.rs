use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use allocation_infra::AllocationError;
use allocation_infra::repository::RepositoryError;

pub fn allocation_error_to_response(err: AllocationError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        AllocationError::NoBatchesAvailable => {
            json_error(StatusCode::NOT_FOUND, "no_batches_available", message)
        }
        AllocationError::InvalidSku(_) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_sku", message)
        }
        AllocationError::OutOfStock => json_error(StatusCode::BAD_REQUEST, "out_of_stock", message),
        AllocationError::Validation(_) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", message)
        }
        AllocationError::Storage(
            RepositoryError::Duplicate(_) | RepositoryError::Concurrency(_),
        ) => {
            json_error(StatusCode::CONFLICT, "conflict", message)
        }
        AllocationError::Storage(e) => {
            tracing::error!(error = %e, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", message)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

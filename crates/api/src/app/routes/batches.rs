use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::dto;
use crate::app::errors;
use crate::app::services::AppServices;

pub async fn create_batch(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateBatchRequest>,
) -> axum::response::Response {
    match services
        .add_batch(&body.reference, &body.sku, body.qty, body.eta)
        .await
    {
        Ok(()) => (
            StatusCode::CREATED,
            Json(dto::ReferenceResponse {
                reference: body.reference,
            }),
        )
            .into_response(),
        Err(e) => errors::allocation_error_to_response(e),
    }
}

pub async fn list_batches(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.list_batches().await {
        Ok(batches) => {
            let body: Vec<dto::BatchResponse> =
                batches.iter().map(dto::BatchResponse::from).collect();
            Json(body).into_response()
        }
        Err(e) => errors::allocation_error_to_response(e),
    }
}

use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::dto;
use crate::app::errors;
use crate::app::services::AppServices;

pub async fn allocate(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::AllocateRequest>,
) -> axum::response::Response {
    tracing::info!(
        order_id = %body.order_id,
        sku = %body.sku,
        qty = body.qty,
        "allocating order line"
    );

    match services.allocate(&body.order_id, &body.sku, body.qty).await {
        Ok(reference) => {
            (StatusCode::CREATED, Json(dto::ReferenceResponse { reference })).into_response()
        }
        Err(e) => errors::allocation_error_to_response(e),
    }
}

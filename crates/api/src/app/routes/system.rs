use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::errors;
use crate::service::WarehouseService;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn summary(Extension(service): Extension<Arc<WarehouseService>>) -> axum::response::Response {
    match service.summary() {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => errors::warehouse_error_to_response(e),
    }
}

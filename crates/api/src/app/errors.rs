use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use solewms_warehouse::WarehouseError;

pub fn warehouse_error_to_response(err: WarehouseError) -> axum::response::Response {
    let (status, code) = match &err {
        WarehouseError::IllegalTransition { .. } => (StatusCode::CONFLICT, "illegal_transition"),
        WarehouseError::ScanMismatch { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "scan_mismatch"),
        WarehouseError::CapacityExceeded { .. } => (StatusCode::CONFLICT, "capacity_exceeded"),
        WarehouseError::InvalidRelease { .. } => (StatusCode::CONFLICT, "invalid_release"),
        WarehouseError::SelfSwap { .. } => (StatusCode::BAD_REQUEST, "self_swap"),
        WarehouseError::UnitNotFound(_) => (StatusCode::NOT_FOUND, "unit_not_found"),
        WarehouseError::BinNotFound(_) => (StatusCode::NOT_FOUND, "bin_not_found"),
        WarehouseError::DuplicateUnit(_) => (StatusCode::CONFLICT, "duplicate_unit"),
        WarehouseError::DuplicateBin(_) => (StatusCode::CONFLICT, "duplicate_bin"),
        WarehouseError::BinNotEmpty { .. } => (StatusCode::CONFLICT, "bin_not_empty"),
        WarehouseError::BinUnavailable { .. } => (StatusCode::CONFLICT, "bin_unavailable"),
        WarehouseError::IncompatibleSwap(_) => (StatusCode::UNPROCESSABLE_ENTITY, "incompatible_swap"),
        WarehouseError::ConcurrentModification(_) => (StatusCode::CONFLICT, "conflict"),
        WarehouseError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        WarehouseError::LockPoisoned(_) => (StatusCode::INTERNAL_SERVER_ERROR, "lock_poisoned"),
        WarehouseError::Ledger(_) => (StatusCode::SERVICE_UNAVAILABLE, "ledger_unavailable"),
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    json_error(status, code, err.to_string())
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

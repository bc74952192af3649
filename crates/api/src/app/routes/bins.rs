use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use solewms_warehouse::BinCode;

use crate::app::{dto, errors};
use crate::service::WarehouseService;

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_bin).get(list_bins))
        .route("/:code", get(get_bin))
        .route("/:code/maintenance", post(set_maintenance))
        .route("/:code/archive", post(archive_bin))
        .route("/:code/restore", post(restore_bin))
}

fn parse_bin_code(code: &str) -> Result<BinCode, axum::response::Response> {
    BinCode::new(code).map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_bin_code", e.to_string()))
}

pub async fn register_bin(
    Extension(service): Extension<Arc<WarehouseService>>,
    Json(body): Json<dto::RegisterBinRequest>,
) -> axum::response::Response {
    let code = match parse_bin_code(&body.bin_code) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let actor = match dto::actor_or_system(body.actor) {
        Ok(a) => a,
        Err(e) => return errors::warehouse_error_to_response(e),
    };

    match service.register_bin(code, body.size_class, body.capacity, &actor) {
        Ok(bin) => (StatusCode::CREATED, Json(dto::BinView::from(&bin))).into_response(),
        Err(e) => errors::warehouse_error_to_response(e),
    }
}

/// `?size_class=M` returns the non-archived bins of that class, otherwise
/// every bin.
pub async fn list_bins(
    Extension(service): Extension<Arc<WarehouseService>>,
    Query(query): Query<dto::BinsQuery>,
) -> axum::response::Response {
    let result = match query.size_class {
        Some(size_class) => service.get_bins_by_size(size_class),
        None => service.list_bins(),
    };
    match result {
        Ok(bins) => Json(dto::bin_views(&bins)).into_response(),
        Err(e) => errors::warehouse_error_to_response(e),
    }
}

pub async fn get_bin(
    Extension(service): Extension<Arc<WarehouseService>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    let code = match parse_bin_code(&code) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match service.get_bin(&code) {
        Ok(bin) => Json(dto::BinView::from(&bin)).into_response(),
        Err(e) => errors::warehouse_error_to_response(e),
    }
}

pub async fn set_maintenance(
    Extension(service): Extension<Arc<WarehouseService>>,
    Path(code): Path<String>,
    Json(body): Json<dto::MaintenanceRequest>,
) -> axum::response::Response {
    let enabled = body.enabled;
    bin_admin(&service, &code, body.actor, |service, code, actor| {
        service.set_bin_maintenance(code, enabled, actor)
    })
}

pub async fn archive_bin(
    Extension(service): Extension<Arc<WarehouseService>>,
    Path(code): Path<String>,
    body: Option<Json<dto::ActorRequest>>,
) -> axum::response::Response {
    let actor = body.and_then(|Json(b)| b.actor);
    bin_admin(&service, &code, actor, |service, code, actor| service.archive_bin(code, actor))
}

pub async fn restore_bin(
    Extension(service): Extension<Arc<WarehouseService>>,
    Path(code): Path<String>,
    body: Option<Json<dto::ActorRequest>>,
) -> axum::response::Response {
    let actor = body.and_then(|Json(b)| b.actor);
    bin_admin(&service, &code, actor, |service, code, actor| service.restore_bin(code, actor))
}

/// Run an admin operation and answer with the bin plus whether anything changed.
fn bin_admin(
    service: &WarehouseService,
    code: &str,
    actor: Option<String>,
    op: impl FnOnce(&WarehouseService, &BinCode, &solewms_core::Actor) -> solewms_warehouse::WarehouseResult<bool>,
) -> axum::response::Response {
    let code = match parse_bin_code(code) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let actor = match dto::actor_or_system(actor) {
        Ok(a) => a,
        Err(e) => return errors::warehouse_error_to_response(e),
    };

    match op(service, &code, &actor).and_then(|changed| Ok((changed, service.get_bin(&code)?))) {
        Ok((changed, bin)) => Json(serde_json::json!({
            "changed": changed,
            "bin": dto::BinView::from(&bin),
        }))
        .into_response(),
        Err(e) => errors::warehouse_error_to_response(e),
    }
}

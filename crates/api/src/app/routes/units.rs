use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use solewms_core::UnitId;
use solewms_warehouse::{InventoryUnit, WarehouseResult};

use crate::app::{dto, errors};
use crate::service::WarehouseService;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_unit).get(list_units))
        .route("/:id", get(get_unit))
        .route("/:id/arrive", post(mark_arrived))
        .route("/:id/accept", post(accept))
        .route("/:id/overflow", post(assign_overflow))
        .route("/:id/locate", post(locate))
        .route("/:id/pick", post(confirm_pick))
        .route("/:id/handoff", post(hand_off))
        .route("/:id/receipt", post(confirm_receipt))
        .route("/:id/process", post(start_processing))
        .route("/:id/complete", post(confirm_complete))
}

pub fn reassignment_router() -> Router {
    Router::new().route("/", post(reassign).get(list_reassignments))
}

fn unit_response(result: WarehouseResult<InventoryUnit>) -> axum::response::Response {
    match result {
        Ok(unit) => Json(unit).into_response(),
        Err(e) => errors::warehouse_error_to_response(e),
    }
}

fn parse_unit_id(id: &str) -> Result<UnitId, axum::response::Response> {
    UnitId::new(id).map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

pub async fn create_unit(
    Extension(service): Extension<Arc<WarehouseService>>,
    Json(body): Json<dto::CreateUnitRequest>,
) -> axum::response::Response {
    let in_transit = body.in_transit;
    let result = body.into_command().and_then(|request| {
        if in_transit {
            service.register_in_transit(request)
        } else {
            service.create_inventory_unit(request)
        }
    });

    match result.and_then(|id| service.get_unit(&id)) {
        Ok(unit) => (StatusCode::CREATED, Json(unit)).into_response(),
        Err(e) => errors::warehouse_error_to_response(e),
    }
}

pub async fn list_units(Extension(service): Extension<Arc<WarehouseService>>) -> axum::response::Response {
    match service.list_units() {
        Ok(units) => Json(units).into_response(),
        Err(e) => errors::warehouse_error_to_response(e),
    }
}

pub async fn get_unit(
    Extension(service): Extension<Arc<WarehouseService>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let unit_id = match parse_unit_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    unit_response(service.get_unit(&unit_id))
}

pub async fn mark_arrived(
    Extension(service): Extension<Arc<WarehouseService>>,
    Path(id): Path<String>,
    body: Option<Json<dto::TransitionRequest>>,
) -> axum::response::Response {
    simple_transition(&id, body, |unit_id, actor, expected| {
        service.mark_arrived_expecting(unit_id, actor, expected)
    })
}

pub async fn accept(
    Extension(service): Extension<Arc<WarehouseService>>,
    Path(id): Path<String>,
    body: Option<Json<dto::TransitionRequest>>,
) -> axum::response::Response {
    let unit_id = match parse_unit_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let actor = match dto::actor_or_system(body.actor) {
        Ok(a) => a,
        Err(e) => return errors::warehouse_error_to_response(e),
    };

    let expected = dto::expected_version(body.expected_version);
    let decision = match service.accept_expecting(&unit_id, &actor, expected) {
        Ok(d) => d,
        Err(e) => return errors::warehouse_error_to_response(e),
    };
    let unit = match service.get_unit(&unit_id) {
        Ok(u) => u,
        Err(e) => return errors::warehouse_error_to_response(e),
    };

    Json(serde_json::json!({
        "decision": decision,
        "unit": unit,
    }))
    .into_response()
}

pub async fn assign_overflow(
    Extension(service): Extension<Arc<WarehouseService>>,
    Path(id): Path<String>,
    body: Option<Json<dto::TransitionRequest>>,
) -> axum::response::Response {
    simple_transition(&id, body, |unit_id, actor, expected| {
        service.assign_overflow_expecting(unit_id, actor, expected)
    })
}

pub async fn locate(
    Extension(service): Extension<Arc<WarehouseService>>,
    Path(id): Path<String>,
    body: Option<Json<dto::TransitionRequest>>,
) -> axum::response::Response {
    simple_transition(&id, body, |unit_id, actor, expected| {
        service.locate_expecting(unit_id, actor, expected)
    })
}

pub async fn hand_off(
    Extension(service): Extension<Arc<WarehouseService>>,
    Path(id): Path<String>,
    body: Option<Json<dto::TransitionRequest>>,
) -> axum::response::Response {
    simple_transition(&id, body, |unit_id, actor, expected| {
        service.hand_off_expecting(unit_id, actor, expected)
    })
}

pub async fn start_processing(
    Extension(service): Extension<Arc<WarehouseService>>,
    Path(id): Path<String>,
    body: Option<Json<dto::TransitionRequest>>,
) -> axum::response::Response {
    simple_transition(&id, body, |unit_id, actor, expected| {
        service.start_processing_expecting(unit_id, actor, expected)
    })
}

pub async fn confirm_pick(
    Extension(service): Extension<Arc<WarehouseService>>,
    Path(id): Path<String>,
    Json(body): Json<dto::ScanRequest>,
) -> axum::response::Response {
    scan_transition(&id, body, |unit_id, scanned, actor, expected| {
        service.confirm_pick_expecting(unit_id, scanned, actor, expected)
    })
}

pub async fn confirm_receipt(
    Extension(service): Extension<Arc<WarehouseService>>,
    Path(id): Path<String>,
    Json(body): Json<dto::ScanRequest>,
) -> axum::response::Response {
    scan_transition(&id, body, |unit_id, scanned, actor, expected| {
        service.confirm_receipt_expecting(unit_id, scanned, actor, expected)
    })
}

pub async fn confirm_complete(
    Extension(service): Extension<Arc<WarehouseService>>,
    Path(id): Path<String>,
    Json(body): Json<dto::ScanRequest>,
) -> axum::response::Response {
    scan_transition(&id, body, |unit_id, scanned, actor, expected| {
        service.confirm_complete_expecting(unit_id, scanned, actor, expected)
    })
}

fn simple_transition(
    id: &str,
    body: Option<Json<dto::TransitionRequest>>,
    op: impl FnOnce(&UnitId, &solewms_core::Actor, solewms_core::ExpectedVersion) -> WarehouseResult<InventoryUnit>,
) -> axum::response::Response {
    let unit_id = match parse_unit_id(id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let actor = match dto::actor_or_system(body.actor) {
        Ok(a) => a,
        Err(e) => return errors::warehouse_error_to_response(e),
    };
    unit_response(op(&unit_id, &actor, dto::expected_version(body.expected_version)))
}

fn scan_transition(
    id: &str,
    body: dto::ScanRequest,
    op: impl FnOnce(&UnitId, &str, &solewms_core::Actor, solewms_core::ExpectedVersion) -> WarehouseResult<InventoryUnit>,
) -> axum::response::Response {
    let unit_id = match parse_unit_id(id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let actor = match dto::actor_or_system(body.actor) {
        Ok(a) => a,
        Err(e) => return errors::warehouse_error_to_response(e),
    };
    unit_response(op(
        &unit_id,
        &body.scanned_code,
        &actor,
        dto::expected_version(body.expected_version),
    ))
}

pub async fn reassign(
    Extension(service): Extension<Arc<WarehouseService>>,
    Json(body): Json<dto::ReassignRequest>,
) -> axum::response::Response {
    let unit_a = match parse_unit_id(&body.unit_id_a) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let unit_b = match parse_unit_id(&body.unit_id_b) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let actor = match dto::actor_or_system(body.actor) {
        Ok(a) => a,
        Err(e) => return errors::warehouse_error_to_response(e),
    };

    match service.reassign(&unit_a, &unit_b, &body.reason, &actor) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => errors::warehouse_error_to_response(e),
    }
}

pub async fn list_reassignments(
    Extension(service): Extension<Arc<WarehouseService>>,
    Query(query): Query<dto::ReassignmentsQuery>,
) -> axum::response::Response {
    let unit_id = match query.unit_id.as_deref().map(parse_unit_id).transpose() {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match service.get_reassignments(unit_id.as_ref()) {
        Ok(records) => Json(records).into_response(),
        Err(e) => errors::warehouse_error_to_response(e),
    }
}

//! Activity ledger queries and the live SSE feed.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
    routing::get,
};
use tokio::sync::mpsc::unbounded_channel;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::app::{dto, errors};
use crate::service::WarehouseService;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_activity))
        .route("/stream", get(stream_activity))
}

/// GET /activity?unit_id=&bin_code=&actor=&action=&since=&until=&limit=&offset=
pub async fn get_activity(
    Extension(service): Extension<Arc<WarehouseService>>,
    Query(query): Query<dto::ActivityQuery>,
) -> axum::response::Response {
    let filter = match query.filter() {
        Ok(f) => f,
        Err(e) => return errors::warehouse_error_to_response(e),
    };
    match service.get_activity(&filter, query.limit, query.offset) {
        Ok(page) => Json(page).into_response(),
        Err(e) => errors::warehouse_error_to_response(e),
    }
}

/// GET /activity/stream
///
/// Server-Sent Events feed of ledger entries committed after the client
/// connects, optionally narrowed by the same filters as `GET /activity`.
pub async fn stream_activity(
    Extension(service): Extension<Arc<WarehouseService>>,
    Query(query): Query<dto::ActivityQuery>,
) -> axum::response::Response {
    let filter = match query.filter() {
        Ok(f) => f,
        Err(e) => return errors::warehouse_error_to_response(e),
    };

    let (tx, rx) = unbounded_channel::<Result<SseEvent, std::convert::Infallible>>();
    let subscription = service.subscribe_activity();

    // The subscription is a blocking receiver; bridge it into the async stream.
    tokio::task::spawn_blocking(move || {
        loop {
            if tx.is_closed() {
                break;
            }
            match subscription.recv_timeout(Duration::from_millis(1000)) {
                Ok(entry) => {
                    if !filter.matches(&entry) {
                        continue;
                    }
                    let json_str = match serde_json::to_string(&entry) {
                        Ok(s) => s,
                        Err(_) => continue,
                    };
                    let event = SseEvent::default()
                        .event(entry.action.as_str())
                        .id(entry.id.to_string())
                        .data(json_str);
                    if tx.send(Ok(event)).is_err() {
                        break;
                    }
                }
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::debug!("activity stream closed");
    });

    Sse::new(UnboundedReceiverStream::new(rx))
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
        .into_response()
}

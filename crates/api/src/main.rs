use std::sync::Arc;

use anyhow::Context;

use solewms_api::{WarehouseService, app, demo};
use solewms_infra::WarehouseConfig;
use solewms_observability::LogFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let format = std::env::var("SOLEWMS_LOG_FORMAT")
        .ok()
        .and_then(|v| v.parse::<LogFormat>().ok())
        .unwrap_or_default();
    solewms_observability::init_with(format);

    let config = WarehouseConfig::from_env();
    let service = Arc::new(WarehouseService::new(config).context("failed to start warehouse service")?);

    if std::env::var("SOLEWMS_SEED_DEMO").is_ok_and(|v| v != "0" && !v.eq_ignore_ascii_case("false")) {
        demo::seed_demo_floor(&service).context("failed to seed demo floor")?;
    }

    let addr = std::env::var("SOLEWMS_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app::build_app(service)).await?;
    Ok(())
}

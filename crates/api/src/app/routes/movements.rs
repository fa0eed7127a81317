use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use stockledger_inventory::MovementId;

use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_movement).get(list_movements))
        .route("/stats", get(movement_stats))
        .route("/:id", get(get_movement))
        .route("/:id/reverse", post(reverse_movement))
}

pub async fn create_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    ApiJson(body): ApiJson<dto::CreateMovementRequest>,
) -> axum::response::Response {
    let request = match body.into_domain() {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match services.engine.apply_movement(tenant.tenant_id(), request).await {
        Ok(applied) => (
            StatusCode::CREATED,
            Json(json!({
                "movement": applied.movement,
                "product": dto::product_to_json(&applied.product),
            })),
        )
            .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn reverse_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::ReverseMovementRequest>,
) -> axum::response::Response {
    let movement_id: MovementId = match id.trim().parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("movement"),
    };
    match services
        .engine
        .reverse_movement(tenant.tenant_id(), body.into_domain(movement_id))
        .await
    {
        Ok(reversed) => (
            StatusCode::CREATED,
            Json(json!({
                "reversal": reversed.reversal,
                "original": reversed.original,
                "product": dto::product_to_json(&reversed.product),
            })),
        )
            .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn get_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let movement_id: MovementId = match id.trim().parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("movement"),
    };
    match services.engine.get_movement(tenant.tenant_id(), movement_id).await {
        Ok(movement) => (StatusCode::OK, Json(movement)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<dto::MovementListQuery>,
) -> axum::response::Response {
    let (filter, pagination) = match query.into_parts() {
        Ok(parts) => parts,
        Err(resp) => return resp,
    };
    match services
        .engine
        .list_movements(tenant.tenant_id(), filter, pagination)
        .await
    {
        Ok(page) => (StatusCode::OK, Json(dto::page_to_json(page, |m| json!(m)))).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

/// Grouped by (type, reason) over the requested window (last 30 days by default).
pub async fn movement_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<dto::StatsQuery>,
) -> axum::response::Response {
    let window = match query.into_window(Utc::now()) {
        Ok(w) => w,
        Err(resp) => return resp,
    };
    match services.engine.movement_stats(tenant.tenant_id(), window).await {
        Ok(stats) => (
            StatusCode::OK,
            Json(json!({
                "date_from": window.from,
                "date_to": window.to,
                "stats": stats,
            })),
        )
            .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use stockledger_products::NewProduct;

use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/:id", get(get_product).patch(update_product))
        .route("/:id/activate", post(activate_product))
        .route("/:id/deactivate", post(deactivate_product))
        .route("/:id/movements", get(product_movements))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    ApiJson(body): ApiJson<NewProduct>,
) -> axum::response::Response {
    match services.catalog.create_product(tenant.tenant_id(), body).await {
        Ok(product) => (StatusCode::CREATED, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<dto::ProductListQuery>,
) -> axum::response::Response {
    let (filter, pagination) = query.into_parts();
    match services.catalog.list_products(tenant.tenant_id(), filter, pagination).await {
        Ok(page) => (StatusCode::OK, Json(dto::page_to_json(page, dto::product_to_json))).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match dto::parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog.get_product(tenant.tenant_id(), product_id).await {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::UpdateProductRequest>,
) -> axum::response::Response {
    let product_id = match dto::parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .catalog
        .update_product(tenant.tenant_id(), product_id, body.into())
        .await
    {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn activate_product(
    services: Extension<Arc<AppServices>>,
    tenant: Extension<TenantContext>,
    id: Path<String>,
) -> axum::response::Response {
    set_active(services, tenant, id, true).await
}

pub async fn deactivate_product(
    services: Extension<Arc<AppServices>>,
    tenant: Extension<TenantContext>,
    id: Path<String>,
) -> axum::response::Response {
    set_active(services, tenant, id, false).await
}

async fn set_active(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    active: bool,
) -> axum::response::Response {
    let product_id = match dto::parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .catalog
        .set_product_active(tenant.tenant_id(), product_id, active)
        .await
    {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

/// Newest-first history of one product, reversed rows included.
pub async fn product_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    Query(query): Query<dto::HistoryQuery>,
) -> axum::response::Response {
    let product_id = match dto::parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .engine
        .movements_for_product(tenant.tenant_id(), product_id, query.limit)
        .await
    {
        Ok(items) => (
            StatusCode::OK,
            Json(json!({
                "product_id": product_id.to_string(),
                "items": items,
            })),
        )
            .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

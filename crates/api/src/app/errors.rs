use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use stockledger_infra::{CatalogError, EngineError, StoreError};
use stockledger_inventory::MovementError;

pub fn engine_error_to_response(err: EngineError) -> axum::response::Response {
    match err {
        EngineError::Movement(e) => movement_error_to_response(e),
        EngineError::ConcurrencyConflict(msg) => json_error(StatusCode::CONFLICT, "concurrency_conflict", msg),
        EngineError::Store(e) => store_error_to_response(e),
    }
}

pub fn movement_error_to_response(err: MovementError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        MovementError::Validation(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
        MovementError::InvalidMovementType(_) => json_error(StatusCode::BAD_REQUEST, "invalid_movement_type", message),
        MovementError::InvalidReason(_) => json_error(StatusCode::BAD_REQUEST, "invalid_reason", message),
        MovementError::InvalidQuantity(_) => json_error(StatusCode::BAD_REQUEST, "invalid_quantity", message),
        MovementError::InsufficientStock { current, requested } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            axum::Json(json!({
                "error": "insufficient_stock",
                "message": message,
                "current_stock": current,
                "requested": requested,
            })),
        )
            .into_response(),
        MovementError::ProductNotFound => json_error(StatusCode::NOT_FOUND, "product_not_found", message),
        MovementError::MovementNotFound => json_error(StatusCode::NOT_FOUND, "movement_not_found", message),
        MovementError::ProductInactive => json_error(StatusCode::CONFLICT, "product_inactive", message),
        MovementError::AlreadyReversed => json_error(StatusCode::CONFLICT, "already_reversed", message),
        MovementError::LedgerInvariant(_) => {
            error!(error = %message, "ledger invariant violated");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "ledger_invariant", message)
        }
    }
}

pub fn catalog_error_to_response(err: CatalogError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        CatalogError::Validation(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
        CatalogError::NotFound => json_error(StatusCode::NOT_FOUND, "product_not_found", message),
        CatalogError::DuplicateSku(_) => json_error(StatusCode::CONFLICT, "duplicate_sku", message),
        CatalogError::SkuGenerationExhausted { .. } => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "sku_generation_failed", message)
        }
        CatalogError::ConcurrencyConflict(_) => json_error(StatusCode::CONFLICT, "concurrency_conflict", message),
        CatalogError::Store(e) => store_error_to_response(e),
    }
}

fn store_error_to_response(err: StoreError) -> axum::response::Response {
    error!(error = %err, "store failure");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
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

pub fn invalid_id(what: &str) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id"))
}

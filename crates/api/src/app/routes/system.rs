use std::sync::Arc;

use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::app::services::AppServices;

/// Liveness plus the storage backend in use. Needs no tenant.
pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> Json<Value> {
    Json(json!({ "status": "ok", "backend": services.backend() }))
}

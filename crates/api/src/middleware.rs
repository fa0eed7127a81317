use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use stockledger_core::TenantId;

use crate::app::errors::json_error;
use crate::context::TenantContext;

/// Header carrying the caller's tenant.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Resolve the tenant from `X-Tenant-Id` and attach a [`TenantContext`].
pub async fn tenant_middleware(mut req: axum::http::Request<axum::body::Body>, next: Next) -> Response {
    let tenant_id = match extract_tenant(req.headers()) {
        Ok(id) => id,
        Err(message) => return json_error(StatusCode::BAD_REQUEST, "missing_tenant", message),
    };

    req.extensions_mut().insert(TenantContext::new(tenant_id));
    next.run(req).await
}

fn extract_tenant(headers: &HeaderMap) -> Result<TenantId, &'static str> {
    let header = headers.get(TENANT_HEADER).ok_or("X-Tenant-Id header is required")?;
    let value = header.to_str().map_err(|_| "X-Tenant-Id must be ASCII")?;
    let value = value.trim();
    if value.is_empty() {
        return Err("X-Tenant-Id header is required");
    }
    value.parse().map_err(|_| "X-Tenant-Id must be a UUID")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn tenant_header_must_be_a_uuid() {
        let mut headers = HeaderMap::new();
        assert!(extract_tenant(&headers).is_err());

        headers.insert(TENANT_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert_eq!(extract_tenant(&headers), Err("X-Tenant-Id must be a UUID"));

        let tenant = TenantId::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_str(&tenant.to_string()).unwrap());
        assert_eq!(extract_tenant(&headers), Ok(tenant));
    }
}

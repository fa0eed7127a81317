use std::sync::Arc;

use anyhow::Context;

use stockledger_api::app::{build_app, services::build_services};
use stockledger_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockledger_observability::init();

    let config = ApiConfig::from_env()?;
    let services = Arc::new(build_services(&config).await?);
    let backend = services.backend();
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, backend, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}

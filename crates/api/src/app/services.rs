//! Store selection and the handles every handler shares.

use std::sync::Arc;

use tracing::{info, warn};

use stockledger_infra::{InMemoryInventoryStore, InventoryStore, PostgresInventoryStore, ProductCatalog, ProductLocks, StockEngine};

use crate::config::ApiConfig;

/// Engine and catalog over one store, sharing one lock registry.
pub struct AppServices {
    pub engine: StockEngine<dyn InventoryStore>,
    pub catalog: ProductCatalog<dyn InventoryStore>,
    backend: &'static str,
}

impl AppServices {
    pub fn new(store: Arc<dyn InventoryStore>, backend: &'static str) -> Self {
        let locks = Arc::new(ProductLocks::new());
        Self {
            engine: StockEngine::with_locks(store.clone(), locks.clone()),
            catalog: ProductCatalog::new(store, locks),
            backend,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryInventoryStore::new()), "in_memory")
    }

    /// Name of the storage backend (`in_memory` or `postgres`), reported by `/health`.
    pub fn backend(&self) -> &'static str {
        self.backend
    }
}

/// Postgres when `DATABASE_URL` is configured, in-memory otherwise.
pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresInventoryStore::connect(url, config.db_max_connections).await?;
            store.migrate().await?;
            info!(max_connections = config.db_max_connections, "using postgres inventory store");
            Ok(AppServices::new(Arc::new(store), "postgres"))
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory store (data is lost on restart)");
            Ok(AppServices::in_memory())
        }
    }
}

//! Per-product exclusive locks.
//!
//! Every writer of a product (movement engine, catalog updates) takes the
//! product's lock before reading it and holds it until its commit returns.
//! Different products never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use stockledger_core::TenantId;
use stockledger_products::ProductId;

/// Registry size above which idle entries are dropped.
const PRUNE_THRESHOLD: usize = 1024;

type LockKey = (TenantId, ProductId);

#[derive(Debug, Default)]
pub struct ProductLocks {
    locks: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one read-check-commit cycle.
#[derive(Debug)]
pub struct ProductGuard {
    _guard: OwnedMutexGuard<()>,
}

impl ProductLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, tenant_id: TenantId, product_id: ProductId) -> ProductGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() > PRUNE_THRESHOLD {
                // Only the map holds an idle lock.
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry((tenant_id, product_id)).or_default().clone()
        };
        ProductGuard {
            _guard: lock.lock_owned().await,
        }
    }

    /// Number of tracked products.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

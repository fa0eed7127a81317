//! Stock mutation pipeline (application-level orchestration).
//!
//! ## Movement Flow
//!
//! ```text
//! MovementRequest
//!   ↓
//! 1. Acquire the product's exclusive lock (tenant-scoped)
//!   ↓
//! 2. Load the product; `previous = current_stock`
//!   ↓
//! 3. Plan (pure): validate, check sufficiency, compute new stock, verify arithmetic
//!   ↓
//! 4. Commit ledger row + product atomically, guarded by the observed version
//!   ↓
//! 5. Release the lock, return both records
//! ```
//!
//! Reversals follow the same flow with the original movement re-read under the
//! lock, and the store flags the original inside the same atomic unit.
//!
//! ## Error Semantics
//!
//! - Domain rejections (`Validation`, `InsufficientStock`, `ProductInactive`, ...) → `EngineError::Movement`
//! - Version mismatch at commit → `EngineError::ConcurrencyConflict` (safe to retry from a fresh read)
//! - Anything else from the store → `EngineError::Store`
//!
//! Nothing is retried here and a failed operation leaves no partial writes.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use stockledger_core::TenantId;
use stockledger_inventory::{
    plan_movement, plan_reversal, MovementError, MovementId, MovementRequest, MovementStats, ReversalRequest,
    StatsWindow, StockMovement,
};
use stockledger_products::{Product, ProductId};

use crate::locks::ProductLocks;
use crate::store::{InventoryStore, MovementFilter, MovementPage, Pagination, StoreError};
use crate::store::query::{DEFAULT_PRODUCT_HISTORY_LIMIT, MAX_PAGE_LIMIT};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Movement(#[from] MovementError),

    /// The product changed between read and commit.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) => EngineError::ConcurrencyConflict(msg),
            StoreError::AlreadyReversed => EngineError::Movement(MovementError::AlreadyReversed),
            other => EngineError::Store(other),
        }
    }
}

/// Result of a committed movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedMovement {
    pub movement: StockMovement,
    pub product: Product,
}

/// Result of a committed reversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReversedMovement {
    /// The compensating movement.
    pub reversal: StockMovement,
    /// The original, now flagged as reversed.
    pub original: StockMovement,
    pub product: Product,
}

/// Movement Engine and Reversal Engine over an injected store.
#[derive(Debug)]
pub struct StockEngine<S: ?Sized> {
    store: Arc<S>,
    locks: Arc<ProductLocks>,
}

impl<S: ?Sized> Clone for StockEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            locks: self.locks.clone(),
        }
    }
}

impl<S: InventoryStore + ?Sized> StockEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_locks(store, Arc::new(ProductLocks::new()))
    }

    /// Share a lock registry with other writers of the same products.
    pub fn with_locks(store: Arc<S>, locks: Arc<ProductLocks>) -> Self {
        Self { store, locks }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Record a movement and update the product's stock.
    #[instrument(
        skip(self, request),
        fields(
            tenant_id = %tenant_id,
            product_id = %request.product_id,
            movement_type = %request.movement_type,
            quantity = request.quantity
        ),
        err
    )]
    pub async fn apply_movement(
        &self,
        tenant_id: TenantId,
        request: MovementRequest,
    ) -> Result<AppliedMovement, EngineError> {
        let _guard = self.locks.acquire(tenant_id, request.product_id).await;

        let product = self
            .store
            .get_product(tenant_id, request.product_id)
            .await?
            .ok_or(MovementError::ProductNotFound)?;

        let mutation = plan_movement(&product, request, MovementId::new(), Utc::now()).inspect_err(|e| {
            warn!(error = %e, current_stock = product.current_stock(), "movement rejected");
        })?;

        self.store.commit_mutation(&mutation).await?;

        info!(
            movement_id = %mutation.movement.id,
            previous_stock = mutation.movement.previous_stock,
            new_stock = mutation.movement.new_stock,
            "movement committed"
        );
        Ok(AppliedMovement {
            movement: mutation.movement,
            product: mutation.product,
        })
    }

    /// Undo a movement by recording its compensating movement.
    #[instrument(skip(self, request), fields(tenant_id = %tenant_id, movement_id = %request.movement_id), err)]
    pub async fn reverse_movement(
        &self,
        tenant_id: TenantId,
        request: ReversalRequest,
    ) -> Result<ReversedMovement, EngineError> {
        let original = self.load_movement(tenant_id, request.movement_id).await?;
        if original.is_reversed {
            return Err(MovementError::AlreadyReversed.into());
        }

        let _guard = self.locks.acquire(tenant_id, original.product_id).await;

        // Another reversal may have committed while we waited for the lock.
        let mut original = self.load_movement(tenant_id, request.movement_id).await?;
        let product = self
            .store
            .get_product(tenant_id, original.product_id)
            .await?
            .ok_or(MovementError::ProductNotFound)?;

        let mutation = plan_reversal(&original, &product, request, MovementId::new(), Utc::now()).inspect_err(|e| {
            warn!(error = %e, "reversal rejected");
        })?;

        self.store.commit_mutation(&mutation).await?;
        original.mark_reversed(mutation.movement.id)?;

        info!(
            reversal_id = %mutation.movement.id,
            product_id = %product.id_typed(),
            new_stock = mutation.movement.new_stock,
            "movement reversed"
        );
        Ok(ReversedMovement {
            reversal: mutation.movement,
            original,
            product: mutation.product,
        })
    }

    pub async fn get_movement(&self, tenant_id: TenantId, movement_id: MovementId) -> Result<StockMovement, EngineError> {
        self.load_movement(tenant_id, movement_id).await
    }

    /// History of one product, reversed rows included, newest first.
    pub async fn movements_for_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        limit: Option<u32>,
    ) -> Result<Vec<StockMovement>, EngineError> {
        if self.store.get_product(tenant_id, product_id).await?.is_none() {
            return Err(MovementError::ProductNotFound.into());
        }
        let limit = limit.unwrap_or(DEFAULT_PRODUCT_HISTORY_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        Ok(self.store.movements_for_product(tenant_id, product_id, limit).await?)
    }

    pub async fn list_movements(
        &self,
        tenant_id: TenantId,
        filter: MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementPage, EngineError> {
        if let (Some(from), Some(to)) = (filter.date_from, filter.date_to) {
            if from > to {
                return Err(MovementError::validation("date_from must not be after date_to").into());
            }
        }
        Ok(self.store.list_movements(tenant_id, &filter, pagination).await?)
    }

    pub async fn movement_stats(&self, tenant_id: TenantId, window: StatsWindow) -> Result<Vec<MovementStats>, EngineError> {
        Ok(self.store.movement_stats(tenant_id, &window).await?)
    }

    async fn load_movement(&self, tenant_id: TenantId, movement_id: MovementId) -> Result<StockMovement, EngineError> {
        self.store
            .get_movement(tenant_id, movement_id)
            .await?
            .ok_or_else(|| MovementError::MovementNotFound.into())
    }
}

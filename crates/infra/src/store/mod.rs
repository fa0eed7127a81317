//! Storage boundary for products and the stock movement ledger.
//!
//! A store persists two things: product rows (mutable, versioned) and movement
//! rows (append-only apart from the one-time reversal flag). The only way a
//! store changes `current_stock` is [`InventoryStore::commit_mutation`], which
//! writes the ledger row and the product as one atomic unit.

pub mod in_memory;
pub mod postgres;
pub mod query;

use async_trait::async_trait;
use thiserror::Error;

use stockledger_core::{ExpectedVersion, TenantId};
use stockledger_inventory::{MovementId, MovementStats, StatsWindow, StockMovement, StockMutation};
use stockledger_products::{Product, ProductId};

pub use in_memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;
pub use query::{MovementFilter, MovementPage, Page, Pagination, ProductFilter, ProductPage};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The stored product version no longer matches the expected one.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    #[error("sku already exists: {0}")]
    DuplicateSku(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The movement named by `StockMutation::reverses` was already reversed.
    #[error("movement already reversed")]
    AlreadyReversed,

    /// A row was written by something that does not respect the domain rules.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Tenant-scoped persistence for products and their ledgers.
///
/// Implementations must:
/// - scope every read and write by `tenant_id`
/// - enforce `(tenant_id, sku)` uniqueness on insert
/// - apply `commit_mutation` atomically: version check, ledger insert, product
///   update and (for reversals) the original's flag all succeed or none do
#[async_trait]
pub trait InventoryStore: Send + Sync + 'static {
    /// Insert a freshly created product. Fails with `DuplicateSku` on a taken SKU.
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError>;

    async fn sku_exists(&self, tenant_id: TenantId, sku: &str) -> Result<bool, StoreError>;

    async fn get_product(&self, tenant_id: TenantId, product_id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Products matching `filter`, newest first.
    async fn list_products(
        &self,
        tenant_id: TenantId,
        filter: &ProductFilter,
        pagination: Pagination,
    ) -> Result<ProductPage, StoreError>;

    /// Overwrite catalog fields of an existing product (never used for stock).
    async fn save_product(&self, product: &Product, expected: ExpectedVersion) -> Result<(), StoreError>;

    /// Append a planned movement and store its product in one atomic unit.
    async fn commit_mutation(&self, mutation: &StockMutation) -> Result<(), StoreError>;

    async fn get_movement(&self, tenant_id: TenantId, movement_id: MovementId) -> Result<Option<StockMovement>, StoreError>;

    /// Full history of one product, reversed rows included, newest first.
    async fn movements_for_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        limit: u32,
    ) -> Result<Vec<StockMovement>, StoreError>;

    async fn list_movements(
        &self,
        tenant_id: TenantId,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementPage, StoreError>;

    async fn movement_stats(&self, tenant_id: TenantId, window: &StatsWindow) -> Result<Vec<MovementStats>, StoreError>;
}

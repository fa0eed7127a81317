use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use stockledger_core::{AggregateRoot, ExpectedVersion, TenantId};
use stockledger_inventory::{
    aggregate_stats, sort_newest_first, MovementId, MovementStats, StatsWindow, StockMovement, StockMutation,
};
use stockledger_products::{Product, ProductId};

use super::query::{MovementFilter, MovementPage, Page, Pagination, ProductFilter, ProductPage};
use super::{InventoryStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<(TenantId, ProductId), Product>,
    skus: HashMap<(TenantId, String), ProductId>,
    movements: HashMap<(TenantId, MovementId), StockMovement>,
}

/// In-memory store.
///
/// Intended for tests/dev. One `RwLock` guards all tables, so a commit is
/// trivially atomic.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn check_version(stored: &Product, expected: ExpectedVersion) -> Result<(), StoreError> {
    expected
        .check(stored.version())
        .map_err(|e| StoreError::Concurrency(e.to_string()))
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut tables = self.write();
        let key = (product.tenant_id(), product.id_typed());
        let sku_key = (product.tenant_id(), product.sku().to_string());

        if tables.skus.contains_key(&sku_key) {
            return Err(StoreError::DuplicateSku(product.sku().to_string()));
        }
        if tables.products.contains_key(&key) {
            return Err(StoreError::Concurrency(format!("product {} already exists", product.id_typed())));
        }
        tables.skus.insert(sku_key, product.id_typed());
        tables.products.insert(key, product.clone());
        Ok(())
    }

    async fn sku_exists(&self, tenant_id: TenantId, sku: &str) -> Result<bool, StoreError> {
        Ok(self.read().skus.contains_key(&(tenant_id, sku.to_string())))
    }

    async fn get_product(&self, tenant_id: TenantId, product_id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read().products.get(&(tenant_id, product_id)).cloned())
    }

    async fn list_products(
        &self,
        tenant_id: TenantId,
        filter: &ProductFilter,
        pagination: Pagination,
    ) -> Result<ProductPage, StoreError> {
        let tables = self.read();
        let mut products: Vec<Product> = tables
            .products
            .iter()
            .filter(|((tenant, _), p)| *tenant == tenant_id && filter.matches(p))
            .map(|(_, p)| p.clone())
            .collect();
        products.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id_typed().cmp(&a.id_typed()))
        });
        Ok(Page::from_sorted(products, pagination))
    }

    async fn save_product(&self, product: &Product, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut tables = self.write();
        let key = (product.tenant_id(), product.id_typed());
        let stored = tables
            .products
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(format!("product {}", product.id_typed())))?;
        check_version(stored, expected)?;
        if stored.current_stock() != product.current_stock() {
            return Err(StoreError::Corrupt("catalog updates cannot change stock".to_string()));
        }
        tables.products.insert(key, product.clone());
        Ok(())
    }

    async fn commit_mutation(&self, mutation: &StockMutation) -> Result<(), StoreError> {
        mutation.verify().map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let mut tables = self.write();
        let tenant_id = mutation.product.tenant_id();
        let product_key = (tenant_id, mutation.product.id_typed());
        let movement_key = (tenant_id, mutation.movement.id);

        // Validate everything before touching any table.
        let stored = tables
            .products
            .get(&product_key)
            .ok_or_else(|| StoreError::NotFound(format!("product {}", mutation.product.id_typed())))?;
        check_version(stored, ExpectedVersion::Exact(mutation.expected_version))?;
        if stored.current_stock() != mutation.movement.previous_stock {
            return Err(StoreError::Concurrency(format!(
                "ledger chain broken: stored stock {}, planned previous {}",
                stored.current_stock(),
                mutation.movement.previous_stock
            )));
        }
        if tables.movements.contains_key(&movement_key) {
            return Err(StoreError::Corrupt(format!("movement {} already exists", mutation.movement.id)));
        }
        if let Some(original_id) = mutation.reverses {
            let original = tables
                .movements
                .get(&(tenant_id, original_id))
                .ok_or_else(|| StoreError::NotFound(format!("movement {original_id}")))?;
            if original.is_reversed {
                return Err(StoreError::AlreadyReversed);
            }
        }

        if let Some(original_id) = mutation.reverses {
            if let Some(original) = tables.movements.get_mut(&(tenant_id, original_id)) {
                original.is_reversed = true;
                original.reversal_reference = Some(mutation.movement.id);
            }
        }
        tables.movements.insert(movement_key, mutation.movement.clone());
        tables.products.insert(product_key, mutation.product.clone());
        Ok(())
    }

    async fn get_movement(&self, tenant_id: TenantId, movement_id: MovementId) -> Result<Option<StockMovement>, StoreError> {
        Ok(self.read().movements.get(&(tenant_id, movement_id)).cloned())
    }

    async fn movements_for_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        limit: u32,
    ) -> Result<Vec<StockMovement>, StoreError> {
        let tables = self.read();
        let mut rows: Vec<StockMovement> = tables
            .movements
            .iter()
            .filter(|((tenant, _), m)| *tenant == tenant_id && m.product_id == product_id)
            .map(|(_, m)| m.clone())
            .collect();
        sort_newest_first(&mut rows);
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn list_movements(
        &self,
        tenant_id: TenantId,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementPage, StoreError> {
        let tables = self.read();
        let mut rows: Vec<StockMovement> = tables
            .movements
            .iter()
            .filter(|((tenant, _), m)| *tenant == tenant_id && filter.matches(m))
            .map(|(_, m)| m.clone())
            .collect();
        sort_newest_first(&mut rows);
        Ok(Page::from_sorted(rows, pagination))
    }

    async fn movement_stats(&self, tenant_id: TenantId, window: &StatsWindow) -> Result<Vec<MovementStats>, StoreError> {
        let tables = self.read();
        let rows = tables
            .movements
            .iter()
            .filter(|((tenant, _), _)| *tenant == tenant_id)
            .map(|(_, m)| m);
        Ok(aggregate_stats(rows, window))
    }
}

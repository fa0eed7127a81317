//! Product catalog: creation (with SKU generation), lookups and catalog edits.
//!
//! Stock never changes here; that is the movement engine's job. Edits share the
//! engine's per-product locks so a catalog update and a movement on the same
//! product never interleave.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use stockledger_core::{AggregateRoot, DomainError, ExpectedVersion, TenantId};
use stockledger_products::product::normalize_sku;
use stockledger_products::{NewProduct, Product, ProductId, ProductPatch, SkuGenerator};

use crate::locks::ProductLocks;
use crate::store::{InventoryStore, Pagination, ProductFilter, ProductPage, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("product not found")]
    NotFound,

    #[error("sku already exists: {0}")]
    DuplicateSku(String),

    #[error("could not generate a unique sku after {attempts} attempts")]
    SkuGenerationExhausted { attempts: usize },

    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<DomainError> for CatalogError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) | DomainError::InvariantViolation(msg) => {
                CatalogError::Validation(msg)
            }
            DomainError::Conflict(msg) => CatalogError::ConcurrencyConflict(msg),
            DomainError::NotFound => CatalogError::NotFound,
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) => CatalogError::ConcurrencyConflict(msg),
            StoreError::DuplicateSku(sku) => CatalogError::DuplicateSku(sku),
            StoreError::NotFound(_) => CatalogError::NotFound,
            other => CatalogError::Store(other),
        }
    }
}

#[derive(Debug)]
pub struct ProductCatalog<S: ?Sized> {
    store: Arc<S>,
    locks: Arc<ProductLocks>,
    skus: Mutex<SkuGenerator>,
}

impl<S: InventoryStore + ?Sized> ProductCatalog<S> {
    pub fn new(store: Arc<S>, locks: Arc<ProductLocks>) -> Self {
        Self::with_generator(store, locks, SkuGenerator::from_entropy())
    }

    pub fn with_generator(store: Arc<S>, locks: Arc<ProductLocks>, generator: SkuGenerator) -> Self {
        Self {
            store,
            locks,
            skus: Mutex::new(generator),
        }
    }

    /// Create a product, generating a SKU when none is supplied.
    #[instrument(skip(self, input), fields(tenant_id = %tenant_id, category = %input.category), err)]
    pub async fn create_product(&self, tenant_id: TenantId, input: NewProduct) -> Result<Product, CatalogError> {
        input.validate()?;
        let id = ProductId::generate();

        if let Some(raw) = &input.sku {
            let sku = normalize_sku(raw)?;
            let product = Product::create(tenant_id, id, input, &sku, Utc::now())?;
            self.store.insert_product(&product).await?;
            info!(product_id = %id, sku = %product.sku(), "product created");
            return Ok(product);
        }

        let attempts = self.max_sku_attempts();
        for attempt in 0..attempts {
            let candidate = self.next_sku(&input, attempt);
            if self.store.sku_exists(tenant_id, &candidate).await? {
                debug!(sku = %candidate, attempt, "generated sku taken");
                continue;
            }
            let product = Product::create(tenant_id, id, input.clone(), &candidate, Utc::now())?;
            match self.store.insert_product(&product).await {
                Ok(()) => {
                    info!(product_id = %id, sku = %product.sku(), attempt, "product created");
                    return Ok(product);
                }
                // Lost a race for the candidate; try another.
                Err(StoreError::DuplicateSku(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        warn!(attempts, "sku generation exhausted");
        Err(CatalogError::SkuGenerationExhausted { attempts })
    }

    pub async fn get_product(&self, tenant_id: TenantId, product_id: ProductId) -> Result<Product, CatalogError> {
        self.store
            .get_product(tenant_id, product_id)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    pub async fn list_products(
        &self,
        tenant_id: TenantId,
        filter: ProductFilter,
        pagination: Pagination,
    ) -> Result<ProductPage, CatalogError> {
        Ok(self.store.list_products(tenant_id, &filter, pagination).await?)
    }

    /// Edit catalog fields. Stock is not part of a patch.
    #[instrument(skip(self, patch), fields(tenant_id = %tenant_id, product_id = %product_id), err)]
    pub async fn update_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product, CatalogError> {
        let _guard = self.locks.acquire(tenant_id, product_id).await;
        let mut product = self.get_product(tenant_id, product_id).await?;
        let expected = ExpectedVersion::Exact(product.version());

        product.apply_patch(patch, Utc::now())?;
        self.store.save_product(&product, expected).await?;
        info!(version = product.version(), "product updated");
        Ok(product)
    }

    /// Activate or deactivate a product. Idempotent.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, product_id = %product_id), err)]
    pub async fn set_product_active(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        active: bool,
    ) -> Result<Product, CatalogError> {
        let _guard = self.locks.acquire(tenant_id, product_id).await;
        let mut product = self.get_product(tenant_id, product_id).await?;
        let expected = ExpectedVersion::Exact(product.version());

        if product.set_active(active, Utc::now()) {
            self.store.save_product(&product, expected).await?;
            info!(status = product.status().as_str(), "product status changed");
        }
        Ok(product)
    }

    fn max_sku_attempts(&self) -> usize {
        self.skus.lock().unwrap_or_else(PoisonError::into_inner).max_attempts()
    }

    fn next_sku(&self, input: &NewProduct, attempt: usize) -> String {
        self.skus
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .candidate(&input.category, &input.name, Utc::now(), attempt)
    }
}

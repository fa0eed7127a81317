use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{ensure_max_len, AggregateId, AggregateRoot, DomainError, DomainResult, TenantId};

pub const NAME_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 500;
pub const SKU_MAX_LEN: usize = 50;
pub const CATEGORY_MAX_LEN: usize = 50;
pub const TAG_MAX_LEN: usize = 30;
pub const SUPPLIER_FIELD_MAX_LEN: usize = 100;

/// Product identifier (tenant-scoped via `tenant_id`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn generate() -> Self {
        Self(AggregateId::new())
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for ProductId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Soft-delete lifecycle. Products are never hard-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Inactive,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
        }
    }

    pub fn from_active(active: bool) -> Self {
        if active {
            ProductStatus::Active
        } else {
            ProductStatus::Inactive
        }
    }
}

/// Reorder thresholds. `min < max` whenever `max` is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StockThresholds {
    pub min_stock_level: u64,
    pub max_stock_level: Option<u64>,
}

impl StockThresholds {
    pub fn new(min_stock_level: u64, max_stock_level: Option<u64>) -> DomainResult<Self> {
        let thresholds = Self {
            min_stock_level,
            max_stock_level,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if let Some(max) = self.max_stock_level {
            if self.min_stock_level >= max {
                return Err(DomainError::validation(
                    "min_stock_level must be lower than max_stock_level",
                ));
            }
        }
        Ok(())
    }
}

/// Supplier contact attached to a product (free text, not a foreign key).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SupplierRef {
    pub name: Option<String>,
    pub contact: Option<String>,
}

impl SupplierRef {
    fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.name {
            ensure_max_len("supplier.name", name.trim(), SUPPLIER_FIELD_MAX_LEN)?;
        }
        if let Some(contact) = &self.contact {
            ensure_max_len("supplier.contact", contact.trim(), SUPPLIER_FIELD_MAX_LEN)?;
        }
        Ok(())
    }
}

/// Input for product creation.
///
/// `sku` is optional; when absent the catalog generates one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub unit_price: Decimal,
    #[serde(default)]
    pub initial_stock: u64,
    #[serde(default)]
    pub min_stock_level: u64,
    pub max_stock_level: Option<u64>,
    pub supplier: Option<SupplierRef>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub expiration_date: Option<DateTime<Utc>>,
}

impl NewProduct {
    /// Field-level validation; runs before any SKU generation or write.
    pub fn validate(&self) -> DomainResult<()> {
        validate_name(&self.name)?;
        validate_category(&self.category)?;
        validate_price(self.unit_price)?;
        if let Some(description) = &self.description {
            ensure_max_len("description", description.trim(), DESCRIPTION_MAX_LEN)?;
        }
        if let Some(sku) = &self.sku {
            normalize_sku(sku)?;
        }
        if let Some(supplier) = &self.supplier {
            supplier.validate()?;
        }
        validate_tags(&self.tags)?;
        StockThresholds::new(self.min_stock_level, self.max_stock_level)?;
        Ok(())
    }
}

/// Partial update of catalog fields. Stock is deliberately absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit_price: Option<Decimal>,
    pub min_stock_level: Option<u64>,
    pub max_stock_level: Option<u64>,
    pub supplier: Option<SupplierRef>,
    pub tags: Option<Vec<String>>,
    pub expiration_date: Option<DateTime<Utc>>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        *self == ProductPatch::default()
    }
}

/// Trim + uppercase a caller-supplied SKU and check its bounds.
pub fn normalize_sku(raw: &str) -> DomainResult<String> {
    let sku = raw.trim().to_uppercase();
    if sku.is_empty() {
        return Err(DomainError::validation("SKU cannot be empty"));
    }
    ensure_max_len("sku", &sku, SKU_MAX_LEN)?;
    Ok(sku)
}

fn validate_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    ensure_max_len("name", name.trim(), NAME_MAX_LEN)
}

fn validate_category(category: &str) -> DomainResult<()> {
    if category.trim().is_empty() {
        return Err(DomainError::validation("category cannot be empty"));
    }
    ensure_max_len("category", category.trim(), CATEGORY_MAX_LEN)
}

fn validate_price(price: Decimal) -> DomainResult<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(DomainError::validation("unit_price cannot be negative"));
    }
    Ok(())
}

fn validate_tags(tags: &[String]) -> DomainResult<()> {
    for tag in tags {
        ensure_max_len("tag", tag.trim(), TAG_MAX_LEN)?;
    }
    Ok(())
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Every stored field of a product, used by storage backends to rehydrate rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductParts {
    pub id: ProductId,
    pub tenant_id: TenantId,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub unit_price: Decimal,
    pub current_stock: u64,
    pub thresholds: StockThresholds,
    pub supplier: Option<SupplierRef>,
    pub tags: Vec<String>,
    pub status: ProductStatus,
    pub last_restock_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate root: Product.
///
/// `current_stock` is only changed through [`Product::record_stock`], which the
/// movement engine calls while holding the product's exclusive lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    tenant_id: TenantId,
    sku: String,
    name: String,
    description: Option<String>,
    category: String,
    unit_price: Decimal,
    current_stock: u64,
    thresholds: StockThresholds,
    supplier: Option<SupplierRef>,
    tags: Vec<String>,
    status: ProductStatus,
    last_restock_date: Option<DateTime<Utc>>,
    expiration_date: Option<DateTime<Utc>>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    /// Build a new, active product at version 1.
    ///
    /// `sku` must already be resolved (explicit or generated).
    pub fn create(
        tenant_id: TenantId,
        id: ProductId,
        input: NewProduct,
        sku: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        input.validate()?;
        let sku = normalize_sku(sku)?;
        let thresholds = StockThresholds::new(input.min_stock_level, input.max_stock_level)?;

        Ok(Self {
            id,
            tenant_id,
            sku,
            name: input.name.trim().to_string(),
            description: clean_optional(input.description),
            category: input.category.trim().to_string(),
            unit_price: input.unit_price,
            current_stock: input.initial_stock,
            thresholds,
            supplier: input.supplier,
            tags: clean_tags(input.tags),
            status: ProductStatus::Active,
            last_restock_date: None,
            expiration_date: input.expiration_date,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn current_stock(&self) -> u64 {
        self.current_stock
    }

    pub fn thresholds(&self) -> StockThresholds {
        self.thresholds
    }

    pub fn supplier(&self) -> Option<&SupplierRef> {
        self.supplier.as_ref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }

    pub fn last_restock_date(&self) -> Option<DateTime<Utc>> {
        self.last_restock_date
    }

    pub fn expiration_date(&self) -> Option<DateTime<Utc>> {
        self.expiration_date
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Stock at or below the minimum level.
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.thresholds.min_stock_level
    }

    /// Stock at or above the maximum level (never true without a maximum).
    pub fn is_over_stock(&self) -> bool {
        self.thresholds
            .max_stock_level
            .is_some_and(|max| self.current_stock >= max)
    }

    /// Inventory value at the current unit price.
    pub fn total_value(&self) -> Decimal {
        Decimal::from(self.current_stock) * self.unit_price
    }

    /// Set the stock level produced by a ledger movement.
    ///
    /// `restocked` marks inbound movements (IN, inbound TRANSFER).
    pub fn record_stock(&mut self, new_stock: u64, restocked: bool, at: DateTime<Utc>) {
        self.current_stock = new_stock;
        if restocked {
            self.last_restock_date = Some(at);
        }
        self.touch(at);
    }

    /// Toggle the soft-delete flag. Returns `false` when nothing changed.
    pub fn set_active(&mut self, active: bool, at: DateTime<Utc>) -> bool {
        let status = ProductStatus::from_active(active);
        if self.status == status {
            return false;
        }
        self.status = status;
        self.touch(at);
        true
    }

    /// Apply a catalog patch, re-validating every touched field.
    pub fn apply_patch(&mut self, patch: ProductPatch, at: DateTime<Utc>) -> DomainResult<()> {
        if patch.is_empty() {
            return Err(DomainError::validation("patch contains no changes"));
        }

        let thresholds = StockThresholds::new(
            patch.min_stock_level.unwrap_or(self.thresholds.min_stock_level),
            patch.max_stock_level.or(self.thresholds.max_stock_level),
        )?;

        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        if let Some(category) = &patch.category {
            validate_category(category)?;
        }
        if let Some(price) = patch.unit_price {
            validate_price(price)?;
        }
        if let Some(description) = &patch.description {
            ensure_max_len("description", description.trim(), DESCRIPTION_MAX_LEN)?;
        }
        if let Some(supplier) = &patch.supplier {
            supplier.validate()?;
        }
        if let Some(tags) = &patch.tags {
            validate_tags(tags)?;
        }

        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(category) = patch.category {
            self.category = category.trim().to_string();
        }
        if let Some(price) = patch.unit_price {
            self.unit_price = price;
        }
        if patch.description.is_some() {
            self.description = clean_optional(patch.description);
        }
        if patch.supplier.is_some() {
            self.supplier = patch.supplier;
        }
        if let Some(tags) = patch.tags {
            self.tags = clean_tags(tags);
        }
        if patch.expiration_date.is_some() {
            self.expiration_date = patch.expiration_date;
        }
        self.thresholds = thresholds;
        self.touch(at);
        Ok(())
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
        self.version += 1;
    }
}

impl From<ProductParts> for Product {
    fn from(p: ProductParts) -> Self {
        Self {
            id: p.id,
            tenant_id: p.tenant_id,
            sku: p.sku,
            name: p.name,
            description: p.description,
            category: p.category,
            unit_price: p.unit_price,
            current_stock: p.current_stock,
            thresholds: p.thresholds,
            supplier: p.supplier,
            tags: p.tags,
            status: p.status,
            last_restock_date: p.last_restock_date,
            expiration_date: p.expiration_date,
            version: p.version,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

//! Postgres-backed inventory store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) on the SKU constraint | `23505` | `DuplicateSku` | Concurrent create with the same SKU |
//! | Database (unique violation) | `23505` | `Concurrency` | Duplicate primary key |
//! | Database (check constraint violation) | `23514` | `Corrupt` | Row breaks a schema invariant |
//! | Database (other) | Any other | `Backend` | Other database errors |
//! | PoolClosed / Other | N/A | `Backend` | Network errors, connection failures, etc. |
//!
//! ## Atomicity
//!
//! `commit_mutation` runs in one transaction that locks the product row
//! (`SELECT ... FOR UPDATE`), re-checks its version and stock, flags the
//! reversed original if any, inserts the ledger row and updates the product.
//! Any failure rolls the whole unit back.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{instrument, Span};
use uuid::Uuid;

use stockledger_core::{AggregateId, AggregateRoot, ExpectedVersion, TenantId};
use stockledger_inventory::{
    MovementId, MovementReason, MovementStats, MovementType, StatsWindow, StockMovement, StockMutation,
};
use stockledger_products::{Product, ProductId, ProductParts, ProductStatus, StockThresholds, SupplierRef};

use super::query::{MovementFilter, MovementPage, Page, Pagination, ProductFilter, ProductPage};
use super::{InventoryStore, StoreError};

const SCHEMA: &str = include_str!("../../migrations/0001_stock_ledger.sql");
const SKU_CONSTRAINT: &str = "products_tenant_sku_unique";

const PRODUCT_COLUMNS: &str = r#"
    tenant_id, product_id, sku, name, description, category, unit_price,
    current_stock, min_stock_level, max_stock_level, supplier_name, supplier_contact,
    tags, is_active, last_restock_date, expiration_date, version, created_at, updated_at
"#;

const MOVEMENT_COLUMNS: &str = r#"
    tenant_id, movement_id, product_id, movement_type, quantity, reason,
    previous_stock, new_stock, reference, notes, unit_cost, total_cost,
    performed_by, warehouse, batch_number, expiration_date, is_reversed,
    reversal_reference, created_at
"#;

/// Postgres-backed store. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the schema. Every statement is idempotent.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn product_exists(&self, tenant_id: TenantId, product_id: ProductId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM products WHERE tenant_id = $1 AND product_id = $2")
            .bind(tenant_id.as_uuid())
            .bind(product_id.0.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("product_exists", e))?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    #[instrument(
        skip(self, product),
        fields(tenant_id = %product.tenant_id(), product_id = %product.id_typed(), sku = %product.sku()),
        err
    )]
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        let thresholds = product.thresholds();
        let supplier = product.supplier();
        sqlx::query(
            r#"
            INSERT INTO products (
                tenant_id, product_id, sku, name, description, category, unit_price,
                current_stock, min_stock_level, max_stock_level, supplier_name, supplier_contact,
                tags, is_active, last_restock_date, expiration_date, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(product.tenant_id().as_uuid())
        .bind(product.id_typed().0.as_uuid())
        .bind(product.sku())
        .bind(product.name())
        .bind(product.description())
        .bind(product.category())
        .bind(product.unit_price())
        .bind(to_db(product.current_stock(), "current_stock")?)
        .bind(to_db(thresholds.min_stock_level, "min_stock_level")?)
        .bind(thresholds.max_stock_level.map(|m| to_db(m, "max_stock_level")).transpose()?)
        .bind(supplier.and_then(|s| s.name.clone()))
        .bind(supplier.and_then(|s| s.contact.clone()))
        .bind(product.tags().to_vec())
        .bind(product.is_active())
        .bind(product.last_restock_date())
        .bind(product.expiration_date())
        .bind(to_db(product.version(), "version")?)
        .bind(product.created_at())
        .bind(product.updated_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation_on(&e, SKU_CONSTRAINT) {
                StoreError::DuplicateSku(product.sku().to_string())
            } else {
                map_sqlx_error("insert_product", e)
            }
        })?;
        Ok(())
    }

    async fn sku_exists(&self, tenant_id: TenantId, sku: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM products WHERE tenant_id = $1 AND sku = $2")
            .bind(tenant_id.as_uuid())
            .bind(sku)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("sku_exists", e))?;
        Ok(row.is_some())
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, product_id = %product_id), err)]
    async fn get_product(&self, tenant_id: TenantId, product_id: ProductId) -> Result<Option<Product>, StoreError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE tenant_id = $1 AND product_id = $2");
        let row = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(product_id.0.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self, filter), fields(tenant_id = %tenant_id), err)]
    async fn list_products(
        &self,
        tenant_id: TenantId,
        filter: &ProductFilter,
        pagination: Pagination,
    ) -> Result<ProductPage, StoreError> {
        const WHERE: &str = r#"
            WHERE tenant_id = $1
                AND ($2::text IS NULL OR category = $2)
                AND ($3::boolean IS NULL OR is_active = $3)
                AND (NOT $4 OR current_stock <= min_stock_level)
        "#;

        let count_sql = format!("SELECT COUNT(*) AS total FROM products {WHERE}");
        let total: i64 = sqlx::query(&count_sql)
            .bind(tenant_id.as_uuid())
            .bind(filter.category.as_deref())
            .bind(filter.active)
            .bind(filter.low_stock)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?
            .try_get("total")
            .map_err(|e| StoreError::Corrupt(format!("failed to read count: {e}")))?;

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products {WHERE} ORDER BY created_at DESC, product_id DESC LIMIT $5 OFFSET $6"
        );
        let rows = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(filter.category.as_deref())
            .bind(filter.active)
            .bind(filter.low_stock)
            .bind(i64::from(pagination.limit))
            .bind(offset(pagination)?)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        let products = rows.iter().map(product_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(products, from_db(total, "total")?, pagination))
    }

    #[instrument(
        skip(self, product, expected),
        fields(tenant_id = %product.tenant_id(), product_id = %product.id_typed(), expected = ?expected),
        err
    )]
    async fn save_product(&self, product: &Product, expected: ExpectedVersion) -> Result<(), StoreError> {
        let expected_version = match expected {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(to_db(v, "expected_version")?),
        };
        let thresholds = product.thresholds();
        let supplier = product.supplier();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = $3,
                description = $4,
                category = $5,
                unit_price = $6,
                min_stock_level = $7,
                max_stock_level = $8,
                supplier_name = $9,
                supplier_contact = $10,
                tags = $11,
                is_active = $12,
                expiration_date = $13,
                version = $14,
                updated_at = $15
            WHERE tenant_id = $1
                AND product_id = $2
                AND ($16::bigint IS NULL OR version = $16)
                AND current_stock = $17
            "#,
        )
        .bind(product.tenant_id().as_uuid())
        .bind(product.id_typed().0.as_uuid())
        .bind(product.name())
        .bind(product.description())
        .bind(product.category())
        .bind(product.unit_price())
        .bind(to_db(thresholds.min_stock_level, "min_stock_level")?)
        .bind(thresholds.max_stock_level.map(|m| to_db(m, "max_stock_level")).transpose()?)
        .bind(supplier.and_then(|s| s.name.clone()))
        .bind(supplier.and_then(|s| s.contact.clone()))
        .bind(product.tags().to_vec())
        .bind(product.is_active())
        .bind(product.expiration_date())
        .bind(to_db(product.version(), "version")?)
        .bind(product.updated_at())
        .bind(expected_version)
        .bind(to_db(product.current_stock(), "current_stock")?)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_product", e))?;

        if result.rows_affected() == 0 {
            if !self.product_exists(product.tenant_id(), product.id_typed()).await? {
                return Err(StoreError::NotFound(format!("product {}", product.id_typed())));
            }
            return Err(StoreError::Concurrency(format!(
                "product {} changed since it was read (expected {expected:?})",
                product.id_typed()
            )));
        }
        Ok(())
    }

    #[instrument(
        skip(self, mutation),
        fields(
            tenant_id = %mutation.product.tenant_id(),
            product_id = %mutation.product.id_typed(),
            movement_id = %mutation.movement.id,
            expected_version = mutation.expected_version,
            new_stock = tracing::field::Empty
        ),
        err
    )]
    async fn commit_mutation(&self, mutation: &StockMutation) -> Result<(), StoreError> {
        let product = &mutation.product;
        let movement = &mutation.movement;
        let tenant_id = product.tenant_id();
        mutation.verify().map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let locked = sqlx::query(
            "SELECT version, current_stock FROM products WHERE tenant_id = $1 AND product_id = $2 FOR UPDATE",
        )
        .bind(tenant_id.as_uuid())
        .bind(product.id_typed().0.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_product", e))?;

        let Some(locked) = locked else {
            return abort(tx, StoreError::NotFound(format!("product {}", product.id_typed()))).await;
        };
        let version: i64 = get(&locked, "version")?;
        let current_stock: i64 = get(&locked, "current_stock")?;

        if !ExpectedVersion::Exact(mutation.expected_version).matches(from_db(version, "version")?) {
            return abort(
                tx,
                StoreError::Concurrency(format!(
                    "expected version {}, found {version}",
                    mutation.expected_version
                )),
            )
            .await;
        }
        if from_db(current_stock, "current_stock")? != movement.previous_stock {
            return abort(
                tx,
                StoreError::Concurrency(format!(
                    "ledger chain broken: stored stock {current_stock}, planned previous {}",
                    movement.previous_stock
                )),
            )
            .await;
        }

        if let Some(original_id) = mutation.reverses {
            if let Err(e) = flag_reversed(&mut tx, tenant_id, original_id, movement.id).await {
                return abort(tx, e).await;
            }
        }

        let insert_sql = format!(
            "INSERT INTO stock_movements ({MOVEMENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)"
        );
        sqlx::query(&insert_sql)
            .bind(tenant_id.as_uuid())
            .bind(movement.id.0)
            .bind(movement.product_id.0.as_uuid())
            .bind(movement.movement_type.as_str())
            .bind(to_db(movement.quantity, "quantity")?)
            .bind(movement.reason.as_str())
            .bind(to_db(movement.previous_stock, "previous_stock")?)
            .bind(to_db(movement.new_stock, "new_stock")?)
            .bind(movement.reference.as_deref())
            .bind(movement.notes.as_deref())
            .bind(movement.unit_cost)
            .bind(movement.total_cost)
            .bind(&movement.performed_by)
            .bind(&movement.warehouse)
            .bind(movement.batch_number.as_deref())
            .bind(movement.expiration_date)
            .bind(movement.is_reversed)
            .bind(movement.reversal_reference.map(|r| r.0))
            .bind(movement.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_movement", e))?;

        sqlx::query(
            r#"
            UPDATE products SET
                current_stock = $3,
                last_restock_date = $4,
                version = $5,
                updated_at = $6
            WHERE tenant_id = $1 AND product_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(product.id_typed().0.as_uuid())
        .bind(to_db(product.current_stock(), "current_stock")?)
        .bind(product.last_restock_date())
        .bind(to_db(product.version(), "version")?)
        .bind(product.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_product_stock", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("new_stock", movement.new_stock);
        Ok(())
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, movement_id = %movement_id), err)]
    async fn get_movement(&self, tenant_id: TenantId, movement_id: MovementId) -> Result<Option<StockMovement>, StoreError> {
        let sql = format!("SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE tenant_id = $1 AND movement_id = $2");
        let row = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(movement_id.0)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_movement", e))?;
        row.as_ref().map(movement_from_row).transpose()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, product_id = %product_id), err)]
    async fn movements_for_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        limit: u32,
    ) -> Result<Vec<StockMovement>, StoreError> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE tenant_id = $1 AND product_id = $2 ORDER BY created_at DESC, movement_id DESC LIMIT $3"
        );
        let rows = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(product_id.0.as_uuid())
            .bind(i64::from(limit))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("movements_for_product", e))?;
        rows.iter().map(movement_from_row).collect()
    }

    #[instrument(skip(self, filter), fields(tenant_id = %tenant_id), err)]
    async fn list_movements(
        &self,
        tenant_id: TenantId,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> Result<MovementPage, StoreError> {
        const WHERE: &str = r#"
            WHERE tenant_id = $1
                AND ($2::boolean OR is_reversed = FALSE)
                AND ($3::uuid IS NULL OR product_id = $3)
                AND ($4::text IS NULL OR movement_type = $4)
                AND ($5::text IS NULL OR reason = $5)
                AND ($6::text IS NULL OR warehouse = $6)
                AND ($7::timestamptz IS NULL OR created_at >= $7)
                AND ($8::timestamptz IS NULL OR created_at <= $8)
        "#;
        let product_param: Option<Uuid> = filter.product_id.map(|p| *p.0.as_uuid());
        let type_param = filter.movement_type.map(|t| t.as_str());
        let reason_param = filter.reason.map(|r| r.as_str());

        let count_sql = format!("SELECT COUNT(*) AS total FROM stock_movements {WHERE}");
        let total: i64 = sqlx::query(&count_sql)
            .bind(tenant_id.as_uuid())
            .bind(filter.include_reversed)
            .bind(product_param)
            .bind(type_param)
            .bind(reason_param)
            .bind(filter.warehouse.as_deref())
            .bind(filter.date_from)
            .bind(filter.date_to)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_movements", e))?
            .try_get("total")
            .map_err(|e| StoreError::Corrupt(format!("failed to read count: {e}")))?;

        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements {WHERE} ORDER BY created_at DESC, movement_id DESC LIMIT $9 OFFSET $10"
        );
        let rows = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(filter.include_reversed)
            .bind(product_param)
            .bind(type_param)
            .bind(reason_param)
            .bind(filter.warehouse.as_deref())
            .bind(filter.date_from)
            .bind(filter.date_to)
            .bind(i64::from(pagination.limit))
            .bind(offset(pagination)?)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_movements", e))?;

        let movements = rows.iter().map(movement_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(movements, from_db(total, "total")?, pagination))
    }

    #[instrument(skip(self, window), fields(tenant_id = %tenant_id), err)]
    async fn movement_stats(&self, tenant_id: TenantId, window: &StatsWindow) -> Result<Vec<MovementStats>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                movement_type,
                reason,
                COUNT(*) AS count,
                SUM(quantity)::BIGINT AS total_quantity,
                COALESCE(SUM(total_cost), 0) AS total_cost
            FROM stock_movements
            WHERE tenant_id = $1
                AND is_reversed = FALSE
                AND created_at >= $2
                AND created_at <= $3
                AND ($4::uuid IS NULL OR product_id = $4)
            GROUP BY movement_type, reason
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(window.from)
        .bind(window.to)
        .bind(window.product_id.map(|p| *p.0.as_uuid()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("movement_stats", e))?;

        let mut stats = Vec::with_capacity(rows.len());
        for row in &rows {
            stats.push(MovementStats {
                movement_type: parse_column::<MovementType>(row, "movement_type")?,
                reason: parse_column::<MovementReason>(row, "reason")?,
                count: from_db(get(row, "count")?, "count")?,
                total_quantity: from_db(get(row, "total_quantity")?, "total_quantity")?,
                total_cost: get::<Decimal>(row, "total_cost")?,
            });
        }
        // Same order as the in-memory backend: count desc, then (type, reason).
        stats.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| (a.movement_type, a.reason).cmp(&(b.movement_type, b.reason)))
        });
        Ok(stats)
    }
}

/// Flag `original_id` as reversed by `reversal_id`, only if it is still unreversed.
async fn flag_reversed(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: TenantId,
    original_id: MovementId,
    reversal_id: MovementId,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE stock_movements
        SET is_reversed = TRUE, reversal_reference = $3
        WHERE tenant_id = $1 AND movement_id = $2 AND is_reversed = FALSE
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(original_id.0)
    .bind(reversal_id.0)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("flag_reversed", e))?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    let exists = sqlx::query("SELECT 1 FROM stock_movements WHERE tenant_id = $1 AND movement_id = $2")
        .bind(tenant_id.as_uuid())
        .bind(original_id.0)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("flag_reversed_lookup", e))?;
    match exists {
        Some(_) => Err(StoreError::AlreadyReversed),
        None => Err(StoreError::NotFound(format!("movement {original_id}"))),
    }
}

async fn abort<T>(tx: Transaction<'_, Postgres>, err: StoreError) -> Result<T, StoreError> {
    tx.rollback()
        .await
        .map_err(|e| map_sqlx_error("rollback", e))?;
    Err(err)
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let supplier_name: Option<String> = get(row, "supplier_name")?;
    let supplier_contact: Option<String> = get(row, "supplier_contact")?;
    let supplier = (supplier_name.is_some() || supplier_contact.is_some()).then_some(SupplierRef {
        name: supplier_name,
        contact: supplier_contact,
    });
    let max_stock_level: Option<i64> = get(row, "max_stock_level")?;
    let is_active: bool = get(row, "is_active")?;

    Ok(Product::from(ProductParts {
        id: ProductId::new(AggregateId::from_uuid(get(row, "product_id")?)),
        tenant_id: TenantId::from_uuid(get(row, "tenant_id")?),
        sku: get(row, "sku")?,
        name: get(row, "name")?,
        description: get(row, "description")?,
        category: get(row, "category")?,
        unit_price: get(row, "unit_price")?,
        current_stock: from_db(get(row, "current_stock")?, "current_stock")?,
        thresholds: StockThresholds {
            min_stock_level: from_db(get(row, "min_stock_level")?, "min_stock_level")?,
            max_stock_level: max_stock_level.map(|m| from_db(m, "max_stock_level")).transpose()?,
        },
        supplier,
        tags: get(row, "tags")?,
        status: ProductStatus::from_active(is_active),
        last_restock_date: get(row, "last_restock_date")?,
        expiration_date: get(row, "expiration_date")?,
        version: from_db(get(row, "version")?, "version")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    }))
}

fn movement_from_row(row: &PgRow) -> Result<StockMovement, StoreError> {
    let reversal_reference: Option<Uuid> = get(row, "reversal_reference")?;
    let created_at: DateTime<Utc> = get(row, "created_at")?;

    Ok(StockMovement {
        id: MovementId::from_uuid(get(row, "movement_id")?),
        tenant_id: TenantId::from_uuid(get(row, "tenant_id")?),
        product_id: ProductId::new(AggregateId::from_uuid(get(row, "product_id")?)),
        movement_type: parse_column(row, "movement_type")?,
        quantity: from_db(get(row, "quantity")?, "quantity")?,
        reason: parse_column(row, "reason")?,
        previous_stock: from_db(get(row, "previous_stock")?, "previous_stock")?,
        new_stock: from_db(get(row, "new_stock")?, "new_stock")?,
        reference: get(row, "reference")?,
        notes: get(row, "notes")?,
        unit_cost: get(row, "unit_cost")?,
        total_cost: get(row, "total_cost")?,
        performed_by: get(row, "performed_by")?,
        warehouse: get(row, "warehouse")?,
        batch_number: get(row, "batch_number")?,
        expiration_date: get(row, "expiration_date")?,
        is_reversed: get(row, "is_reversed")?,
        reversal_reference: reversal_reference.map(MovementId::from_uuid),
        created_at,
    })
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Corrupt(format!("failed to read column {column}: {e}")))
}

fn parse_column<T>(row: &PgRow, column: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = get(row, column)?;
    raw.parse()
        .map_err(|e| StoreError::Corrupt(format!("column {column}: {e}")))
}

fn to_db(value: u64, field: &str) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Corrupt(format!("{field} {value} does not fit BIGINT")))
}

fn from_db(value: i64, field: &str) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt(format!("{field} is negative ({value})")))
}

fn offset(pagination: Pagination) -> Result<i64, StoreError> {
    to_db(pagination.offset(), "offset")
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Concurrency(msg),
                Some("23514") => StoreError::Corrupt(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        sqlx::Error::RowNotFound => StoreError::Backend(format!("unexpected row not found in {operation}")),
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

fn is_unique_violation_on(err: &sqlx::Error, constraint: &str) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint);
    }
    false
}

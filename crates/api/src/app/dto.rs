use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use stockledger_core::AggregateRoot;
use stockledger_infra::{MovementFilter, Page, Pagination, ProductFilter};
use stockledger_inventory::{MovementDetails, MovementReason, MovementRequest, MovementType, ReversalRequest, StatsWindow};
use stockledger_products::{Product, ProductId, ProductPatch, SupplierRef};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateMovementRequest {
    pub product_id: String,
    pub movement_type: String,
    pub quantity: i64,
    pub reason: String,
    pub performed_by: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub unit_cost: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub warehouse: Option<String>,
    pub batch_number: Option<String>,
    pub expiration_date: Option<DateTime<Utc>>,
}

impl CreateMovementRequest {
    pub fn into_domain(self) -> Result<MovementRequest, axum::response::Response> {
        let product_id = parse_product_id(&self.product_id)?;
        let movement_type: MovementType = self
            .movement_type
            .parse()
            .map_err(errors::movement_error_to_response)?;
        let reason: MovementReason = self.reason.parse().map_err(errors::movement_error_to_response)?;

        Ok(MovementRequest {
            product_id,
            movement_type,
            quantity: self.quantity,
            reason,
            performed_by: self.performed_by,
            details: MovementDetails {
                reference: self.reference,
                notes: self.notes,
                unit_cost: self.unit_cost,
                total_cost: self.total_cost,
                warehouse: self.warehouse,
                batch_number: self.batch_number,
                expiration_date: self.expiration_date,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ReverseMovementRequest {
    pub performed_by: String,
    pub notes: Option<String>,
}

impl ReverseMovementRequest {
    pub fn into_domain(self, movement_id: stockledger_inventory::MovementId) -> ReversalRequest {
        ReversalRequest {
            movement_id,
            performed_by: self.performed_by,
            notes: self.notes,
        }
    }
}

/// Catalog edit. Stock is not accepted here; it only moves through the ledger.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProductRequest {
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

impl From<UpdateProductRequest> for ProductPatch {
    fn from(body: UpdateProductRequest) -> Self {
        ProductPatch {
            name: body.name,
            description: body.description,
            category: body.category,
            unit_price: body.unit_price,
            min_stock_level: body.min_stock_level,
            max_stock_level: body.max_stock_level,
            supplier: body.supplier,
            tags: body.tags,
            expiration_date: body.expiration_date,
        }
    }
}

// -------------------------
// Query DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
    pub active: Option<bool>,
    pub low_stock: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductListQuery {
    pub fn into_parts(self) -> (ProductFilter, Pagination) {
        let filter = ProductFilter {
            category: self.category.filter(|c| !c.trim().is_empty()),
            active: self.active,
            low_stock: self.low_stock.unwrap_or(false),
        };
        (filter, Pagination::new(self.page, self.limit))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MovementListQuery {
    pub product_id: Option<String>,
    pub movement_type: Option<String>,
    pub reason: Option<String>,
    pub warehouse: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub include_reversed: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl MovementListQuery {
    pub fn into_parts(self) -> Result<(MovementFilter, Pagination), axum::response::Response> {
        let product_id = self.product_id.as_deref().map(parse_product_id).transpose()?;
        let movement_type = self
            .movement_type
            .as_deref()
            .map(str::parse::<MovementType>)
            .transpose()
            .map_err(errors::movement_error_to_response)?;
        let reason = self
            .reason
            .as_deref()
            .map(str::parse::<MovementReason>)
            .transpose()
            .map_err(errors::movement_error_to_response)?;

        let filter = MovementFilter {
            product_id,
            movement_type,
            reason,
            warehouse: self.warehouse.filter(|w| !w.trim().is_empty()),
            date_from: self.date_from,
            date_to: self.date_to,
            include_reversed: self.include_reversed.unwrap_or(false),
        };
        Ok((filter, Pagination::new(self.page, self.limit)))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub product_id: Option<String>,
}

impl StatsQuery {
    pub fn into_window(self, now: DateTime<Utc>) -> Result<StatsWindow, axum::response::Response> {
        let product_id = self.product_id.as_deref().map(parse_product_id).transpose()?;
        StatsWindow::resolve(self.date_from, self.date_to, product_id, now).map_err(errors::movement_error_to_response)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

// -------------------------
// Response mapping
// -------------------------

pub fn product_to_json(p: &Product) -> Value {
    let thresholds = p.thresholds();
    json!({
        "id": p.id_typed().to_string(),
        "sku": p.sku(),
        "name": p.name(),
        "description": p.description(),
        "category": p.category(),
        "unit_price": p.unit_price(),
        "current_stock": p.current_stock(),
        "min_stock_level": thresholds.min_stock_level,
        "max_stock_level": thresholds.max_stock_level,
        "supplier": p.supplier(),
        "tags": p.tags(),
        "status": p.status().as_str(),
        "is_active": p.is_active(),
        "is_low_stock": p.is_low_stock(),
        "is_over_stock": p.is_over_stock(),
        "total_value": p.total_value(),
        "last_restock_date": p.last_restock_date(),
        "expiration_date": p.expiration_date(),
        "version": p.version(),
        "created_at": p.created_at(),
        "updated_at": p.updated_at(),
    })
}

pub fn page_to_json<T>(page: Page<T>, item: impl Fn(&T) -> Value) -> Value {
    json!({
        "items": page.items.iter().map(item).collect::<Vec<_>>(),
        "total": page.total,
        "page": page.page,
        "limit": page.limit,
        "total_pages": page.total_pages,
    })
}

pub fn parse_product_id(raw: &str) -> Result<ProductId, axum::response::Response> {
    raw.trim().parse().map_err(|_| errors::invalid_id("product"))
}

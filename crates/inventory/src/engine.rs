//! Movement planning.
//!
//! [`plan_movement`] turns a request and the product's current state into a
//! [`StockMutation`]: the ledger row to append plus the product as it must look
//! after the commit. Nothing here performs IO. Callers are expected to hold the
//! product's exclusive lock between loading the product and committing the plan.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{ensure_max_len, AggregateRoot};
use stockledger_products::{Product, ProductId};

use crate::error::MovementError;
use crate::movement::{
    MovementDetails, MovementId, MovementReason, MovementType, StockDirection, StockMovement,
    PERFORMED_BY_MAX_LEN,
};

/// Largest stock level a product may reach (fits a signed 64-bit column).
pub const MAX_STOCK_LEVEL: u64 = i64::MAX as u64;

/// A caller's request to move stock.
///
/// `quantity` is signed so that zero and negative input map to
/// [`MovementError::InvalidQuantity`] instead of failing to parse. For
/// ADJUSTMENT it is the absolute target level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRequest {
    pub product_id: ProductId,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reason: MovementReason,
    pub performed_by: String,
    #[serde(default)]
    pub details: MovementDetails,
}

/// Everything a store must write atomically for one movement.
#[derive(Debug, Clone, PartialEq)]
pub struct StockMutation {
    /// The product after the movement, version already bumped.
    pub product: Product,
    pub movement: StockMovement,
    /// Version the stored product must still have for the commit to succeed.
    pub expected_version: u64,
    /// Set when this movement compensates an earlier one, which the store
    /// flags as reversed in the same unit.
    pub reverses: Option<MovementId>,
}

impl StockMutation {
    /// Check that the row and the product describe the same transition.
    ///
    /// Stores run this inside their atomic unit before writing anything.
    pub fn verify(&self) -> Result<(), MovementError> {
        self.movement.verify_arithmetic()?;
        if self.movement.product_id != self.product.id_typed() || self.movement.tenant_id != self.product.tenant_id() {
            return Err(MovementError::LedgerInvariant(format!(
                "movement {} does not belong to product {}",
                self.movement.id,
                self.product.id_typed()
            )));
        }
        if self.product.current_stock() != self.movement.new_stock {
            return Err(MovementError::LedgerInvariant(format!(
                "product stock {} does not match ledger new_stock {}",
                self.product.current_stock(),
                self.movement.new_stock
            )));
        }
        if self.reverses == Some(self.movement.id) {
            return Err(MovementError::LedgerInvariant("a movement cannot reverse itself".to_string()));
        }
        Ok(())
    }
}

/// Plan a caller-requested movement against `product`.
pub fn plan_movement(
    product: &Product,
    request: MovementRequest,
    movement_id: MovementId,
    now: DateTime<Utc>,
) -> Result<StockMutation, MovementError> {
    if request.quantity <= 0 {
        return Err(MovementError::InvalidQuantity(request.quantity));
    }
    if product.id_typed() != request.product_id {
        return Err(MovementError::ProductNotFound);
    }

    let draft = Draft {
        movement_type: request.movement_type,
        reason: request.reason,
        amount: request.quantity.unsigned_abs(),
        performed_by: request.performed_by,
        details: request.details,
    };
    plan_draft(product, draft, movement_id, now)
}

/// A movement whose quantity has already been range-checked.
///
/// `amount` is a delta for IN/OUT/TRANSFER and a target for ADJUSTMENT; a
/// target of zero is reachable here (reversals) even though callers may not
/// request it directly.
#[derive(Debug, Clone)]
pub(crate) struct Draft {
    pub movement_type: MovementType,
    pub reason: MovementReason,
    pub amount: u64,
    pub performed_by: String,
    pub details: MovementDetails,
}

pub(crate) fn plan_draft(
    product: &Product,
    draft: Draft,
    movement_id: MovementId,
    now: DateTime<Utc>,
) -> Result<StockMutation, MovementError> {
    let performed_by = draft.performed_by.trim().to_string();
    if performed_by.is_empty() {
        return Err(MovementError::validation("performed_by is required"));
    }
    ensure_max_len("performed_by", &performed_by, PERFORMED_BY_MAX_LEN)?;
    let details = draft.details.normalized()?;

    if !product.is_active() {
        return Err(MovementError::ProductInactive);
    }

    let direction = draft.movement_type.direction(draft.reason);
    let previous = product.current_stock();
    let (quantity, new_stock) = transition(direction, previous, draft.amount)?;

    let total_cost = match (details.total_cost, details.unit_cost) {
        (Some(total), _) => Some(total),
        (None, Some(unit)) => Some(
            unit.checked_mul(Decimal::from(quantity))
                .ok_or_else(|| MovementError::validation("total_cost overflows"))?,
        ),
        (None, None) => None,
    };

    let movement = StockMovement {
        id: movement_id,
        tenant_id: product.tenant_id(),
        product_id: product.id_typed(),
        movement_type: draft.movement_type,
        quantity,
        reason: draft.reason,
        previous_stock: previous,
        new_stock,
        reference: details.reference,
        notes: details.notes,
        unit_cost: details.unit_cost,
        total_cost,
        performed_by,
        warehouse: details
            .warehouse
            .unwrap_or_else(|| crate::movement::DEFAULT_WAREHOUSE.to_string()),
        batch_number: details.batch_number,
        expiration_date: details.expiration_date,
        is_reversed: false,
        reversal_reference: None,
        created_at: now,
    };
    movement.verify_arithmetic()?;

    let mut updated = product.clone();
    updated.record_stock(new_stock, direction == StockDirection::Inbound, now);

    Ok(StockMutation {
        product: updated,
        movement,
        expected_version: product.version(),
        reverses: None,
    })
}

/// Ledger quantity and resulting stock for one movement.
fn transition(direction: StockDirection, previous: u64, amount: u64) -> Result<(u64, u64), MovementError> {
    match direction {
        StockDirection::Inbound => {
            let new_stock = previous
                .checked_add(amount)
                .filter(|s| *s <= MAX_STOCK_LEVEL)
                .ok_or_else(|| MovementError::validation("resulting stock exceeds the maximum level"))?;
            Ok((amount, new_stock))
        }
        StockDirection::Outbound => {
            let new_stock = previous.checked_sub(amount).ok_or(MovementError::InsufficientStock {
                current: previous,
                requested: amount,
            })?;
            Ok((amount, new_stock))
        }
        StockDirection::Absolute => {
            if amount > MAX_STOCK_LEVEL {
                return Err(MovementError::validation("resulting stock exceeds the maximum level"));
            }
            if amount == previous {
                return Err(MovementError::validation(format!(
                    "adjustment target {amount} equals current stock"
                )));
            }
            Ok((previous.abs_diff(amount), amount))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use stockledger_core::TenantId;
    use stockledger_products::NewProduct;

    fn product_with(stock: u64, min: u64) -> Product {
        let input = NewProduct {
            sku: Some("TEST-SKU-0001".to_string()),
            name: "Widget".to_string(),
            description: None,
            category: "Hardware".to_string(),
            unit_price: Decimal::new(250, 2),
            initial_stock: stock,
            min_stock_level: min,
            max_stock_level: None,
            supplier: None,
            tags: vec![],
            expiration_date: None,
        };
        Product::create(TenantId::new(), ProductId::generate(), input, "TEST-SKU-0001", Utc::now()).unwrap()
    }

    fn request(product: &Product, movement_type: MovementType, reason: MovementReason, quantity: i64) -> MovementRequest {
        MovementRequest {
            product_id: product.id_typed(),
            movement_type,
            quantity,
            reason,
            performed_by: "clerk".to_string(),
            details: MovementDetails::default(),
        }
    }

    fn plan(product: &Product, req: MovementRequest) -> Result<StockMutation, MovementError> {
        plan_movement(product, req, MovementId::new(), Utc::now())
    }

    #[test]
    fn out_then_oversized_out_reports_current_and_requested() {
        let product = product_with(10, 2);
        let first = plan(&product, request(&product, MovementType::Out, MovementReason::Sale, 5)).unwrap();
        assert_eq!(first.movement.previous_stock, 10);
        assert_eq!(first.movement.new_stock, 5);
        assert_eq!(first.product.current_stock(), 5);

        let err = plan(&first.product, request(&first.product, MovementType::Out, MovementReason::Sale, 10)).unwrap_err();
        assert_eq!(err, MovementError::InsufficientStock { current: 5, requested: 10 });
    }

    #[test]
    fn adjustment_sets_absolute_level() {
        let product = product_with(5, 0);
        let m = plan(
            &product,
            request(&product, MovementType::Adjustment, MovementReason::InventoryAdjustment, 3),
        )
        .unwrap();
        assert_eq!(m.movement.quantity, 2);
        assert_eq!(m.movement.new_stock, 3);
        assert_eq!(m.product.current_stock(), 3);
    }

    #[test]
    fn noop_adjustment_is_rejected() {
        let product = product_with(5, 0);
        let err = plan(
            &product,
            request(&product, MovementType::Adjustment, MovementReason::InventoryAdjustment, 5),
        )
        .unwrap_err();
        assert!(matches!(err, MovementError::Validation(_)));
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        let product = product_with(5, 0);
        for q in [0, -1, i64::MIN] {
            let err = plan(&product, request(&product, MovementType::In, MovementReason::Purchase, q)).unwrap_err();
            assert_eq!(err, MovementError::InvalidQuantity(q));
        }
    }

    #[test]
    fn inactive_products_reject_movements() {
        let mut product = product_with(5, 0);
        product.set_active(false, Utc::now());
        let err = plan(&product, request(&product, MovementType::In, MovementReason::Purchase, 1)).unwrap_err();
        assert_eq!(err, MovementError::ProductInactive);
    }

    #[test]
    fn performed_by_is_required() {
        let product = product_with(5, 0);
        let mut req = request(&product, MovementType::In, MovementReason::Purchase, 1);
        req.performed_by = "   ".to_string();
        assert!(matches!(plan(&product, req), Err(MovementError::Validation(_))));
    }

    #[test]
    fn inbound_movements_stamp_restock_date_and_bump_version() {
        let product = product_with(0, 0);
        let now = Utc::now();
        let m = plan_movement(
            &product,
            request(&product, MovementType::Transfer, MovementReason::TransferIn, 4),
            MovementId::new(),
            now,
        )
        .unwrap();
        assert_eq!(m.product.last_restock_date(), Some(now));
        assert_eq!(m.expected_version, 1);
        assert_eq!(m.product.version(), 2);
        assert_eq!(m.reverses, None);

        let out = plan(
            &m.product,
            request(&m.product, MovementType::Transfer, MovementReason::TransferOut, 4),
        )
        .unwrap();
        assert_eq!(out.product.current_stock(), 0);
        assert_eq!(out.product.last_restock_date(), Some(now));
    }

    #[test]
    fn total_cost_is_derived_from_unit_cost() {
        let product = product_with(5, 0);
        let mut req = request(&product, MovementType::In, MovementReason::Purchase, 4);
        req.details.unit_cost = Some(Decimal::new(150, 2));
        let m = plan(&product, req).unwrap();
        assert_eq!(m.movement.total_cost, Some(Decimal::new(600, 2)));
        assert_eq!(m.movement.warehouse, "MAIN");
    }

    #[test]
    fn explicit_total_cost_wins() {
        let product = product_with(5, 0);
        let mut req = request(&product, MovementType::In, MovementReason::Purchase, 4);
        req.details.unit_cost = Some(Decimal::new(150, 2));
        req.details.total_cost = Some(Decimal::new(5, 0));
        let m = plan(&product, req).unwrap();
        assert_eq!(m.movement.total_cost, Some(Decimal::new(5, 0)));
    }

    #[test]
    fn mismatched_product_is_not_found() {
        let product = product_with(5, 0);
        let other = product_with(5, 0);
        let err = plan(&product, request(&other, MovementType::In, MovementReason::Purchase, 1)).unwrap_err();
        assert_eq!(err, MovementError::ProductNotFound);
    }

    #[test]
    fn planned_mutations_verify() {
        let product = product_with(10, 0);
        let m = plan(&product, request(&product, MovementType::Out, MovementReason::Sale, 3)).unwrap();
        assert!(m.verify().is_ok());
    }

    #[test]
    fn tampered_mutations_fail_verification() {
        let product = product_with(10, 0);
        let planned = plan(&product, request(&product, MovementType::Out, MovementReason::Sale, 3)).unwrap();

        let mut bad_row = planned.clone();
        bad_row.movement.new_stock = 9;
        assert!(matches!(bad_row.verify(), Err(MovementError::LedgerInvariant(_))));

        let mut bad_stock = planned.clone();
        bad_stock.product.record_stock(9, false, Utc::now());
        assert!(matches!(bad_stock.verify(), Err(MovementError::LedgerInvariant(_))));

        let mut foreign = planned.clone();
        foreign.movement.product_id = ProductId::generate();
        assert!(matches!(foreign.verify(), Err(MovementError::LedgerInvariant(_))));

        let mut self_reversal = planned;
        self_reversal.reverses = Some(self_reversal.movement.id);
        assert!(matches!(self_reversal.verify(), Err(MovementError::LedgerInvariant(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn inbound_adds_quantity(stock in 0u64..1_000_000, qty in 1i64..1_000_000) {
            let product = product_with(stock, 0);
            let m = plan(&product, request(&product, MovementType::In, MovementReason::Purchase, qty)).unwrap();
            prop_assert_eq!(m.movement.new_stock, stock + qty as u64);
            prop_assert_eq!(m.movement.previous_stock, stock);
        }

        #[test]
        fn outbound_subtracts_or_refuses(stock in 0u64..1_000, qty in 1i64..2_000) {
            let product = product_with(stock, 0);
            let result = plan(&product, request(&product, MovementType::Out, MovementReason::Sale, qty));
            let qty = qty as u64;
            if qty > stock {
                prop_assert_eq!(result.unwrap_err(), MovementError::InsufficientStock { current: stock, requested: qty });
            } else {
                let m = result.unwrap();
                prop_assert_eq!(m.movement.new_stock, stock - qty);
            }
        }

        #[test]
        fn adjustment_quantity_is_distance_to_target(stock in 0u64..1_000, target in 1i64..1_000) {
            prop_assume!(stock != target as u64);
            let product = product_with(stock, 0);
            let m = plan(
                &product,
                request(&product, MovementType::Adjustment, MovementReason::InventoryAdjustment, target),
            )
            .unwrap();
            prop_assert_eq!(m.movement.new_stock, target as u64);
            prop_assert_eq!(m.movement.quantity, stock.abs_diff(target as u64));
        }
    }
}

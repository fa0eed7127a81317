//! Compensating movements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_products::Product;

use crate::engine::{plan_draft, Draft, StockMutation};
use crate::error::MovementError;
use crate::movement::{MovementDetails, MovementId, MovementReason, MovementType, StockDirection, StockMovement};

pub const DEFAULT_REVERSAL_NOTES: &str = "Movement reversal";
const REVERSAL_REFERENCE_PREFIX: &str = "REVERSAL-";
const REVERSAL_NOTES_PREFIX: &str = "Reversal: ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalRequest {
    pub movement_id: MovementId,
    pub performed_by: String,
    pub notes: Option<String>,
}

/// Plan the movement that undoes `original`.
///
/// IN-direction rows are undone by an OUT of the same quantity and vice versa.
/// An ADJUSTMENT is undone by an ADJUSTMENT back to the original's
/// `previous_stock`. The returned mutation carries `reverses`, so the store
/// flags the original in the same atomic unit.
///
/// When later movements have already brought stock back to that level the
/// adjustment has nothing left to undo; this fails with
/// [`MovementError::Validation`] and the original stays unreversed.
pub fn plan_reversal(
    original: &StockMovement,
    product: &Product,
    request: ReversalRequest,
    reversal_id: MovementId,
    now: DateTime<Utc>,
) -> Result<StockMutation, MovementError> {
    if original.id != request.movement_id {
        return Err(MovementError::MovementNotFound);
    }
    if original.is_reversed {
        return Err(MovementError::AlreadyReversed);
    }
    if original.product_id != product.id_typed() || original.tenant_id != product.tenant_id() {
        return Err(MovementError::ProductNotFound);
    }

    let (movement_type, amount) = match original.direction() {
        StockDirection::Inbound => (MovementType::Out, original.quantity),
        StockDirection::Outbound => (MovementType::In, original.quantity),
        StockDirection::Absolute => (MovementType::Adjustment, original.previous_stock),
    };

    let notes = request
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_REVERSAL_NOTES);

    let draft = Draft {
        movement_type,
        reason: MovementReason::InventoryAdjustment,
        amount,
        performed_by: request.performed_by,
        details: MovementDetails {
            reference: Some(format!("{REVERSAL_REFERENCE_PREFIX}{}", original.id)),
            notes: Some(format!("{REVERSAL_NOTES_PREFIX}{notes}")),
            warehouse: Some(original.warehouse.clone()),
            ..MovementDetails::default()
        },
    };

    let mut mutation = plan_draft(product, draft, reversal_id, now)?;
    mutation.reverses = Some(original.id);
    Ok(mutation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{plan_movement, MovementRequest};
    use rust_decimal::Decimal;
    use stockledger_core::TenantId;
    use stockledger_products::{NewProduct, ProductId};

    fn product_with(stock: u64) -> Product {
        let input = NewProduct {
            sku: None,
            name: "Gadget".to_string(),
            description: None,
            category: "Tools".to_string(),
            unit_price: Decimal::ONE,
            initial_stock: stock,
            min_stock_level: 0,
            max_stock_level: None,
            supplier: None,
            tags: vec![],
            expiration_date: None,
        };
        Product::create(TenantId::new(), ProductId::generate(), input, "TOOL-GAD-0001", Utc::now()).unwrap()
    }

    fn apply(product: &Product, movement_type: MovementType, reason: MovementReason, quantity: i64) -> StockMutation {
        let req = MovementRequest {
            product_id: product.id_typed(),
            movement_type,
            quantity,
            reason,
            performed_by: "clerk".to_string(),
            details: MovementDetails {
                warehouse: Some("EAST".to_string()),
                ..MovementDetails::default()
            },
        };
        plan_movement(product, req, MovementId::new(), Utc::now()).unwrap()
    }

    fn reverse(original: &StockMovement, product: &Product, notes: Option<&str>) -> Result<StockMutation, MovementError> {
        let req = ReversalRequest {
            movement_id: original.id,
            performed_by: "supervisor".to_string(),
            notes: notes.map(str::to_string),
        };
        plan_reversal(original, product, req, MovementId::new(), Utc::now())
    }

    #[test]
    fn reversing_an_in_restores_stock_with_an_out() {
        let product = product_with(10);
        let applied = apply(&product, MovementType::In, MovementReason::Purchase, 7);
        let reversal = reverse(&applied.movement, &applied.product, Some("wrong delivery")).unwrap();

        assert_eq!(reversal.movement.movement_type, MovementType::Out);
        assert_eq!(reversal.movement.reason, MovementReason::InventoryAdjustment);
        assert_eq!(reversal.movement.quantity, 7);
        assert_eq!(reversal.product.current_stock(), 10);
        assert_eq!(reversal.reverses, Some(applied.movement.id));
        assert_eq!(
            reversal.movement.reference.as_deref(),
            Some(format!("REVERSAL-{}", applied.movement.id).as_str())
        );
        assert_eq!(reversal.movement.notes.as_deref(), Some("Reversal: wrong delivery"));
        assert_eq!(reversal.movement.warehouse, "EAST");
    }

    #[test]
    fn default_notes_are_used_when_none_given() {
        let product = product_with(10);
        let applied = apply(&product, MovementType::Out, MovementReason::Sale, 3);
        let reversal = reverse(&applied.movement, &applied.product, Some("  ")).unwrap();
        assert_eq!(reversal.movement.movement_type, MovementType::In);
        assert_eq!(reversal.movement.notes.as_deref(), Some("Reversal: Movement reversal"));
        assert_eq!(reversal.product.current_stock(), 10);
    }

    #[test]
    fn reversed_rows_cannot_be_reversed_again() {
        let product = product_with(10);
        let mut applied = apply(&product, MovementType::In, MovementReason::Purchase, 1);
        applied.movement.mark_reversed(MovementId::new()).unwrap();
        let err = reverse(&applied.movement, &applied.product, None).unwrap_err();
        assert_eq!(err, MovementError::AlreadyReversed);
    }

    #[test]
    fn reversing_an_in_after_the_stock_left_is_insufficient() {
        let product = product_with(0);
        let applied = apply(&product, MovementType::In, MovementReason::Purchase, 5);
        let sold = apply(&applied.product, MovementType::Out, MovementReason::Sale, 4);
        let err = reverse(&applied.movement, &sold.product, None).unwrap_err();
        assert_eq!(err, MovementError::InsufficientStock { current: 1, requested: 5 });
    }

    #[test]
    fn adjustment_reversal_restores_previous_level_even_to_zero() {
        let product = product_with(0);
        let adjusted = apply(&product, MovementType::Adjustment, MovementReason::InventoryAdjustment, 8);
        let reversal = reverse(&adjusted.movement, &adjusted.product, None).unwrap();
        assert_eq!(reversal.movement.movement_type, MovementType::Adjustment);
        assert_eq!(reversal.movement.quantity, 8);
        assert_eq!(reversal.product.current_stock(), 0);
    }

    #[test]
    fn adjustment_with_no_remaining_effect_cannot_be_reversed() {
        let product = product_with(5);
        let adjusted = apply(&product, MovementType::Adjustment, MovementReason::InventoryAdjustment, 3);
        let restocked = apply(&adjusted.product, MovementType::In, MovementReason::Purchase, 2);
        assert_eq!(restocked.product.current_stock(), 5);

        let err = reverse(&adjusted.movement, &restocked.product, None).unwrap_err();
        assert!(matches!(err, MovementError::Validation(_)));
        assert!(!adjusted.movement.is_reversed);
    }

    #[test]
    fn transfer_legs_reverse_in_the_opposite_direction() {
        let product = product_with(6);
        let out_leg = apply(&product, MovementType::Transfer, MovementReason::TransferOut, 6);
        let reversal = reverse(&out_leg.movement, &out_leg.product, None).unwrap();
        assert_eq!(reversal.movement.movement_type, MovementType::In);
        assert_eq!(reversal.product.current_stock(), 6);
    }

    #[test]
    fn reversal_against_another_product_is_rejected() {
        let product = product_with(5);
        let applied = apply(&product, MovementType::In, MovementReason::Purchase, 1);
        let other = product_with(5);
        let err = reverse(&applied.movement, &other, None).unwrap_err();
        assert_eq!(err, MovementError::ProductNotFound);
    }
}

//! Movement statistics: counts and totals per (type, reason).

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_products::ProductId;

use crate::error::MovementError;
use crate::movement::{MovementReason, MovementType, StockMovement};

/// Days covered when no explicit range is given.
pub const DEFAULT_STATS_DAYS: i64 = 30;

/// Inclusive time range, optionally narrowed to one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub product_id: Option<ProductId>,
}

impl StatsWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>, product_id: Option<ProductId>) -> Result<Self, MovementError> {
        if from > to {
            return Err(MovementError::validation("date_from must not be after date_to"));
        }
        Ok(Self { from, to, product_id })
    }

    /// `[now - DEFAULT_STATS_DAYS, now]`, with either bound overridable.
    pub fn resolve(
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        product_id: Option<ProductId>,
        now: DateTime<Utc>,
    ) -> Result<Self, MovementError> {
        let to = to.unwrap_or(now);
        let from = from.unwrap_or(to - Duration::days(DEFAULT_STATS_DAYS));
        Self::new(from, to, product_id)
    }

    /// Whether a row counts towards the statistics. Reversed rows never do.
    pub fn includes(&self, movement: &StockMovement) -> bool {
        !movement.is_reversed
            && movement.created_at >= self.from
            && movement.created_at <= self.to
            && self.product_id.is_none_or(|p| p == movement.product_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementStats {
    pub movement_type: MovementType,
    pub reason: MovementReason,
    pub count: u64,
    pub total_quantity: u64,
    pub total_cost: Decimal,
}

/// Group the rows inside `window` by (type, reason), most frequent first.
///
/// Rows without a cost contribute zero to `total_cost`.
pub fn aggregate_stats<'a>(
    movements: impl IntoIterator<Item = &'a StockMovement>,
    window: &StatsWindow,
) -> Vec<MovementStats> {
    let mut groups: BTreeMap<(MovementType, MovementReason), MovementStats> = BTreeMap::new();

    for m in movements.into_iter().filter(|m| window.includes(m)) {
        let entry = groups.entry((m.movement_type, m.reason)).or_insert_with(|| MovementStats {
            movement_type: m.movement_type,
            reason: m.reason,
            count: 0,
            total_quantity: 0,
            total_cost: Decimal::ZERO,
        });
        entry.count += 1;
        entry.total_quantity = entry.total_quantity.saturating_add(m.quantity);
        entry.total_cost = entry
            .total_cost
            .saturating_add(m.total_cost.unwrap_or(Decimal::ZERO));
    }

    let mut stats: Vec<MovementStats> = groups.into_values().collect();
    // Stable sort keeps (type, reason) order among equal counts.
    stats.sort_by(|a, b| b.count.cmp(&a.count));
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::{MovementId, DEFAULT_WAREHOUSE};
    use stockledger_core::TenantId;

    fn row(
        product_id: ProductId,
        movement_type: MovementType,
        reason: MovementReason,
        quantity: u64,
        cost: Option<i64>,
        at: DateTime<Utc>,
    ) -> StockMovement {
        StockMovement {
            id: MovementId::new(),
            tenant_id: TenantId::new(),
            product_id,
            movement_type,
            quantity,
            reason,
            previous_stock: 100,
            new_stock: 100 + quantity,
            reference: None,
            notes: None,
            unit_cost: None,
            total_cost: cost.map(Decimal::from),
            performed_by: "clerk".to_string(),
            warehouse: DEFAULT_WAREHOUSE.to_string(),
            batch_number: None,
            expiration_date: None,
            is_reversed: false,
            reversal_reference: None,
            created_at: at,
        }
    }

    #[test]
    fn groups_by_type_and_reason_ordered_by_count() {
        let now = Utc::now();
        let p = ProductId::generate();
        let rows = vec![
            row(p, MovementType::In, MovementReason::Purchase, 5, Some(10), now),
            row(p, MovementType::Out, MovementReason::Sale, 1, None, now),
            row(p, MovementType::Out, MovementReason::Sale, 2, Some(4), now),
            row(p, MovementType::Out, MovementReason::Sale, 3, None, now),
        ];
        let window = StatsWindow::resolve(None, None, None, now).unwrap();
        let stats = aggregate_stats(&rows, &window);

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].movement_type, MovementType::Out);
        assert_eq!(stats[0].count, 3);
        assert_eq!(stats[0].total_quantity, 6);
        assert_eq!(stats[0].total_cost, Decimal::from(4));
        assert_eq!(stats[1].reason, MovementReason::Purchase);
        assert_eq!(stats[1].total_cost, Decimal::from(10));
    }

    #[test]
    fn excludes_reversed_out_of_range_and_other_products() {
        let now = Utc::now();
        let p = ProductId::generate();
        let mut reversed = row(p, MovementType::In, MovementReason::Purchase, 5, None, now);
        reversed.is_reversed = true;
        let rows = vec![
            reversed,
            row(p, MovementType::In, MovementReason::Purchase, 5, None, now - Duration::days(31)),
            row(ProductId::generate(), MovementType::In, MovementReason::Purchase, 5, None, now),
            row(p, MovementType::In, MovementReason::Return, 2, None, now),
        ];
        let window = StatsWindow::resolve(None, None, Some(p), now).unwrap();
        let stats = aggregate_stats(&rows, &window);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].reason, MovementReason::Return);
        assert_eq!(stats[0].count, 1);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let now = Utc::now();
        let err = StatsWindow::new(now, now - Duration::hours(1), None).unwrap_err();
        assert!(matches!(err, MovementError::Validation(_)));
    }
}

//! Read-side query parameters shared by every store backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_inventory::{MovementReason, MovementType, StockMovement};
use stockledger_products::{Product, ProductId};

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 1000;
pub const DEFAULT_PRODUCT_HISTORY_LIMIT: u32 = 50;

/// 1-based page parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Pagination {
    /// Clamp caller input: page at least 1, limit in `1..=MAX_PAGE_LIMIT`.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// One page of results plus the total across all pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            page: pagination.page,
            limit: pagination.limit,
            total_pages: total.div_ceil(u64::from(pagination.limit)),
        }
    }

    /// Slice an already-filtered, already-ordered list.
    pub fn from_sorted(all: Vec<T>, pagination: Pagination) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(usize::try_from(pagination.offset()).unwrap_or(usize::MAX))
            .take(pagination.limit as usize)
            .collect();
        Self::new(items, total, pagination)
    }
}

pub type MovementPage = Page<StockMovement>;
pub type ProductPage = Page<Product>;

/// Ledger filter. Reversed rows are hidden unless `include_reversed` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<ProductId>,
    pub movement_type: Option<MovementType>,
    pub reason: Option<MovementReason>,
    pub warehouse: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub include_reversed: bool,
}

impl MovementFilter {
    pub fn matches(&self, m: &StockMovement) -> bool {
        (self.include_reversed || !m.is_reversed)
            && self.product_id.is_none_or(|p| p == m.product_id)
            && self.movement_type.is_none_or(|t| t == m.movement_type)
            && self.reason.is_none_or(|r| r == m.reason)
            && self.warehouse.as_deref().is_none_or(|w| w == m.warehouse)
            && self.date_from.is_none_or(|from| m.created_at >= from)
            && self.date_to.is_none_or(|to| m.created_at <= to)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub active: Option<bool>,
    /// Only products at or below their minimum level.
    #[serde(default)]
    pub low_stock: bool,
}

impl ProductFilter {
    pub fn matches(&self, p: &Product) -> bool {
        self.category.as_deref().is_none_or(|c| c == p.category())
            && self.active.is_none_or(|a| a == p.is_active())
            && (!self.low_stock || p.is_low_stock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_input() {
        let p = Pagination::new(Some(0), Some(5000));
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, MAX_PAGE_LIMIT);
        assert_eq!(Pagination::new(Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn page_slices_and_counts() {
        let page = Page::from_sorted((1..=25).collect::<Vec<u32>>(), Pagination::new(Some(3), Some(10)));
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);

        let empty = Page::from_sorted(Vec::<u32>::new(), Pagination::default());
        assert_eq!(empty.total_pages, 0);
    }
}

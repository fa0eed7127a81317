use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockledger_core::{ensure_max_len, TenantId};
use stockledger_products::ProductId;

use crate::error::MovementError;

pub const DEFAULT_WAREHOUSE: &str = "MAIN";
pub const REFERENCE_MAX_LEN: usize = 100;
pub const NOTES_MAX_LEN: usize = 500;
pub const PERFORMED_BY_MAX_LEN: usize = 50;
pub const WAREHOUSE_MAX_LEN: usize = 50;
pub const BATCH_NUMBER_MAX_LEN: usize = 50;

/// Ledger row identifier (UUIDv7, so ids sort in creation order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementId(pub Uuid);

impl MovementId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for MovementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MovementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MovementId {
    type Err = MovementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| MovementError::validation(format!("MovementId: {e}")))
    }
}

/// Kind of stock transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    In,
    Out,
    /// The requested quantity is the absolute target level, not a delta.
    Adjustment,
    Transfer,
}

impl MovementType {
    pub const ALL: [MovementType; 4] = [
        MovementType::In,
        MovementType::Out,
        MovementType::Adjustment,
        MovementType::Transfer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
            MovementType::Adjustment => "ADJUSTMENT",
            MovementType::Transfer => "TRANSFER",
        }
    }

    /// How this type moves stock given its reason.
    ///
    /// A TRANSFER is an outflow leg only when its reason is `TRANSFER_OUT`.
    pub fn direction(&self, reason: MovementReason) -> StockDirection {
        match self {
            MovementType::In => StockDirection::Inbound,
            MovementType::Out => StockDirection::Outbound,
            MovementType::Adjustment => StockDirection::Absolute,
            MovementType::Transfer if reason == MovementReason::TransferOut => StockDirection::Outbound,
            MovementType::Transfer => StockDirection::Inbound,
        }
    }
}

impl std::str::FromStr for MovementType {
    type Err = MovementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MovementType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| MovementError::InvalidMovementType(s.to_string()))
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business reason recorded with every movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementReason {
    Purchase,
    Sale,
    Return,
    Damaged,
    Expired,
    Theft,
    InventoryAdjustment,
    TransferIn,
    TransferOut,
}

impl MovementReason {
    pub const ALL: [MovementReason; 9] = [
        MovementReason::Purchase,
        MovementReason::Sale,
        MovementReason::Return,
        MovementReason::Damaged,
        MovementReason::Expired,
        MovementReason::Theft,
        MovementReason::InventoryAdjustment,
        MovementReason::TransferIn,
        MovementReason::TransferOut,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementReason::Purchase => "PURCHASE",
            MovementReason::Sale => "SALE",
            MovementReason::Return => "RETURN",
            MovementReason::Damaged => "DAMAGED",
            MovementReason::Expired => "EXPIRED",
            MovementReason::Theft => "THEFT",
            MovementReason::InventoryAdjustment => "INVENTORY_ADJUSTMENT",
            MovementReason::TransferIn => "TRANSFER_IN",
            MovementReason::TransferOut => "TRANSFER_OUT",
        }
    }
}

impl std::str::FromStr for MovementReason {
    type Err = MovementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MovementReason::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| MovementError::InvalidReason(s.to_string()))
    }
}

impl std::fmt::Display for MovementReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effect of a movement on the stock level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDirection {
    /// `new = previous + quantity`
    Inbound,
    /// `new = previous - quantity`, guarded by the sufficiency check.
    Outbound,
    /// `new = target`, ledger quantity is `|target - previous|`.
    Absolute,
}

/// Optional attributes carried on a ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MovementDetails {
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub unit_cost: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub warehouse: Option<String>,
    pub batch_number: Option<String>,
    pub expiration_date: Option<DateTime<Utc>>,
}

impl MovementDetails {
    /// Trim text fields, drop empty ones, default the warehouse, and check bounds.
    pub fn normalized(self) -> Result<Self, MovementError> {
        let reference = clean(self.reference);
        let notes = clean(self.notes);
        let warehouse = clean(self.warehouse).unwrap_or_else(|| DEFAULT_WAREHOUSE.to_string());
        let batch_number = clean(self.batch_number);

        if let Some(reference) = &reference {
            ensure_max_len("reference", reference, REFERENCE_MAX_LEN)?;
        }
        if let Some(notes) = &notes {
            ensure_max_len("notes", notes, NOTES_MAX_LEN)?;
        }
        ensure_max_len("warehouse", &warehouse, WAREHOUSE_MAX_LEN)?;
        if let Some(batch_number) = &batch_number {
            ensure_max_len("batch_number", batch_number, BATCH_NUMBER_MAX_LEN)?;
        }
        for (field, cost) in [("unit_cost", self.unit_cost), ("total_cost", self.total_cost)] {
            if cost.is_some_and(|c| c < Decimal::ZERO) {
                return Err(MovementError::validation(format!("{field} cannot be negative")));
            }
        }

        Ok(Self {
            reference,
            notes,
            unit_cost: self.unit_cost,
            total_cost: self.total_cost,
            warehouse: Some(warehouse),
            batch_number,
            expiration_date: self.expiration_date,
        })
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// One immutable ledger row.
///
/// The only field that ever changes after commit is the reversal marker, and
/// only once (see [`StockMovement::mark_reversed`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub movement_type: MovementType,
    pub quantity: u64,
    pub reason: MovementReason,
    pub previous_stock: u64,
    pub new_stock: u64,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub unit_cost: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub performed_by: String,
    pub warehouse: String,
    pub batch_number: Option<String>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub is_reversed: bool,
    pub reversal_reference: Option<MovementId>,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn direction(&self) -> StockDirection {
        self.movement_type.direction(self.reason)
    }

    /// Check the row's stock arithmetic against its type.
    ///
    /// Runs on every planned row before it reaches a store.
    pub fn verify_arithmetic(&self) -> Result<(), MovementError> {
        let consistent = match self.direction() {
            StockDirection::Inbound => self.previous_stock.checked_add(self.quantity) == Some(self.new_stock),
            StockDirection::Outbound => self.previous_stock.checked_sub(self.quantity) == Some(self.new_stock),
            StockDirection::Absolute => self.previous_stock.abs_diff(self.new_stock) == self.quantity,
        };

        if !consistent {
            return Err(MovementError::LedgerInvariant(format!(
                "{} movement of {} cannot take stock from {} to {}",
                self.movement_type, self.quantity, self.previous_stock, self.new_stock
            )));
        }
        if self.quantity == 0 {
            return Err(MovementError::LedgerInvariant(
                "ledger quantity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Flag this row as reversed by `reversal`. Fails if already flagged.
    pub fn mark_reversed(&mut self, reversal: MovementId) -> Result<(), MovementError> {
        if self.is_reversed {
            return Err(MovementError::AlreadyReversed);
        }
        self.is_reversed = true;
        self.reversal_reference = Some(reversal);
        Ok(())
    }
}

/// Ledger order for reads: newest first, ties broken by the time-ordered id.
pub fn sort_newest_first(movements: &mut [StockMovement]) {
    movements.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}

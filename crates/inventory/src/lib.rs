//! Inventory domain module: the stock movement ledger.
//!
//! This crate contains the business rules for recording stock movements,
//! computing the resulting stock level, and reversing prior movements,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage). Planning functions return a [`StockMutation`] that a store
//! commits as one atomic unit.

pub mod engine;
pub mod error;
pub mod movement;
pub mod reversal;
pub mod stats;

pub use engine::{plan_movement, MovementRequest, StockMutation, MAX_STOCK_LEVEL};
pub use error::MovementError;
pub use movement::{
    sort_newest_first, MovementDetails, MovementId, MovementReason, MovementType, StockDirection,
    StockMovement, DEFAULT_WAREHOUSE,
};
pub use reversal::{plan_reversal, ReversalRequest, DEFAULT_REVERSAL_NOTES};
pub use stats::{aggregate_stats, MovementStats, StatsWindow, DEFAULT_STATS_DAYS};

use thiserror::Error;

use stockledger_core::DomainError;

/// Deterministic failures of movement planning.
///
/// Every variant is raised before anything is written.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MovementError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid movement type: {0}")]
    InvalidMovementType(String),

    #[error("invalid movement reason: {0}")]
    InvalidReason(String),

    #[error("quantity must be greater than zero (got {0})")]
    InvalidQuantity(i64),

    #[error("insufficient stock: current {current}, requested {requested}")]
    InsufficientStock { current: u64, requested: u64 },

    #[error("product not found")]
    ProductNotFound,

    #[error("product is inactive")]
    ProductInactive,

    #[error("movement not found")]
    MovementNotFound,

    #[error("movement has already been reversed")]
    AlreadyReversed,

    /// A planned ledger row does not satisfy the stock arithmetic for its type.
    #[error("ledger invariant violated: {0}")]
    LedgerInvariant(String),
}

impl MovementError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<DomainError> for MovementError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => MovementError::Validation(msg),
            DomainError::InvariantViolation(msg) => MovementError::LedgerInvariant(msg),
            DomainError::Conflict(msg) => MovementError::Validation(msg),
            DomainError::NotFound => MovementError::ProductNotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_onto_movement_errors() {
        assert_eq!(
            MovementError::from(DomainError::validation("bad sku")),
            MovementError::Validation("bad sku".to_string())
        );
        assert_eq!(
            MovementError::from(DomainError::InvariantViolation("chain".to_string())),
            MovementError::LedgerInvariant("chain".to_string())
        );
        assert_eq!(MovementError::from(DomainError::NotFound), MovementError::ProductNotFound);
    }
}

//! `stockledger-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the shared domain error, and the optimistic version check used
//! by every store commit.

pub mod aggregate;
pub mod error;
pub mod id;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use error::{ensure_max_len, DomainError, DomainResult};
pub use id::{AggregateId, TenantId};

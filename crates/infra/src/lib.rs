//! Infrastructure layer: storage backends, per-product locking, and the
//! orchestration that turns domain plans into committed state.

pub mod catalog;
pub mod locks;
pub mod stock_engine;
pub mod store;


pub use catalog::{CatalogError, ProductCatalog};
pub use locks::ProductLocks;
pub use stock_engine::{AppliedMovement, EngineError, ReversedMovement, StockEngine};
pub use store::{
    InMemoryInventoryStore, InventoryStore, MovementFilter, MovementPage, Page, Pagination, PostgresInventoryStore,
    ProductFilter, ProductPage, StoreError,
};

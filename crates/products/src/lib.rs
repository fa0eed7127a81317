//! Products domain module.
//!
//! This crate contains the product aggregate (identity, thresholds, the mutable
//! stock level, Active/Inactive lifecycle) and the SKU generator, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod product;
pub mod sku;

pub use product::{
    NewProduct, Product, ProductId, ProductParts, ProductPatch, ProductStatus, StockThresholds,
    SupplierRef,
};
pub use sku::{SkuGenerator, MAX_SKU_ATTEMPTS};

//! Plain serde data model shared by the catalog, ledger, and storage layers.

/// Order records: status lifecycle, payment methods, creation snapshot
pub mod order;
/// Product records and their purchasable variants
pub mod product;

pub use order::{Order, OrderStatus, PaymentMethod};
pub use product::{Product, Variant};

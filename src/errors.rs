//! Unified error types for `OrderDesk`.
//!
//! Validation and lookup failures are recoverable by design: the bot surfaces
//! them as a re-prompt or an admin alert and leaves all state unchanged. Only
//! startup failures (configuration, storage bootstrap) abort the process.

use crate::entities::order::OrderStatus;
use thiserror::Error;

/// All failure modes of the order-intake system.
#[derive(Debug, Error)]
pub enum Error {
    /// Startup or settings problem (missing env var, bad orderdesk.toml).
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of what is misconfigured
        message: String,
    },

    /// User input rejected (bad quantity, malformed variant spec, stale action).
    /// Surfaced as a re-prompt; the flow state is left unchanged.
    #[error("{message}")]
    Validation {
        /// Re-prompt text shown to the user
        message: String,
    },

    /// No product with this id exists in the catalog.
    #[error("Product {id} not found")]
    ProductNotFound {
        /// The id that failed to resolve
        id: u64,
    },

    /// No variant with this id exists on the given product.
    #[error("Variant {variant_id} not found on product {product_id}")]
    VariantNotFound {
        /// Owning product id
        product_id: u64,
        /// The variant id that failed to resolve
        variant_id: u32,
    },

    /// No order with this id exists in the ledger.
    #[error("Order {id} not found")]
    OrderNotFound {
        /// The id that failed to resolve
        id: u64,
    },

    /// A screenshot arrived but the user has no order awaiting one.
    #[error("No pending order awaiting a screenshot for user {user}")]
    NoPendingOrder {
        /// The user whose ledger entries were searched
        user: i64,
    },

    /// Admin tried to confirm/reject an order that already left review.
    #[error("Order {id} was already processed (status: {status})")]
    AlreadyProcessed {
        /// The order in question
        id: u64,
        /// Its current status
        status: OrderStatus,
    },

    /// A non-admin invoked an admin-only operation.
    #[error("Operation restricted to the admin")]
    Unauthorized,

    /// Filesystem failure while reading or rewriting the data files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The data files hold records we cannot (de)serialize.
    #[error("Storage format error: {0}")]
    Json(#[from] serde_json::Error),

    /// Required environment variable missing or unreadable.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Outbound delivery failure from the Telegram API. Logged and tolerated:
    /// the surrounding mutation stays valid even if its notification is lost.
    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),
}

/// Convenience `Result` type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

//! Core business logic - framework-agnostic and fully unit-testable.
//!
//! Nothing in this module knows about Telegram. The bot layer translates
//! inbound updates into [`flow::FlowEvent`]s and renders the typed replies.

/// Catalog store: products, variants, and the variant-spec parser
pub mod catalog;
/// Order flow engine: the per-user state machine
pub mod flow;
/// Order ledger: append-only order records and status transitions
pub mod ledger;
/// Admin review workflow: confirm/reject with duplicate guards
pub mod review;
/// Per-user ephemeral conversation state
pub mod session;

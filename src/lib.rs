//! `OrderDesk` - A Telegram bot for manual order intake
//!
//! This crate provides a conversational order-intake flow accessible via Telegram:
//! buyers pick a product and its variants, enter a quantity, choose a payment
//! method, and upload a payment screenshot. Submitted orders are routed to a
//! single human admin who confirms or rejects them; fulfillment stays manual
//! and off-system.

// Deny the most critical lints that could lead to bugs or security issues
#![deny(
    // Security and correctness
    unsafe_code,
    unsafe_op_in_unsafe_fn,

    // Code quality - things that are almost always bugs
    unreachable_code,
    unreachable_patterns,
    unused_must_use,

    // Documentation - broken links are bugs
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
)]
// Warn on things that should be fixed but aren't necessarily bugs
#![warn(
    missing_docs,

    clippy::all,
    clippy::pedantic,

    // Performance
    clippy::inefficient_to_string,
    clippy::needless_pass_by_value,

    // Correctness
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,

    // Style consistency
    clippy::enum_glob_use,
    clippy::semicolon_if_nothing_returned,
    clippy::wildcard_imports,

    // Future compatibility
    future_incompatible,
    rust_2018_idioms,
)]
// Allow some pedantic lints that are too noisy or not applicable
#![allow(
    clippy::module_name_repetitions,  // Common pattern in Rust
    clippy::missing_errors_doc,        // Will add gradually
    clippy::missing_panics_doc,        // Will add gradually
)]

/// Telegram interface - dispatcher wiring, commands, handlers, rendering
pub mod bot;
/// Configuration management for data paths, admin identity, and pacing
pub mod config;
/// Core business logic - framework-agnostic catalog, ledger, session, and flow operations
pub mod core;
/// Plain data model: products, variants, and orders
pub mod entities;
/// Unified error types and result handling
pub mod errors;
/// JSON-file durable storage with load-time migration
pub mod store;

#[cfg(test)]
pub mod test_utils;

//! Shared test utilities for `OrderDesk`.
//!
//! Helpers for building in-memory stores with a seeded catalog and for
//! producing order drafts with sensible defaults.

#![allow(clippy::unwrap_used)]

use crate::{
    core::ledger::OrderDraft,
    entities::PaymentMethod,
    store::Store,
};

/// The buyer used by most flow tests.
pub const USER: i64 = 1_000_001;

/// An in-memory store seeded with one product and a compact variant spec
/// (e.g. `"2FA+2.0/USA-IP+3.0"`). The product gets id 1.
pub fn store_with_product(name: &str, variant_spec: &str) -> Store {
    let mut store = Store::in_memory();
    let id = store.catalog.add_product(name).unwrap().id;
    store.catalog.add_variants(id, variant_spec).unwrap();
    store
}

/// An order draft with the given user, quantity, and unit price.
///
/// # Defaults
/// * `product_id`: 1, named "Test Product"
/// * `selected_variants`: empty
/// * `payment_method`: BTC
#[must_use]
pub fn draft_for(user: i64, qty: u32, unit_price: f64) -> OrderDraft {
    OrderDraft {
        user,
        product_id: 1,
        product_name: "Test Product".to_string(),
        selected_variants: Vec::new(),
        qty,
        unit_price,
        payment_method: PaymentMethod::Btc,
    }
}

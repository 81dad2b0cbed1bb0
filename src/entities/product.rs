//! Product entity - A catalog item with purchasable variants.
//!
//! Variants carry the prices; a product with no enabled variant sells through
//! a zero-price, variant-less path. Variant ids are stable per product and
//! never reused, so an in-flight session survives concurrent catalog edits
//! without the index-shift hazard of positional addressing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A purchasable option/add-on of a [`Product`] with its own price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Stable identifier, unique within the owning product, never reused
    pub id: u32,
    /// Display name (not required to be unique)
    pub name: String,
    /// Disabled variants are hidden from the purchase flow but retained
    /// for history/audit
    pub enabled: bool,
    /// Non-negative unit price
    pub price: f64,
}

/// A catalog product with an insertion-ordered variant list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier, stable once assigned, never reused after deletion
    pub id: u64,
    /// Display name
    pub name: String,
    /// Variants in insertion order (order affects display only)
    #[serde(default)]
    pub variants: Vec<Variant>,
    /// Next variant id to hand out; persisted so ids survive deletions
    #[serde(default)]
    pub next_variant_id: u32,
}

impl Product {
    /// Creates an empty product with the given id and name.
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            variants: Vec::new(),
            next_variant_id: 1,
        }
    }

    /// Looks up a variant by its stable id.
    #[must_use]
    pub fn variant(&self, id: u32) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }

    /// Variants currently offered in the purchase flow, in insertion order.
    pub fn enabled_variants(&self) -> impl Iterator<Item = &Variant> {
        self.variants.iter().filter(|v| v.enabled)
    }

    /// Whether any variant is currently purchasable.
    #[must_use]
    pub fn has_enabled_variants(&self) -> bool {
        self.enabled_variants().next().is_some()
    }

    /// Effective unit price of a selection: the *maximum* of the selected
    /// enabled variants' live prices, not their sum (upgrade-tier rule), and
    /// 0 for the empty selection. Selected ids that no longer resolve to an
    /// enabled variant are ignored.
    #[must_use]
    pub fn unit_price_for(&self, selected: &BTreeSet<u32>) -> f64 {
        selected
            .iter()
            .filter_map(|id| self.variant(*id))
            .filter(|v| v.enabled)
            .map(|v| v.price)
            .fold(0.0, f64::max)
    }

    /// Names of the selected variants in insertion order, skipping ids that
    /// no longer resolve to an enabled variant. This is the list snapshotted
    /// onto an order at creation time.
    #[must_use]
    pub fn selected_names(&self, selected: &BTreeSet<u32>) -> Vec<String> {
        self.variants
            .iter()
            .filter(|v| v.enabled && selected.contains(&v.id))
            .map(|v| v.name.clone())
            .collect()
    }
}

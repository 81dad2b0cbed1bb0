//! Catalog store - Owns products and variants, funnels every mutation
//! through its operation methods.
//!
//! Product ids are monotonically increasing and never reused: the next id is
//! derived from the highest id ever observed (including ids still referenced
//! by ledger orders), not from the current catalog length, so deleting the
//! newest product cannot recycle its id. Variant ids follow the same rule via
//! a per-product counter.

use crate::{
    entities::{Product, Variant},
    errors::{Error, Result},
};
use tracing::info;

/// Delimiter between entries of a compact variant spec like `Gold+5/Silver+3`.
const VARIANT_SPEC_DELIMITER: char = '/';

/// The in-memory product catalog.
#[derive(Debug)]
pub struct Catalog {
    products: Vec<Product>,
    next_id: u64,
}

impl Default for Catalog {
    /// An empty catalog whose first product gets id 1.
    fn default() -> Self {
        Self::new(Vec::new(), 0)
    }
}

impl Catalog {
    /// Rebuilds the catalog from persisted products.
    ///
    /// `reserved_max_id` is the highest product id referenced elsewhere
    /// (the ledger); ids up to and including it will never be handed out
    /// again even if the products themselves are gone.
    #[must_use]
    pub fn new(products: Vec<Product>, reserved_max_id: u64) -> Self {
        let max_seen = products
            .iter()
            .map(|p| p.id)
            .max()
            .unwrap_or(0)
            .max(reserved_max_id);
        Self {
            products,
            next_id: max_seen + 1,
        }
    }

    /// All products in insertion order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Whether the catalog has nothing to sell.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Result-bearing lookup by id.
    pub fn product(&self, id: u64) -> Result<&Product> {
        self.products
            .iter()
            .find(|p| p.id == id)
            .ok_or(Error::ProductNotFound { id })
    }

    fn product_mut(&mut self, id: u64) -> Result<&mut Product> {
        self.products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(Error::ProductNotFound { id })
    }

    /// Adds a product with an empty variant list and returns it.
    pub fn add_product(&mut self, name: &str) -> Result<&Product> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation {
                message: "Product name cannot be empty.".to_string(),
            });
        }
        let id = self.next_id;
        self.next_id += 1;
        self.products.push(Product::new(id, name));
        info!(product_id = id, name, "product added");
        Ok(&self.products[self.products.len() - 1])
    }

    /// Renames an existing product.
    pub fn rename_product(&mut self, id: u64, new_name: &str) -> Result<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(Error::Validation {
                message: "Product name cannot be empty.".to_string(),
            });
        }
        let product = self.product_mut(id)?;
        product.name = new_name.to_string();
        Ok(())
    }

    /// Deletes a product immediately and unconditionally. Orders referencing
    /// it keep rendering from their own snapshot.
    pub fn delete_product(&mut self, id: u64) -> Result<Product> {
        let pos = self
            .products
            .iter()
            .position(|p| p.id == id)
            .ok_or(Error::ProductNotFound { id })?;
        let removed = self.products.remove(pos);
        info!(product_id = id, name = %removed.name, "product deleted");
        Ok(removed)
    }

    /// Parses a compact variant spec (`"Name+Price"` entries separated by
    /// `/`) and appends the resulting enabled variants to the product.
    ///
    /// The batch is atomic: one malformed price fails the whole spec and
    /// nothing is applied. A missing `+Price` suffix defaults to price 0.
    /// Returns the number of variants added.
    pub fn add_variants(&mut self, product_id: u64, spec: &str) -> Result<usize> {
        let parsed = parse_variant_spec(spec)?;
        let product = self.product_mut(product_id)?;
        let count = parsed.len();
        for (name, price) in parsed {
            let id = product.next_variant_id;
            product.next_variant_id += 1;
            product.variants.push(Variant {
                id,
                name,
                enabled: true,
                price,
            });
        }
        info!(product_id, count, "variants added");
        Ok(count)
    }

    /// Flips a variant between enabled and disabled; disabled variants are
    /// hidden from the purchase flow but kept for history. Returns the
    /// variant's new state.
    pub fn toggle_variant(&mut self, product_id: u64, variant_id: u32) -> Result<&Variant> {
        let product = self.product_mut(product_id)?;
        let variant = product
            .variants
            .iter_mut()
            .find(|v| v.id == variant_id)
            .ok_or(Error::VariantNotFound {
                product_id,
                variant_id,
            })?;
        variant.enabled = !variant.enabled;
        Ok(variant)
    }

    /// Hard-deletes a variant. Sessions still selecting it simply drop it at
    /// resolution time; its id is never handed out again.
    pub fn remove_variant(&mut self, product_id: u64, variant_id: u32) -> Result<Variant> {
        let product = self.product_mut(product_id)?;
        let pos = product
            .variants
            .iter()
            .position(|v| v.id == variant_id)
            .ok_or(Error::VariantNotFound {
                product_id,
                variant_id,
            })?;
        Ok(product.variants.remove(pos))
    }
}

/// Parses `"Name+Price"` entries separated by `/` into `(name, price)` pairs.
///
/// Splits each entry on its *last* `+` so names may contain the character.
/// An entry without a `+` prices at 0; an entry whose price part is present
/// but not a non-negative finite number fails the whole batch.
fn parse_variant_spec(spec: &str) -> Result<Vec<(String, f64)>> {
    let mut parsed = Vec::new();
    for entry in spec.split(VARIANT_SPEC_DELIMITER) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (name, price) = match entry.rsplit_once('+') {
            None => (entry, 0.0),
            Some((name, price_str)) => {
                let price: f64 = price_str.trim().parse().map_err(|_| Error::Validation {
                    message: format!("Invalid price '{price_str}' in variant spec '{entry}'."),
                })?;
                if !price.is_finite() || price < 0.0 {
                    return Err(Error::Validation {
                        message: format!("Invalid price '{price_str}' in variant spec '{entry}'."),
                    });
                }
                (name.trim(), price)
            }
        };
        if name.is_empty() {
            return Err(Error::Validation {
                message: format!("Missing variant name in spec entry '{entry}'."),
            });
        }
        parsed.push((name.to_string(), price));
    }
    if parsed.is_empty() {
        return Err(Error::Validation {
            message: "Variant spec is empty. Use e.g. Gold+5/Silver+3".to_string(),
        });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn product_ids_are_monotonic_and_never_reused() {
        let mut catalog = Catalog::new(Vec::new(), 0);
        let first = catalog.add_product("First").unwrap().id;
        let second = catalog.add_product("Second").unwrap().id;
        assert_eq!((first, second), (1, 2));

        catalog.delete_product(second).unwrap();
        let third = catalog.add_product("Third").unwrap().id;
        assert_eq!(third, 3);
    }

    #[test]
    fn default_catalog_starts_ids_at_one() {
        let mut catalog = Catalog::default();
        assert_eq!(catalog.add_product("First").unwrap().id, 1);
    }

    #[test]
    fn reserved_ids_from_the_ledger_are_not_recycled() {
        // Catalog was wiped but order history still references product 7.
        let mut catalog = Catalog::new(Vec::new(), 7);
        assert_eq!(catalog.add_product("Fresh").unwrap().id, 8);
    }

    #[test]
    fn add_variants_parses_names_and_prices() {
        let mut catalog = Catalog::new(Vec::new(), 0);
        let id = catalog.add_product("Aged-IG").unwrap().id;
        let added = catalog.add_variants(id, "2FA+2/USA-IP+3.0/Plain").unwrap();
        assert_eq!(added, 3);

        let product = catalog.product(id).unwrap();
        let prices: Vec<f64> = product.variants.iter().map(|v| v.price).collect();
        assert_eq!(prices, vec![2.0, 3.0, 0.0]);
        assert!(product.variants.iter().all(|v| v.enabled));
        let ids: Vec<u32> = product.variants.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn malformed_price_fails_the_whole_batch() {
        let mut catalog = Catalog::new(Vec::new(), 0);
        let id = catalog.add_product("Aged-IG").unwrap().id;
        let result = catalog.add_variants(id, "Gold+5/Silver+bad");
        assert!(matches!(result, Err(Error::Validation { .. })));
        // Neither Gold nor Silver was applied.
        assert!(catalog.product(id).unwrap().variants.is_empty());
    }

    #[test]
    fn negative_price_fails_the_whole_batch() {
        let mut catalog = Catalog::new(Vec::new(), 0);
        let id = catalog.add_product("Aged-IG").unwrap().id;
        assert!(catalog.add_variants(id, "Gold+-5").is_err());
        assert!(catalog.product(id).unwrap().variants.is_empty());
    }

    #[test]
    fn toggle_hides_variant_from_purchase_but_keeps_it() {
        let mut catalog = Catalog::new(Vec::new(), 0);
        let id = catalog.add_product("Aged-IG").unwrap().id;
        catalog.add_variants(id, "Gold+5").unwrap();

        let variant = catalog.toggle_variant(id, 1).unwrap();
        assert!(!variant.enabled);
        let product = catalog.product(id).unwrap();
        assert!(!product.has_enabled_variants());
        assert_eq!(product.variants.len(), 1);

        assert!(catalog.toggle_variant(id, 1).unwrap().enabled);
    }

    #[test]
    fn removing_a_variant_does_not_shift_surviving_ids() {
        let mut catalog = Catalog::new(Vec::new(), 0);
        let id = catalog.add_product("Aged-IG").unwrap().id;
        catalog.add_variants(id, "A+1/B+2/C+3").unwrap();

        catalog.remove_variant(id, 2).unwrap();
        let product = catalog.product(id).unwrap();
        let ids: Vec<u32> = product.variants.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1, 3]);

        // New variants keep counting from the persisted counter.
        catalog.add_variants(id, "D+4").unwrap();
        assert_eq!(catalog.product(id).unwrap().variants.last().unwrap().id, 4);
    }

    #[test]
    fn unknown_ids_surface_as_not_found() {
        let mut catalog = Catalog::new(Vec::new(), 0);
        assert!(matches!(
            catalog.product(5),
            Err(Error::ProductNotFound { id: 5 })
        ));
        assert!(matches!(
            catalog.add_variants(5, "Gold+5"),
            Err(Error::ProductNotFound { id: 5 })
        ));
        let id = catalog.add_product("Aged-IG").unwrap().id;
        assert!(matches!(
            catalog.toggle_variant(id, 9),
            Err(Error::VariantNotFound { variant_id: 9, .. })
        ));
    }

    #[test]
    fn rename_and_delete() {
        let mut catalog = Catalog::new(Vec::new(), 0);
        let id = catalog.add_product("Old").unwrap().id;
        catalog.rename_product(id, "New").unwrap();
        assert_eq!(catalog.product(id).unwrap().name, "New");

        catalog.delete_product(id).unwrap();
        assert!(catalog.is_empty());
        assert!(matches!(
            catalog.delete_product(id),
            Err(Error::ProductNotFound { .. })
        ));
    }

    #[test]
    fn blank_names_are_rejected() {
        let mut catalog = Catalog::new(Vec::new(), 0);
        assert!(matches!(
            catalog.add_product("   "),
            Err(Error::Validation { .. })
        ));
        let id = catalog.add_product("Aged-IG").unwrap().id;
        assert!(catalog.rename_product(id, "").is_err());
        assert!(catalog.add_variants(id, "+5").is_err());
    }
}

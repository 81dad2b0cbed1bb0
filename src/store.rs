//! Durable storage - Three JSON files (users, products, orders) under one
//! data directory.
//!
//! Startup loads each file or initializes it with an empty collection; every
//! mutation batch is followed by a full rewrite of all three files. There is
//! no batching, journaling, or atomic replace: the durability posture is
//! deliberately process-local and best-effort.
//!
//! Older data files are upgraded once at load time:
//! - a variant stored as a plain name becomes `{id, name, enabled: true,
//!   price: 0.0}`;
//! - a variant object without an `id` gets one assigned;
//! - a legacy top-level product `price` is dropped in favor of per-variant
//!   pricing;
//! - a naive order `created` timestamp (no offset) is normalized to RFC 3339.
//!
//! If any record changed, the files are rewritten immediately so the upgrade
//! runs exactly once.

use crate::{
    core::{catalog::Catalog, ledger::Ledger},
    entities::{Order, Product},
    errors::Result,
};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::{Value, json};
use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

const USERS_FILE: &str = "users.json";
const PRODUCTS_FILE: &str = "products.json";
const ORDERS_FILE: &str = "orders.json";

/// The process-wide shared state: user registry, catalog, and ledger, with
/// the directory they persist to. All mutation goes through the owned
/// [`Catalog`] and [`Ledger`]; callers invoke [`Store::save`] after a
/// mutation batch.
#[derive(Debug)]
pub struct Store {
    /// Every user who ever sent /start; the broadcast audience
    pub users: BTreeSet<i64>,
    /// The product catalog
    pub catalog: Catalog,
    /// The order ledger
    pub ledger: Ledger,
    data_dir: Option<PathBuf>,
}

impl Store {
    /// Loads (or initializes) the three collections from `data_dir`,
    /// applying the one-time legacy migration.
    pub fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;

        let users_value = load_or_init(&data_dir.join(USERS_FILE))?;
        let mut products_value = load_or_init(&data_dir.join(PRODUCTS_FILE))?;
        let mut orders_value = load_or_init(&data_dir.join(ORDERS_FILE))?;

        let migrated =
            migrate_products(&mut products_value) | migrate_orders(&mut orders_value);

        let users: BTreeSet<i64> = serde_json::from_value(users_value)?;
        let products: Vec<Product> = serde_json::from_value(products_value)?;
        let orders: Vec<Order> = serde_json::from_value(orders_value)?;

        let ledger = Ledger::new(orders);
        let catalog = Catalog::new(products, ledger.max_product_id());
        let store = Self {
            users,
            catalog,
            ledger,
            data_dir: Some(data_dir.to_path_buf()),
        };

        if migrated {
            info!("legacy records upgraded, rewriting data files");
            store.save()?;
        }
        info!(
            users = store.users.len(),
            products = store.catalog.products().len(),
            orders = store.ledger.orders().len(),
            "store loaded"
        );
        Ok(store)
    }

    /// An empty store with no backing files; [`Store::save`] is a no-op.
    /// Used by tests and useful for dry runs.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            users: BTreeSet::new(),
            catalog: Catalog::default(),
            ledger: Ledger::default(),
            data_dir: None,
        }
    }

    /// Registers a user for the broadcast audience. Returns true if the
    /// user was new.
    pub fn register_user(&mut self, user: i64) -> bool {
        self.users.insert(user)
    }

    /// Full-rewrite save of all three collections.
    pub fn save(&self) -> Result<()> {
        let Some(dir) = &self.data_dir else {
            return Ok(());
        };
        write_json(&dir.join(USERS_FILE), &self.users)?;
        write_json(&dir.join(PRODUCTS_FILE), self.catalog.products())?;
        write_json(&dir.join(ORDERS_FILE), self.ledger.orders())?;
        Ok(())
    }
}

/// Reads a JSON array file, creating it with an empty array first if it
/// doesn't exist yet.
fn load_or_init(path: &Path) -> Result<Value> {
    if !path.exists() {
        fs::write(path, "[]")?;
    }
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, data: &T) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(data)?)?;
    Ok(())
}

/// Upgrades legacy product records in place. Returns whether anything
/// changed.
fn migrate_products(products: &mut Value) -> bool {
    let Some(products) = products.as_array_mut() else {
        return false;
    };
    let mut changed = false;
    for product in products {
        let Some(obj) = product.as_object_mut() else {
            continue;
        };
        // Per-variant pricing replaced the legacy top-level price.
        if obj.remove("price").is_some() {
            changed = true;
        }
        if !obj.contains_key("variants") {
            obj.insert("variants".to_string(), json!([]));
            changed = true;
        }

        let mut max_id: u64 = 0;
        let mut missing_ids = Vec::new();
        if let Some(variants) = obj.get_mut("variants").and_then(Value::as_array_mut) {
            for (idx, variant) in variants.iter_mut().enumerate() {
                if let Some(name) = variant.as_str() {
                    *variant = json!({ "name": name, "enabled": true, "price": 0.0 });
                    changed = true;
                }
                match variant.get("id").and_then(Value::as_u64) {
                    Some(id) => max_id = max_id.max(id),
                    None => missing_ids.push(idx),
                }
            }
            for idx in missing_ids {
                max_id += 1;
                if let Some(variant) = variants.get_mut(idx).and_then(Value::as_object_mut) {
                    variant.insert("id".to_string(), json!(max_id));
                    changed = true;
                }
            }
        }

        let next_id = obj
            .get("next_variant_id")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if next_id <= max_id {
            obj.insert("next_variant_id".to_string(), json!(max_id + 1));
            changed = true;
        }
    }
    changed
}

/// Detects legacy order records so the canonical form gets written back.
/// (Serde itself accepts the legacy status via an alias.)
fn migrate_orders(orders: &mut Value) -> bool {
    let Some(orders) = orders.as_array_mut() else {
        return false;
    };
    let mut changed = false;
    for order in orders {
        let Some(obj) = order.as_object_mut() else {
            continue;
        };
        if obj.get("status").and_then(Value::as_str) == Some("payment_submitted") {
            obj.insert("status".to_string(), json!("pending_confirmation"));
            changed = true;
        }
        // Legacy writers stored `created` as a naive local timestamp like
        // "2025-11-19 18:56:06.123456"; treat it as UTC and write it back in
        // the RFC 3339 form the order record expects.
        if let Some(created) = legacy_created_to_rfc3339(obj.get("created")) {
            obj.insert("created".to_string(), json!(created));
            changed = true;
        }
    }
    changed
}

fn legacy_created_to_rfc3339(created: Option<&Value>) -> Option<String> {
    let raw = created?.as_str()?;
    if DateTime::parse_from_rfc3339(raw).is_ok() {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").ok()?;
    Some(Utc.from_utc_datetime(&naive).to_rfc3339())
}

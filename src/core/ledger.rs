//! Order ledger - Append-only order records with status transitions.
//!
//! Orders are never deleted; ids are `count(orders) + 1` at creation and the
//! collection only grows, so ids stay stable and unique. Everything priced
//! is snapshotted at creation time: later catalog edits cannot change what a
//! buyer agreed to pay.

use crate::{
    entities::{Order, OrderStatus, PaymentMethod},
    errors::{Error, Result},
};
use chrono::Utc;
use tracing::{info, warn};

/// Everything the flow engine resolved from the live catalog at the moment
/// the buyer picked a payment method. Becomes the immutable part of an
/// [`Order`].
#[derive(Clone, Debug)]
pub struct OrderDraft {
    /// Buying user
    pub user: i64,
    /// Catalog product id
    pub product_id: u64,
    /// Product name at creation time
    pub product_name: String,
    /// Selected variant names at creation time
    pub selected_variants: Vec<String>,
    /// Positive quantity
    pub qty: u32,
    /// Unit price (max of selected variant prices, or 0)
    pub unit_price: f64,
    /// Chosen payment method
    pub payment_method: PaymentMethod,
}

/// The append-only order collection.
#[derive(Debug, Default)]
pub struct Ledger {
    orders: Vec<Order>,
}

impl Ledger {
    /// Rebuilds the ledger from persisted orders.
    #[must_use]
    pub fn new(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    /// All orders in creation order.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Highest product id any order references; used so the catalog never
    /// recycles an id that order history still points at.
    #[must_use]
    pub fn max_product_id(&self) -> u64 {
        self.orders.iter().map(|o| o.product_id).max().unwrap_or(0)
    }

    /// Materializes a draft into a ledger entry with status
    /// `awaiting_screenshot` and returns it.
    pub fn create_order(&mut self, draft: OrderDraft) -> &Order {
        let id = self.orders.len() as u64 + 1;
        let amount = draft.unit_price * f64::from(draft.qty);
        self.orders.push(Order {
            id,
            user: draft.user,
            product_id: draft.product_id,
            product_name: draft.product_name,
            selected_variants: draft.selected_variants,
            qty: draft.qty,
            unit_price: draft.unit_price,
            amount,
            payment_method: draft.payment_method,
            screenshot_file_id: None,
            status: OrderStatus::AwaitingScreenshot,
            created: Utc::now(),
            confirmed_at: None,
            channel_message_id: None,
        });
        let order = &self.orders[self.orders.len() - 1];
        info!(order_id = order.id, user = order.user, amount = order.amount, "order created");
        order
    }

    /// Attaches a payment screenshot to the user's most recently created
    /// order still in `awaiting_screenshot` and moves it to
    /// `pending_confirmation`.
    ///
    /// Fails with [`Error::NoPendingOrder`] (ledger untouched) when the user
    /// has no such order. When the user has several, only the newest is
    /// targeted; older ones are skipped with a warning (decided behavior,
    /// see DESIGN.md).
    pub fn attach_screenshot(&mut self, user: i64, file_id: &str) -> Result<&Order> {
        let mut pending: Vec<usize> = self
            .orders
            .iter()
            .enumerate()
            .filter(|(_, o)| o.user == user && o.status == OrderStatus::AwaitingScreenshot)
            .map(|(i, _)| i)
            .collect();
        let target = pending.pop().ok_or(Error::NoPendingOrder { user })?;
        if !pending.is_empty() {
            warn!(
                user,
                skipped = pending.len(),
                "user has older orders still awaiting a screenshot"
            );
        }
        let order = &mut self.orders[target];
        order.screenshot_file_id = Some(file_id.to_string());
        order.status = OrderStatus::PendingConfirmation;
        info!(order_id = order.id, user, "screenshot attached, order pending confirmation");
        Ok(&self.orders[target])
    }

    /// All orders of one user, in creation order.
    pub fn orders_for_user(&self, user: i64) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(move |o| o.user == user)
    }

    /// Result-bearing lookup by order id.
    pub fn order_by_id(&self, id: u64) -> Result<&Order> {
        self.orders
            .iter()
            .find(|o| o.id == id)
            .ok_or(Error::OrderNotFound { id })
    }

    pub(crate) fn order_by_id_mut(&mut self, id: u64) -> Result<&mut Order> {
        self.orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(Error::OrderNotFound { id })
    }

    /// Remembers the admin-facing notification message for an order so it
    /// can be edited in place once the order is processed.
    pub fn set_channel_message(&mut self, id: u64, message_id: i32) -> Result<()> {
        self.order_by_id_mut(id)?.channel_message_id = Some(message_id);
        Ok(())
    }
}

//! Admin review workflow - The confirm/reject gate on submitted orders.
//!
//! Only orders in `pending_confirmation` can be processed; anything else
//! fails with [`Error::AlreadyProcessed`] and mutates nothing, which makes
//! duplicate admin actions (double taps, replayed commands) harmless. The
//! caller notifies the buyer and edits the admin notification afterwards.

use crate::{
    core::ledger::Ledger,
    entities::{Order, OrderStatus},
    errors::{Error, Result},
};
use chrono::Utc;
use tracing::info;

/// The admin's verdict on a submitted order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Payment evidence accepted
    Confirm,
    /// Payment evidence rejected
    Reject,
}

/// Applies a verdict to an order and returns the updated record.
pub fn process_order(ledger: &mut Ledger, id: u64, verdict: Verdict) -> Result<Order> {
    let order = ledger.order_by_id_mut(id)?;
    if order.status != OrderStatus::PendingConfirmation {
        return Err(Error::AlreadyProcessed {
            id,
            status: order.status,
        });
    }
    match verdict {
        Verdict::Confirm => {
            order.status = OrderStatus::Confirmed;
            order.confirmed_at = Some(Utc::now());
        }
        Verdict::Reject => order.status = OrderStatus::Rejected,
    }
    info!(order_id = id, status = %order.status, "order processed");
    Ok(order.clone())
}

/// Confirms a pending order.
pub fn confirm_order(ledger: &mut Ledger, id: u64) -> Result<Order> {
    process_order(ledger, id, Verdict::Confirm)
}

/// Rejects a pending order.
pub fn reject_order(ledger: &mut Ledger, id: u64) -> Result<Order> {
    process_order(ledger, id, Verdict::Reject)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::draft_for;

    fn ledger_with_pending_order() -> Ledger {
        let mut ledger = Ledger::default();
        ledger.create_order(draft_for(10, 2, 5.0));
        ledger.attach_screenshot(10, "file-1").unwrap();
        ledger
    }

    #[test]
    fn confirm_sets_status_and_timestamp() {
        let mut ledger = ledger_with_pending_order();
        let order = confirm_order(&mut ledger, 1).unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert!(order.confirmed_at.is_some());
    }

    #[test]
    fn double_confirm_fails_and_status_stays_confirmed() {
        let mut ledger = ledger_with_pending_order();
        confirm_order(&mut ledger, 1).unwrap();

        let second = confirm_order(&mut ledger, 1);
        assert!(matches!(
            second,
            Err(Error::AlreadyProcessed {
                id: 1,
                status: OrderStatus::Confirmed
            })
        ));
        assert_eq!(
            ledger.order_by_id(1).unwrap().status,
            OrderStatus::Confirmed
        );
    }

    #[test]
    fn reject_after_confirm_fails() {
        let mut ledger = ledger_with_pending_order();
        confirm_order(&mut ledger, 1).unwrap();
        assert!(matches!(
            reject_order(&mut ledger, 1),
            Err(Error::AlreadyProcessed { .. })
        ));
    }

    #[test]
    fn reject_sets_status_without_timestamp() {
        let mut ledger = ledger_with_pending_order();
        let order = reject_order(&mut ledger, 1).unwrap();
        assert_eq!(order.status, OrderStatus::Rejected);
        assert!(order.confirmed_at.is_none());
    }

    #[test]
    fn orders_still_awaiting_a_screenshot_cannot_be_processed() {
        let mut ledger = Ledger::default();
        ledger.create_order(draft_for(10, 1, 1.0));
        assert!(matches!(
            confirm_order(&mut ledger, 1),
            Err(Error::AlreadyProcessed {
                id: 1,
                status: OrderStatus::AwaitingScreenshot
            })
        ));
    }

    #[test]
    fn unknown_order_is_not_found_and_nothing_mutates() {
        let mut ledger = ledger_with_pending_order();
        assert!(matches!(
            confirm_order(&mut ledger, 7),
            Err(Error::OrderNotFound { id: 7 })
        ));
        assert_eq!(
            ledger.order_by_id(1).unwrap().status,
            OrderStatus::PendingConfirmation
        );
    }
}

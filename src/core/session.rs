//! Session state - Per-user ephemeral progress through the order flow.
//!
//! Each step is its own enum variant carrying exactly the fields valid at
//! that step, so an impossible combination (a quantity without a product,
//! say) cannot be represented. Variants are referenced by stable id, never
//! by position, and prices are *not* stored here: they are resolved live
//! from the catalog at render time and only snapshotted once the order is
//! created.

use std::collections::{BTreeSet, HashMap};

/// Where one user currently stands in the order flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Product list shown, waiting for a pick
    SelectingProduct,
    /// Variant menu shown, toggling a selection
    SelectingVariants {
        /// Product being configured
        product_id: u64,
        /// Stable ids of the variants toggled on so far
        selected: BTreeSet<u32>,
    },
    /// Waiting for a quantity message
    EnteringQuantity {
        /// Product being ordered
        product_id: u64,
        /// Final variant selection
        selected: BTreeSet<u32>,
    },
    /// Payment keyboard shown
    SelectingPayment {
        /// Product being ordered
        product_id: u64,
        /// Final variant selection
        selected: BTreeSet<u32>,
        /// Validated positive quantity
        qty: u32,
    },
    /// Order created; waiting for the payment screenshot
    AwaitingScreenshot,
}

/// All live sessions, keyed by user id. Sessions never interact with each
/// other.
#[derive(Debug, Default)]
pub struct Sessions {
    map: HashMap<i64, SessionState>,
}

impl Sessions {
    /// The user's current state, if a flow is in progress.
    #[must_use]
    pub fn get(&self, user: i64) -> Option<&SessionState> {
        self.map.get(&user)
    }

    /// Replaces the user's state.
    pub fn set(&mut self, user: i64, state: SessionState) {
        self.map.insert(user, state);
    }

    /// Clears the user's state unconditionally (flow completion,
    /// cancellation, or return-to-menu).
    pub fn clear(&mut self, user: i64) {
        self.map.remove(&user);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_are_isolated_per_user() {
        let mut sessions = Sessions::default();
        sessions.set(1, SessionState::SelectingProduct);
        sessions.set(2, SessionState::AwaitingScreenshot);

        assert_eq!(sessions.get(1), Some(&SessionState::SelectingProduct));
        sessions.clear(1);
        assert_eq!(sessions.get(1), None);
        assert_eq!(sessions.get(2), Some(&SessionState::AwaitingScreenshot));
    }

    #[test]
    fn clearing_an_absent_session_is_a_no_op() {
        let mut sessions = Sessions::default();
        sessions.clear(42);
        assert_eq!(sessions.get(42), None);
    }
}

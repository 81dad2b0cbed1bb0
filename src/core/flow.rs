//! Order flow engine - The state machine driving the purchase conversation.
//!
//! [`advance`] is a pure function from (state, event, catalog) to a
//! transition, so every edge of the state graph is directly testable without
//! a bot or storage in sight. [`handle_event`] is the thin engine around it:
//! it applies the transition to the sessions map, materializes `CreateOrder`
//! directives against the ledger, and hands the bot layer a typed reply to
//! render.
//!
//! Prices and variant availability are resolved live from the catalog at
//! every step; nothing snapshots until the order is actually created.

use crate::{
    core::{
        catalog::Catalog,
        ledger::OrderDraft,
        session::{SessionState, Sessions},
    },
    entities::{Order, PaymentMethod},
    errors::{Error, Result},
    store::Store,
};
use std::collections::BTreeSet;
use tracing::debug;

/// A user action driving the flow.
#[derive(Clone, Debug)]
pub enum FlowEvent {
    /// "Browse Products" pressed
    Browse,
    /// A product picked from the list
    ChooseProduct(u64),
    /// A variant toggled on the variant menu
    ToggleVariant(u32),
    /// "Done" pressed on the variant menu
    VariantsDone,
    /// Free-text quantity entry
    Quantity(String),
    /// A payment method picked
    ChoosePayment(PaymentMethod),
    /// "Back to Main Menu" pressed; aborts from any step
    Cancel,
}

/// What the transition asks the outside world to do next.
#[derive(Clone, Debug)]
pub enum FlowEffect {
    /// Render the product list (or the empty-catalog notice)
    ShowProducts,
    /// Render the variant toggle menu with live prices
    ShowVariantMenu {
        /// Product being configured
        product_id: u64,
        /// Current selection
        selected: BTreeSet<u32>,
    },
    /// Ask for a quantity
    AskQuantity {
        /// Live unit price of the current selection
        unit_price: f64,
    },
    /// Show the payment keyboard
    AskPayment {
        /// Live total for the entered quantity
        total_amount: f64,
    },
    /// Append an order to the ledger (terminal pricing snapshot)
    CreateOrder(OrderDraft),
    /// Render the main menu
    ShowMainMenu,
}

/// Result of one pure transition: the next session state (None clears the
/// session) and the effect to apply.
#[derive(Clone, Debug)]
pub struct Transition {
    /// Next session state; `None` clears the session
    pub next: Option<SessionState>,
    /// Side effect for the engine/bot layer
    pub effect: FlowEffect,
}

fn stale_action() -> Error {
    Error::Validation {
        message: "That action isn't available right now. Use the menu to start over.".to_string(),
    }
}

/// The pure state machine. Errors mean "no state change": validation errors
/// are re-prompts, lookup errors mean the catalog moved underneath the
/// session.
pub fn advance(
    state: Option<&SessionState>,
    event: &FlowEvent,
    catalog: &Catalog,
    user: i64,
) -> Result<Transition> {
    match (state, event) {
        // Return-to-menu aborts from any step. An order already created on
        // the way into AwaitingScreenshot stays in the ledger.
        (_, FlowEvent::Cancel) => Ok(Transition {
            next: None,
            effect: FlowEffect::ShowMainMenu,
        }),

        // Browsing (re)starts the flow from any step.
        (_, FlowEvent::Browse) => Ok(Transition {
            next: if catalog.is_empty() {
                None
            } else {
                Some(SessionState::SelectingProduct)
            },
            effect: FlowEffect::ShowProducts,
        }),

        (Some(SessionState::SelectingProduct), FlowEvent::ChooseProduct(product_id)) => {
            let product = catalog.product(*product_id)?;
            if product.has_enabled_variants() {
                Ok(Transition {
                    next: Some(SessionState::SelectingVariants {
                        product_id: product.id,
                        selected: BTreeSet::new(),
                    }),
                    effect: FlowEffect::ShowVariantMenu {
                        product_id: product.id,
                        selected: BTreeSet::new(),
                    },
                })
            } else {
                // Zero-price, variant-less purchase path.
                Ok(Transition {
                    next: Some(SessionState::EnteringQuantity {
                        product_id: product.id,
                        selected: BTreeSet::new(),
                    }),
                    effect: FlowEffect::AskQuantity { unit_price: 0.0 },
                })
            }
        }

        (
            Some(SessionState::SelectingVariants {
                product_id,
                selected,
            }),
            FlowEvent::ToggleVariant(variant_id),
        ) => {
            let product = catalog.product(*product_id)?;
            let variant = product
                .variant(*variant_id)
                .filter(|v| v.enabled)
                .ok_or(Error::VariantNotFound {
                    product_id: *product_id,
                    variant_id: *variant_id,
                })?;
            debug!(user, product_id, variant_id = variant.id, "variant toggled");
            let mut selected = selected.clone();
            if !selected.remove(variant_id) {
                selected.insert(*variant_id);
            }
            Ok(Transition {
                next: Some(SessionState::SelectingVariants {
                    product_id: *product_id,
                    selected: selected.clone(),
                }),
                effect: FlowEffect::ShowVariantMenu {
                    product_id: *product_id,
                    selected,
                },
            })
        }

        (
            Some(SessionState::SelectingVariants {
                product_id,
                selected,
            }),
            FlowEvent::VariantsDone,
        ) => {
            let product = catalog.product(*product_id)?;
            Ok(Transition {
                next: Some(SessionState::EnteringQuantity {
                    product_id: *product_id,
                    selected: selected.clone(),
                }),
                effect: FlowEffect::AskQuantity {
                    unit_price: product.unit_price_for(selected),
                },
            })
        }

        (
            Some(SessionState::EnteringQuantity {
                product_id,
                selected,
            }),
            FlowEvent::Quantity(text),
        ) => {
            let qty = parse_quantity(text)?;
            let product = catalog.product(*product_id)?;
            let unit_price = product.unit_price_for(selected);
            Ok(Transition {
                next: Some(SessionState::SelectingPayment {
                    product_id: *product_id,
                    selected: selected.clone(),
                    qty,
                }),
                effect: FlowEffect::AskPayment {
                    total_amount: unit_price * f64::from(qty),
                },
            })
        }

        (
            Some(SessionState::SelectingPayment {
                product_id,
                selected,
                qty,
            }),
            FlowEvent::ChoosePayment(method),
        ) => {
            // The one and only snapshot point: resolve live names and prices
            // into an immutable draft.
            let product = catalog.product(*product_id)?;
            Ok(Transition {
                next: Some(SessionState::AwaitingScreenshot),
                effect: FlowEffect::CreateOrder(OrderDraft {
                    user,
                    product_id: product.id,
                    product_name: product.name.clone(),
                    selected_variants: product.selected_names(selected),
                    qty: *qty,
                    unit_price: product.unit_price_for(selected),
                    payment_method: *method,
                }),
            })
        }

        // Anything else is a stale keyboard press or an out-of-order message.
        _ => Err(stale_action()),
    }
}

/// Quantity must be a whole positive number; anything else re-prompts
/// without a state change.
fn parse_quantity(text: &str) -> Result<u32> {
    match text.trim().parse::<u32>() {
        Ok(qty) if qty > 0 => Ok(qty),
        _ => Err(Error::Validation {
            message: "Invalid quantity. Please enter a valid number (e.g., 1, 2, 5).".to_string(),
        }),
    }
}

/// Typed outcome for the bot layer to render.
#[derive(Clone, Debug)]
pub enum FlowReply {
    /// Render the product list
    Products,
    /// Render the variant menu with live prices and checkmarks
    VariantMenu {
        /// Product being configured
        product_id: u64,
        /// Current selection
        selected: BTreeSet<u32>,
        /// Live unit price of the selection
        unit_price: f64,
    },
    /// Ask for a quantity
    QuantityPrompt {
        /// Live unit price of the selection
        unit_price: f64,
    },
    /// Show the payment keyboard
    PaymentPrompt {
        /// Live total amount
        total_amount: f64,
    },
    /// The order was appended to the ledger; render its summary
    OrderCreated(Order),
    /// Render the main menu
    MainMenu,
}

/// Applies one user event: runs the pure transition, updates the sessions
/// map, and materializes order creation against the store's ledger.
///
/// On error nothing changes, with one exception: when the catalog no longer
/// has the session's product the session is cleared, since no sequence of
/// inputs can complete it anymore.
pub fn handle_event(
    store: &mut Store,
    sessions: &mut Sessions,
    user: i64,
    event: &FlowEvent,
) -> Result<FlowReply> {
    let transition = match advance(sessions.get(user), event, &store.catalog, user) {
        Ok(t) => t,
        Err(e @ Error::ProductNotFound { .. }) => {
            sessions.clear(user);
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    match transition.next {
        Some(next) => sessions.set(user, next),
        None => sessions.clear(user),
    }

    Ok(match transition.effect {
        FlowEffect::ShowProducts => FlowReply::Products,
        FlowEffect::ShowVariantMenu {
            product_id,
            selected,
        } => {
            let unit_price = store.catalog.product(product_id)?.unit_price_for(&selected);
            FlowReply::VariantMenu {
                product_id,
                selected,
                unit_price,
            }
        }
        FlowEffect::AskQuantity { unit_price } => FlowReply::QuantityPrompt { unit_price },
        FlowEffect::AskPayment { total_amount } => FlowReply::PaymentPrompt { total_amount },
        FlowEffect::CreateOrder(draft) => {
            let order = store.ledger.create_order(draft).clone();
            FlowReply::OrderCreated(order)
        }
        FlowEffect::ShowMainMenu => FlowReply::MainMenu,
    })
}

/// Routes an inbound payment screenshot: binds it to the user's newest
/// pending order and ends the session. The ledger decides whether a pending
/// order exists at all; the session only tracks that we asked for a photo.
pub fn handle_screenshot(
    store: &mut Store,
    sessions: &mut Sessions,
    user: i64,
    file_id: &str,
) -> Result<Order> {
    let order = store.ledger.attach_screenshot(user, file_id)?.clone();
    sessions.clear(user);
    Ok(order)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{
        entities::OrderStatus,
        test_utils::{store_with_product, USER},
    };

    fn drive(store: &mut Store, sessions: &mut Sessions, events: &[FlowEvent]) -> FlowReply {
        let mut last = None;
        for event in events {
            last = Some(handle_event(store, sessions, USER, event).unwrap());
        }
        last.unwrap()
    }

    #[test]
    fn full_flow_snapshot_scenario() {
        // Product "Aged-IG" with variants 2FA ($2) and USA-IP ($3); the user
        // selects both, orders 4, pays with BTC.
        let mut store = store_with_product("Aged-IG", "2FA+2.0/USA-IP+3.0");
        let mut sessions = Sessions::default();

        let reply = drive(
            &mut store,
            &mut sessions,
            &[
                FlowEvent::Browse,
                FlowEvent::ChooseProduct(1),
                FlowEvent::ToggleVariant(1),
                FlowEvent::ToggleVariant(2),
                FlowEvent::VariantsDone,
                FlowEvent::Quantity("4".to_string()),
                FlowEvent::ChoosePayment(PaymentMethod::Btc),
            ],
        );

        let FlowReply::OrderCreated(order) = reply else {
            panic!("expected an order, got {reply:?}");
        };
        assert_eq!(order.unit_price, 3.0);
        assert_eq!(order.amount, 12.0);
        assert_eq!(order.status, OrderStatus::AwaitingScreenshot);
        assert_eq!(order.selected_variants, vec!["2FA", "USA-IP"]);
        assert_eq!(order.product_name, "Aged-IG");
        assert_eq!(sessions.get(USER), Some(&SessionState::AwaitingScreenshot));
    }

    #[test]
    fn order_amount_is_immune_to_later_catalog_edits() {
        let mut store = store_with_product("Aged-IG", "Gold+5.0");
        let mut sessions = Sessions::default();
        let reply = drive(
            &mut store,
            &mut sessions,
            &[
                FlowEvent::Browse,
                FlowEvent::ChooseProduct(1),
                FlowEvent::ToggleVariant(1),
                FlowEvent::VariantsDone,
                FlowEvent::Quantity("2".to_string()),
                FlowEvent::ChoosePayment(PaymentMethod::Eth),
            ],
        );
        let FlowReply::OrderCreated(order) = reply else {
            panic!("expected an order");
        };

        // Reprice and even delete the product afterwards.
        store.catalog.remove_variant(1, 1).unwrap();
        store.catalog.add_variants(1, "Gold+50").unwrap();
        store.catalog.delete_product(1).unwrap();

        let stored = store.ledger.order_by_id(order.id).unwrap();
        assert_eq!(stored.unit_price, 5.0);
        assert_eq!(stored.amount, 10.0);
        assert_eq!(stored.product_name, "Aged-IG");
    }

    #[test]
    fn product_without_enabled_variants_goes_straight_to_quantity() {
        let mut store = store_with_product("Plain", "Only+4.0");
        store.catalog.toggle_variant(1, 1).unwrap(); // disable the only variant
        let mut sessions = Sessions::default();

        let reply = drive(
            &mut store,
            &mut sessions,
            &[FlowEvent::Browse, FlowEvent::ChooseProduct(1)],
        );
        assert!(matches!(reply, FlowReply::QuantityPrompt { unit_price } if unit_price == 0.0));

        let reply = drive(
            &mut store,
            &mut sessions,
            &[
                FlowEvent::Quantity("3".to_string()),
                FlowEvent::ChoosePayment(PaymentMethod::Sol),
            ],
        );
        let FlowReply::OrderCreated(order) = reply else {
            panic!("expected an order");
        };
        assert_eq!(order.unit_price, 0.0);
        assert_eq!(order.amount, 0.0);
        assert!(order.selected_variants.is_empty());
    }

    #[test]
    fn zero_selected_variants_price_at_zero() {
        let mut store = store_with_product("Aged-IG", "Gold+5.0");
        let mut sessions = Sessions::default();
        let reply = drive(
            &mut store,
            &mut sessions,
            &[
                FlowEvent::Browse,
                FlowEvent::ChooseProduct(1),
                FlowEvent::VariantsDone,
                FlowEvent::Quantity("2".to_string()),
                FlowEvent::ChoosePayment(PaymentMethod::Usdc),
            ],
        );
        let FlowReply::OrderCreated(order) = reply else {
            panic!("expected an order");
        };
        assert_eq!(order.unit_price, 0.0);
        assert!(order.selected_variants.is_empty());
    }

    #[test]
    fn toggling_twice_deselects() {
        let mut store = store_with_product("Aged-IG", "Gold+5.0");
        let mut sessions = Sessions::default();
        let reply = drive(
            &mut store,
            &mut sessions,
            &[
                FlowEvent::Browse,
                FlowEvent::ChooseProduct(1),
                FlowEvent::ToggleVariant(1),
                FlowEvent::ToggleVariant(1),
            ],
        );
        assert!(
            matches!(reply, FlowReply::VariantMenu { ref selected, unit_price, .. }
                if selected.is_empty() && unit_price == 0.0)
        );
    }

    #[test]
    fn invalid_quantity_reprompts_without_state_change() {
        let mut store = store_with_product("Aged-IG", "Gold+5.0");
        let mut sessions = Sessions::default();
        drive(
            &mut store,
            &mut sessions,
            &[
                FlowEvent::Browse,
                FlowEvent::ChooseProduct(1),
                FlowEvent::ToggleVariant(1),
                FlowEvent::VariantsDone,
            ],
        );
        let before = sessions.get(USER).cloned();

        for bad in ["abc", "0", "-3", "1.5", ""] {
            let result = handle_event(
                &mut store,
                &mut sessions,
                USER,
                &FlowEvent::Quantity(bad.to_string()),
            );
            assert!(matches!(result, Err(Error::Validation { .. })), "{bad:?}");
            assert_eq!(sessions.get(USER), before.as_ref());
        }
        assert!(store.ledger.orders().is_empty());
    }

    #[test]
    fn disabling_a_selected_variant_drops_it_from_the_live_price() {
        let mut store = store_with_product("Aged-IG", "Gold+5.0/Silver+2.0");
        let mut sessions = Sessions::default();
        drive(
            &mut store,
            &mut sessions,
            &[
                FlowEvent::Browse,
                FlowEvent::ChooseProduct(1),
                FlowEvent::ToggleVariant(1),
                FlowEvent::ToggleVariant(2),
            ],
        );

        // Admin disables Gold while the buyer is mid-session.
        store.catalog.toggle_variant(1, 1).unwrap();

        let reply = drive(&mut store, &mut sessions, &[FlowEvent::VariantsDone]);
        assert!(matches!(reply, FlowReply::QuantityPrompt { unit_price } if unit_price == 2.0));

        let reply = drive(
            &mut store,
            &mut sessions,
            &[
                FlowEvent::Quantity("1".to_string()),
                FlowEvent::ChoosePayment(PaymentMethod::Btc),
            ],
        );
        let FlowReply::OrderCreated(order) = reply else {
            panic!("expected an order");
        };
        assert_eq!(order.selected_variants, vec!["Silver"]);
        assert_eq!(order.unit_price, 2.0);
    }

    #[test]
    fn cancel_clears_the_session_but_not_a_created_order() {
        let mut store = store_with_product("Aged-IG", "Gold+5.0");
        let mut sessions = Sessions::default();
        drive(
            &mut store,
            &mut sessions,
            &[
                FlowEvent::Browse,
                FlowEvent::ChooseProduct(1),
                FlowEvent::ToggleVariant(1),
                FlowEvent::VariantsDone,
                FlowEvent::Quantity("1".to_string()),
                FlowEvent::ChoosePayment(PaymentMethod::Btc),
            ],
        );
        assert_eq!(store.ledger.orders().len(), 1);

        let reply = drive(&mut store, &mut sessions, &[FlowEvent::Cancel]);
        assert!(matches!(reply, FlowReply::MainMenu));
        assert_eq!(sessions.get(USER), None);
        // The abandoned order stays in the ledger, still awaiting.
        assert_eq!(
            store.ledger.order_by_id(1).unwrap().status,
            OrderStatus::AwaitingScreenshot
        );
    }

    #[test]
    fn stale_actions_are_rejected_without_state_change() {
        let mut store = store_with_product("Aged-IG", "Gold+5.0");
        let mut sessions = Sessions::default();

        // Picking a product with no session at all.
        let result = handle_event(&mut store, &mut sessions, USER, &FlowEvent::ChooseProduct(1));
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert_eq!(sessions.get(USER), None);

        // Paying while still selecting variants.
        drive(
            &mut store,
            &mut sessions,
            &[FlowEvent::Browse, FlowEvent::ChooseProduct(1)],
        );
        let result = handle_event(
            &mut store,
            &mut sessions,
            USER,
            &FlowEvent::ChoosePayment(PaymentMethod::Btc),
        );
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert!(store.ledger.orders().is_empty());
    }

    #[test]
    fn deleted_product_mid_session_clears_the_session() {
        let mut store = store_with_product("Aged-IG", "Gold+5.0");
        let mut sessions = Sessions::default();
        drive(
            &mut store,
            &mut sessions,
            &[FlowEvent::Browse, FlowEvent::ChooseProduct(1)],
        );

        store.catalog.delete_product(1).unwrap();
        let result = handle_event(&mut store, &mut sessions, USER, &FlowEvent::ToggleVariant(1));
        assert!(matches!(result, Err(Error::ProductNotFound { id: 1 })));
        assert_eq!(sessions.get(USER), None);
    }

    #[test]
    fn screenshot_completes_the_flow_and_clears_the_session() {
        let mut store = store_with_product("Aged-IG", "Gold+5.0");
        let mut sessions = Sessions::default();
        drive(
            &mut store,
            &mut sessions,
            &[
                FlowEvent::Browse,
                FlowEvent::ChooseProduct(1),
                FlowEvent::ToggleVariant(1),
                FlowEvent::VariantsDone,
                FlowEvent::Quantity("1".to_string()),
                FlowEvent::ChoosePayment(PaymentMethod::Btc),
            ],
        );

        let order = handle_screenshot(&mut store, &mut sessions, USER, "file-99").unwrap();
        assert_eq!(order.status, OrderStatus::PendingConfirmation);
        assert_eq!(order.screenshot_file_id.as_deref(), Some("file-99"));
        assert_eq!(sessions.get(USER), None);
    }

    #[test]
    fn screenshot_without_pending_order_fails() {
        let mut store = store_with_product("Aged-IG", "Gold+5.0");
        let mut sessions = Sessions::default();
        let result = handle_screenshot(&mut store, &mut sessions, USER, "file-1");
        assert!(matches!(result, Err(Error::NoPendingOrder { .. })));
    }

    #[test]
    fn browsing_an_empty_catalog_leaves_no_session() {
        let mut store = Store::in_memory();
        let mut sessions = Sessions::default();
        let reply = handle_event(&mut store, &mut sessions, USER, &FlowEvent::Browse).unwrap();
        assert!(matches!(reply, FlowReply::Products));
        assert_eq!(sessions.get(USER), None);
    }
}

//! Callback-query and free-text/photo handlers.
//!
//! Callbacks carry the flow forward (menus, product/variant picks, payment
//! choice, admin review buttons); plain messages only matter in two session
//! states: a quantity while entering one, and a photo while an order awaits
//! its screenshot. Everything else is ignored chatter.

use crate::{
    bot::{AppState, recoverable_text, render, user_key},
    core::{
        flow::{self, FlowEvent, FlowReply},
        review::{self, Verdict},
        session::SessionState,
    },
    entities::Order,
    errors::{Error, Result},
    store::Store,
};
use std::sync::Arc;
use teloxide::{
    prelude::*,
    types::{CallbackQuery, ChatId, InlineKeyboardMarkup, InputFile, Message},
};
use tracing::{error, warn};

/// Routes one inline-keyboard press.
pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: Arc<AppState>) -> Result<()> {
    let user = user_key(q.from.id);
    let Some(data) = q.data.clone() else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    if let Some(arg) = data.strip_prefix("confirm:") {
        return handle_review_callback(&bot, &q, &state, user, arg, Verdict::Confirm).await;
    }
    if let Some(arg) = data.strip_prefix("reject:") {
        return handle_review_callback(&bot, &q, &state, user, arg, Verdict::Reject).await;
    }

    match data.as_str() {
        "orders" => {
            let text = {
                let store = state.store.lock().await;
                render::order_history(store.ledger.orders_for_user(user))
            };
            edit_or_send(&bot, &q, user, text, Some(render::back_kb())).await;
            bot.answer_callback_query(q.id.clone()).await?;
            Ok(())
        }
        "support" => {
            edit_or_send(&bot, &q, user, render::support_text(), Some(render::back_kb())).await;
            bot.answer_callback_query(q.id.clone()).await?;
            Ok(())
        }
        _ => {
            let Some(event) = parse_flow_event(&data) else {
                bot.answer_callback_query(q.id.clone()).await?;
                return Ok(());
            };
            dispatch_flow_event(&bot, &q, &state, user, event).await
        }
    }
}

/// Decodes callback data into a flow event; `None` means a stale or foreign
/// button we silently swallow.
fn parse_flow_event(data: &str) -> Option<FlowEvent> {
    match data {
        "menu" => Some(FlowEvent::Cancel),
        "browse" => Some(FlowEvent::Browse),
        "done" => Some(FlowEvent::VariantsDone),
        _ => {
            if let Some(rest) = data.strip_prefix("prod:") {
                rest.parse().ok().map(FlowEvent::ChooseProduct)
            } else if let Some(rest) = data.strip_prefix("var:") {
                rest.parse().ok().map(FlowEvent::ToggleVariant)
            } else if let Some(rest) = data.strip_prefix("pay:") {
                crate::entities::PaymentMethod::from_code(rest).map(FlowEvent::ChoosePayment)
            } else {
                None
            }
        }
    }
}

/// Applies a flow event and rewrites the menu message with the result.
async fn dispatch_flow_event(
    bot: &Bot,
    q: &CallbackQuery,
    state: &AppState,
    user: i64,
    event: FlowEvent,
) -> Result<()> {
    let rendered = {
        let mut store = state.store.lock().await;
        let mut sessions = state.sessions.lock().await;
        match flow::handle_event(&mut store, &mut sessions, user, &event) {
            Ok(reply) => {
                // Order creation is the only ledger mutation on this path.
                if matches!(reply, FlowReply::OrderCreated(_)) {
                    store.save()?;
                }
                render_flow_reply(&store, &reply)
            }
            Err(e) => Err(e),
        }
    };

    match rendered {
        Ok((text, keyboard)) => {
            edit_or_send(bot, q, user, text, keyboard).await;
            bot.answer_callback_query(q.id.clone()).await?;
            Ok(())
        }
        Err(e) => match recoverable_text(&e) {
            Some(text) => {
                bot.answer_callback_query(q.id.clone())
                    .text(text)
                    .show_alert(true)
                    .await?;
                Ok(())
            }
            None => {
                bot.answer_callback_query(q.id.clone()).await?;
                Err(e)
            }
        },
    }
}

/// Turns a typed flow reply into text plus an optional keyboard, resolving
/// live catalog data at render time.
fn render_flow_reply(
    store: &Store,
    reply: &FlowReply,
) -> Result<(String, Option<InlineKeyboardMarkup>)> {
    Ok(match reply {
        FlowReply::Products => {
            let products = store.catalog.products();
            if products.is_empty() {
                (render::products_text(true), Some(render::back_kb()))
            } else {
                (
                    render::products_text(false),
                    Some(render::product_list_kb(products)),
                )
            }
        }
        FlowReply::VariantMenu {
            product_id,
            selected,
            unit_price,
        } => {
            let product = store.catalog.product(*product_id)?;
            (
                render::variant_menu_text(product, *unit_price),
                Some(render::variant_menu_kb(product, selected)),
            )
        }
        FlowReply::QuantityPrompt { unit_price } => (render::quantity_prompt(*unit_price), None),
        FlowReply::PaymentPrompt { total_amount } => (
            render::payment_prompt(*total_amount),
            Some(render::payment_kb()),
        ),
        FlowReply::OrderCreated(order) => (render::order_summary(order), None),
        FlowReply::MainMenu => (render::main_menu_text(), Some(render::main_menu_kb())),
    })
}

/// Edits the message the keyboard was on, falling back to a fresh message
/// when Telegram no longer exposes it. Delivery failures are logged, never
/// fatal.
async fn edit_or_send(
    bot: &Bot,
    q: &CallbackQuery,
    user: i64,
    text: String,
    keyboard: Option<InlineKeyboardMarkup>,
) {
    // Photo messages (the welcome card) have no text to edit; answer with a
    // fresh message instead.
    let editable = q.message.as_ref().filter(|m| m.text().is_some());
    let result = if let Some(message) = editable {
        let mut request = bot.edit_message_text(message.chat.id, message.id, text);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard);
        }
        request.await.map(drop)
    } else {
        let mut request = bot.send_message(ChatId(user), text);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard);
        }
        request.await.map(drop)
    };
    if let Err(e) = result {
        warn!(user, error = %e, "menu update failed");
    }
}

/// Admin review via the inline buttons on the notification message.
async fn handle_review_callback(
    bot: &Bot,
    q: &CallbackQuery,
    state: &AppState,
    user: i64,
    arg: &str,
    verdict: Verdict,
) -> Result<()> {
    if state.ensure_admin(user).is_err() {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    }

    let outcome = match arg.parse::<u64>() {
        Ok(id) => {
            let mut store = state.store.lock().await;
            match review::process_order(&mut store.ledger, id, verdict) {
                Ok(order) => {
                    store.save()?;
                    Ok(order)
                }
                Err(e) => Err(e),
            }
        }
        Err(_) => Err(Error::Validation {
            message: "Malformed order reference.".to_string(),
        }),
    };

    let order = match outcome {
        Ok(order) => order,
        Err(e) => {
            return match recoverable_text(&e) {
                Some(text) => {
                    // Duplicate taps and unknown ids alert the admin, mutate
                    // nothing, and are not fatal.
                    bot.answer_callback_query(q.id.clone())
                        .text(text)
                        .show_alert(true)
                        .await?;
                    Ok(())
                }
                None => {
                    bot.answer_callback_query(q.id.clone()).await?;
                    Err(e)
                }
            };
        }
    };

    if let Err(e) = bot
        .send_message(ChatId(order.user), render::user_decision_text(&order))
        .await
    {
        warn!(order_id = order.id, error = %e, "buyer notification failed");
    }
    // Rewrite the caption in place; the edit drops the action buttons.
    if let Some(message) = &q.message {
        if let Err(e) = bot
            .edit_message_caption(message.chat.id, message.id)
            .caption(render::processed_admin_caption(&order))
            .await
        {
            warn!(order_id = order.id, error = %e, "admin notification edit failed");
        }
    }
    bot.answer_callback_query(q.id.clone())
        .text(format!("Order {} {}.", order.id, order.status))
        .await?;
    Ok(())
}

/// Routes plain messages: photos may complete an order, text only matters
/// while a quantity is expected or a screenshot is overdue.
pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> Result<()> {
    let Some(sender) = msg.from() else {
        return Ok(());
    };
    let user = user_key(sender.id);

    if let Some(photo) = msg.photo().and_then(<[_]>::last) {
        return handle_screenshot(&bot, &msg, &state, user, photo.file.id.clone()).await;
    }

    if msg.text().is_some() {
        return handle_text(&bot, &msg, &state, user).await;
    }
    Ok(())
}

async fn handle_text(bot: &Bot, msg: &Message, state: &AppState, user: i64) -> Result<()> {
    let step = { state.sessions.lock().await.get(user).cloned() };
    match step {
        Some(SessionState::EnteringQuantity { .. }) => {
            let text = msg.text().unwrap_or_default().to_string();
            let rendered = {
                let mut store = state.store.lock().await;
                let mut sessions = state.sessions.lock().await;
                flow::handle_event(&mut store, &mut sessions, user, &FlowEvent::Quantity(text))
                    .and_then(|reply| render_flow_reply(&store, &reply))
            };
            match rendered {
                Ok((text, keyboard)) => {
                    let mut request = bot.send_message(msg.chat.id, text);
                    if let Some(keyboard) = keyboard {
                        request = request.reply_markup(keyboard);
                    }
                    request.await?;
                    Ok(())
                }
                Err(e) => match recoverable_text(&e) {
                    Some(text) => {
                        // Invalid quantity: re-prompt, state unchanged.
                        bot.send_message(msg.chat.id, text).await?;
                        Ok(())
                    }
                    None => Err(e),
                },
            }
        }
        Some(SessionState::AwaitingScreenshot) => {
            bot.send_message(msg.chat.id, render::screenshot_reminder())
                .await?;
            Ok(())
        }
        _ => Ok(()),
    }
}

async fn handle_screenshot(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    user: i64,
    file_id: String,
) -> Result<()> {
    let attached = {
        let mut store = state.store.lock().await;
        let mut sessions = state.sessions.lock().await;
        match flow::handle_screenshot(&mut store, &mut sessions, user, &file_id) {
            Ok(order) => {
                store.save()?;
                Ok(order)
            }
            Err(e) => Err(e),
        }
    };

    match attached {
        Ok(order) => {
            bot.send_message(msg.chat.id, render::screenshot_received())
                .await?;
            notify_admin(bot, state, &order).await;
            Ok(())
        }
        Err(e) => match recoverable_text(&e) {
            Some(text) => {
                bot.send_message(msg.chat.id, text).await?;
                Ok(())
            }
            None => Err(e),
        },
    }
}

/// Posts the screenshot to the admin with the order caption and review
/// buttons, then remembers the message id so the decision can edit it in
/// place. Failure leaves the order valid but unnotified (manual
/// reconciliation via /products and the ledger).
async fn notify_admin(bot: &Bot, state: &AppState, order: &Order) {
    let Some(file_id) = order.screenshot_file_id.clone() else {
        return;
    };
    let sent = bot
        .send_photo(ChatId(state.config.admin_id), InputFile::file_id(file_id))
        .caption(render::admin_caption(order))
        .reply_markup(render::admin_review_kb(order.id))
        .await;
    match sent {
        Ok(message) => {
            let mut store = state.store.lock().await;
            if store
                .ledger
                .set_channel_message(order.id, message.id.0)
                .is_ok()
            {
                if let Err(e) = store.save() {
                    error!(order_id = order.id, error = %e, "failed to persist notification reference");
                }
            }
        }
        Err(e) => {
            error!(order_id = order.id, error = %e, "admin notification failed; order stays valid but unnotified");
        }
    }
}

//! Message texts and inline keyboards.
//!
//! Pure presentation: everything here takes already-resolved data and
//! produces strings or keyboards, so the handlers stay free of formatting
//! noise. Keyboards encode actions as compact callback data (`prod:3`,
//! `var:2`, `pay:btc`, `confirm:7`).

use crate::entities::{Order, OrderStatus, PaymentMethod, Product};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// The three-entry main menu.
#[must_use]
pub fn main_menu_kb() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("🛍 Browse Products", "browse")],
        vec![InlineKeyboardButton::callback("📄 My Orders", "orders")],
        vec![InlineKeyboardButton::callback("💬 Support", "support")],
    ])
}

/// A single "back to menu" row.
#[must_use]
pub fn back_kb() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "⬅️ Back to Main Menu",
        "menu",
    )]])
}

/// The welcome message's single Continue button.
#[must_use]
pub fn continue_kb() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "Continue", "menu",
    )]])
}

/// One button per product, newest last, plus the back row.
#[must_use]
pub fn product_list_kb(products: &[Product]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = products
        .iter()
        .map(|p| {
            vec![InlineKeyboardButton::callback(
                format!("✅ {}", p.name),
                format!("prod:{}", p.id),
            )]
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback(
        "⬅️ Back to Main Menu",
        "menu",
    )]);
    InlineKeyboardMarkup::new(rows)
}

/// Toggle buttons for the enabled variants with live prices and selection
/// checkmarks, then Done and back rows.
#[must_use]
pub fn variant_menu_kb(product: &Product, selected: &BTreeSet<u32>) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = product
        .enabled_variants()
        .map(|v| {
            let mark = if selected.contains(&v.id) { "✅" } else { "▫️" };
            vec![InlineKeyboardButton::callback(
                format!("{mark} {} – ${:.2}", v.name, v.price),
                format!("var:{}", v.id),
            )]
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback("✔️ Done", "done")]);
    rows.push(vec![InlineKeyboardButton::callback(
        "⬅️ Back to Main Menu",
        "menu",
    )]);
    InlineKeyboardMarkup::new(rows)
}

/// One button per payment method, plus a way back to the product list.
#[must_use]
pub fn payment_kb() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = PaymentMethod::ALL
        .into_iter()
        .map(|m| {
            vec![InlineKeyboardButton::callback(
                format!("{} {}", m.symbol(), m.label()),
                format!("pay:{}", m.code()),
            )]
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback(
        "⬅️ Back to Product Selection",
        "browse",
    )]);
    InlineKeyboardMarkup::new(rows)
}

/// Confirm/reject controls attached to the admin notification.
#[must_use]
pub fn admin_review_kb(order_id: u64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("✅ Confirm", format!("confirm:{order_id}")),
        InlineKeyboardButton::callback("❌ Reject", format!("reject:{order_id}")),
    ]])
}

/// Caption for the /start welcome message.
#[must_use]
pub fn welcome_text() -> String {
    "Welcome to our official bot. Get secure account services, fast order \
     confirmation, reliable communication, and trusted support.\n\n\
     Tap Continue below to open the menu."
        .to_string()
}

/// Text above the main menu keyboard.
#[must_use]
pub fn main_menu_text() -> String {
    "Welcome! Please choose an option from the menu below to get started.".to_string()
}

/// Header above the product list, or the empty-catalog notice.
#[must_use]
pub fn products_text(empty: bool) -> String {
    if empty {
        "We're sorry, but there are no products available at the moment.".to_string()
    } else {
        "🛍 Available Products\n\nPlease select a product from the list below:".to_string()
    }
}

/// Text above the variant toggle keyboard.
#[must_use]
pub fn variant_menu_text(product: &Product, unit_price: f64) -> String {
    format!(
        "🧩 {}\n\nPick your options below. Your unit price is the highest \
         selected tier, not the sum.\n\nCurrent unit price: ${unit_price:.2}\n\
         Tap Done when you're ready.",
        product.name
    )
}

/// Quantity prompt shown after the variant selection is locked in.
#[must_use]
pub fn quantity_prompt(unit_price: f64) -> String {
    format!(
        "Unit price: ${unit_price:.2}\n\nPlease enter the quantity you'd like \
         to order (e.g., 1, 2, 5):"
    )
}

/// Total recap above the payment keyboard.
#[must_use]
pub fn payment_prompt(total_amount: f64) -> String {
    format!(
        "Total Amount: ${total_amount:.2}\n\nPlease select your preferred \
         payment method:"
    )
}

fn options_line(selected_variants: &[String]) -> String {
    if selected_variants.is_empty() {
        "none".to_string()
    } else {
        selected_variants.join(", ")
    }
}

/// The final order summary asking for the payment screenshot.
#[must_use]
pub fn order_summary(order: &Order) -> String {
    format!(
        "🧾 Order Summary\n\n\
         Order ID: #{id}\n\
         Product: {product}\n\
         Options: {options}\n\
         Quantity: {qty}\n\
         Unit Price: ${unit_price:.2}\n\
         Total: ${amount:.2}\n\
         Payment Method: {method}\n\n\
         ✅ To complete payment:\n\
         1. Send the exact amount to our wallet (shared after confirmation)\n\
         2. Reply to this message with your payment screenshot\n\n\
         ⏳ Your order is processed manually after admin verification. \
         You'll receive a notification once confirmed.\n\
         🕒 Estimated processing: 5–30 mins after payment",
        id = order.id,
        product = order.product_name,
        options = options_line(&order.selected_variants),
        qty = order.qty,
        unit_price = order.unit_price,
        amount = order.amount,
        method = order.payment_method,
    )
}

/// Acknowledgement after a screenshot is attached.
#[must_use]
pub fn screenshot_received() -> String {
    "Screenshot received. Your order is now pending admin confirmation.".to_string()
}

/// Reminder when the user types instead of sending the screenshot.
#[must_use]
pub fn screenshot_reminder() -> String {
    "Please reply with your payment screenshot (as a photo) to complete the \
     order, or return to the menu to cancel."
        .to_string()
}

/// Caption of the admin notification carrying the screenshot.
#[must_use]
pub fn admin_caption(order: &Order) -> String {
    format!(
        "New Payment Submitted!\n\n\
         Order ID: {id}\n\
         User ID: {user}\n\
         Product: {product}\n\
         Options: {options}\n\
         Quantity: {qty}\n\
         Amount: ${amount:.2}\n\
         Payment Method: {method}\n\n\
         Verify the payment, then use the buttons below \
         (or /confirm {id} / /reject {id}).",
        id = order.id,
        user = order.user,
        product = order.product_name,
        options = options_line(&order.selected_variants),
        qty = order.qty,
        amount = order.amount,
        method = order.payment_method,
    )
}

/// Replacement caption once the order left review; the buttons are removed
/// by the edit.
#[must_use]
pub fn processed_admin_caption(order: &Order) -> String {
    let verdict = match order.status {
        OrderStatus::Confirmed => "✅ CONFIRMED",
        OrderStatus::Rejected => "❌ REJECTED",
        _ => "PENDING",
    };
    format!(
        "{verdict}\n\n\
         Order ID: {id}\n\
         User ID: {user}\n\
         Product: {product}\n\
         Amount: ${amount:.2}\n\
         Payment Method: {method}",
        id = order.id,
        user = order.user,
        product = order.product_name,
        amount = order.amount,
        method = order.payment_method,
    )
}

/// Message sent to the buyer once the admin decided.
#[must_use]
pub fn user_decision_text(order: &Order) -> String {
    match order.status {
        OrderStatus::Confirmed => {
            "✅ Order Confirmed!\n\nOur team will contact you shortly for \
             delivery. Thank you!"
                .to_string()
        }
        _ => {
            "❌ Order Rejected.\n\nYour payment could not be verified. Please \
             contact support if you believe this is a mistake."
                .to_string()
        }
    }
}

/// The per-user order history, one line per order.
pub fn order_history<'a>(orders: impl Iterator<Item = &'a Order>) -> String {
    let mut lines = String::new();
    for order in orders {
        let _ = writeln!(
            lines,
            "ID: {} | {} ×{} | ${:.2} | {}",
            order.id, order.product_name, order.qty, order.amount, order.status
        );
    }
    if lines.is_empty() {
        "You have no orders yet.\n\nFeel free to browse our products!".to_string()
    } else {
        format!("📄 Your Order History\n\n{lines}")
    }
}

/// Static support blurb.
#[must_use]
pub fn support_text() -> String {
    "Need Help?\n\nIf you have any questions or issues, please describe them \
     in a message. Our admin will get back to you as soon as possible."
        .to_string()
}

/// Admin-facing catalog dump with the ids every catalog command takes.
#[must_use]
pub fn admin_catalog(products: &[Product]) -> String {
    if products.is_empty() {
        return "Catalog is empty. Add a product with /addproduct <name>.".to_string();
    }
    let mut out = String::from("Catalog\n");
    for product in products {
        let _ = writeln!(out, "\n#{} {}", product.id, product.name);
        for v in &product.variants {
            let state = if v.enabled { "" } else { " (disabled)" };
            let _ = writeln!(out, "  [{}] {} – ${:.2}{state}", v.id, v.name, v.price);
        }
    }
    out
}

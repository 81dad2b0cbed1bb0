//! Order entity - An immutable purchase snapshot plus a review status.
//!
//! `amount`, `unit_price`, `product_name`, and `selected_variants` are copied
//! from the catalog at creation time and never change afterwards, so later
//! catalog edits (or even product deletion) cannot rewrite order history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Review lifecycle of an order.
///
/// `awaiting_screenshot -> pending_confirmation -> {confirmed | rejected}`.
/// Transitions out of `pending_confirmation` are admin-only and guarded
/// against duplicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, waiting for the buyer's payment screenshot
    AwaitingScreenshot,
    /// Screenshot attached, waiting for admin review
    /// (older data files call this `payment_submitted`)
    #[serde(alias = "payment_submitted")]
    PendingConfirmation,
    /// Admin accepted the payment evidence
    Confirmed,
    /// Admin rejected the payment evidence
    Rejected,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AwaitingScreenshot => "awaiting_screenshot",
            Self::PendingConfirmation => "pending_confirmation",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// The fixed set of accepted payment methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Bitcoin
    #[serde(rename = "BTC")]
    Btc,
    /// Ethereum
    #[serde(rename = "ETH")]
    Eth,
    /// Tether on Tron
    #[serde(rename = "USDT (TRC20)")]
    UsdtTrc20,
    /// USD Coin
    #[serde(rename = "USDC")]
    Usdc,
    /// Solana
    #[serde(rename = "SOL")]
    Sol,
    /// Direct Binance transfer by account id
    #[serde(rename = "Binance ID")]
    BinanceId,
}

impl PaymentMethod {
    /// Every accepted method, in display order.
    pub const ALL: [Self; 6] = [
        Self::Btc,
        Self::Eth,
        Self::UsdtTrc20,
        Self::Usdc,
        Self::Sol,
        Self::BinanceId,
    ];

    /// Display label, identical to the persisted form.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Btc => "BTC",
            Self::Eth => "ETH",
            Self::UsdtTrc20 => "USDT (TRC20)",
            Self::Usdc => "USDC",
            Self::Sol => "SOL",
            Self::BinanceId => "Binance ID",
        }
    }

    /// Decorative symbol shown on the payment keyboard.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Btc => "₿",
            Self::Eth => "Ξ",
            Self::UsdtTrc20 => "𝕌",
            Self::Usdc => "🔵",
            Self::Sol => "🪐",
            Self::BinanceId => "🏦",
        }
    }

    /// Short ASCII code used in callback data.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Btc => "btc",
            Self::Eth => "eth",
            Self::UsdtTrc20 => "usdt",
            Self::Usdc => "usdc",
            Self::Sol => "sol",
            Self::BinanceId => "binance",
        }
    }

    /// Reverse of [`Self::code`].
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.code() == code)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A finalized purchase intent, created when the buyer picks a payment
/// method and reviewed manually by the admin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier, `count(orders) + 1` at creation, never reused
    pub id: u64,
    /// Originating Telegram user id
    pub user: i64,
    /// Catalog id of the purchased product (may dangle after deletion)
    pub product_id: u64,
    /// Product name snapshotted at creation, so history renders even after
    /// the product is deleted from the catalog
    #[serde(default)]
    pub product_name: String,
    /// Names (not ids) of the selected variants, snapshotted at creation
    #[serde(default)]
    pub selected_variants: Vec<String>,
    /// Ordered quantity, always positive
    pub qty: u32,
    /// Unit price snapshotted at creation
    #[serde(default)]
    pub unit_price: f64,
    /// Total amount: `unit_price * qty`, snapshotted at creation
    pub amount: f64,
    /// Chosen payment method
    pub payment_method: PaymentMethod,
    /// Opaque Telegram file id of the payment screenshot, if submitted
    #[serde(default)]
    pub screenshot_file_id: Option<String>,
    /// Current review status
    pub status: OrderStatus,
    /// Creation timestamp
    pub created: DateTime<Utc>,
    /// When the admin confirmed the order, if ever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Message id of the admin-facing notification, kept so the message can
    /// be edited in place once the order is processed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_message_id: Option<i32>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn payment_method_persists_as_its_label() {
        let json = serde_json::to_string(&PaymentMethod::UsdtTrc20).unwrap();
        assert_eq!(json, "\"USDT (TRC20)\"");
        let back: PaymentMethod = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PaymentMethod::UsdtTrc20);
    }

    #[test]
    fn payment_method_codes_round_trip() {
        for method in PaymentMethod::ALL {
            assert_eq!(PaymentMethod::from_code(method.code()), Some(method));
        }
        assert_eq!(PaymentMethod::from_code("cash"), None);
    }

    #[test]
    fn legacy_payment_submitted_reads_as_pending_confirmation() {
        let status: OrderStatus = serde_json::from_str("\"payment_submitted\"").unwrap();
        assert_eq!(status, OrderStatus::PendingConfirmation);
        // New writes use the canonical name.
        assert_eq!(
            serde_json::to_string(&status).unwrap(),
            "\"pending_confirmation\""
        );
    }
}

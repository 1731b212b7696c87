//! Order-side types: sides, price types, outcomes and order views.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which side of the book an order sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Buy.
    Buy,
    /// Sell.
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Caller-facing price type codes.
///
/// The numeric codes are part of the wire contract and must not change:
///
/// | code | meaning |
/// |------|---------|
/// | 0 | fixed limit price (caller-supplied) |
/// | 1 | latest-trade price |
/// | 2 | best-5-levels immediate-or-cancel (venue-specific variant) |
/// | 3 | own-side best price |
/// | 5 | counter-side best price |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceType {
    /// Fixed limit price; uses the caller-supplied price.
    Fixed,
    /// Latest-trade price; price field ignored.
    Latest,
    /// Best five levels, immediate-or-cancel; Shanghai and Shenzhen use
    /// different wire variants.
    BestFiveCancel,
    /// Own-side best (buy at best bid, sell at best ask).
    OwnSideBest,
    /// Counter-side best (buy at best ask, sell at best bid).
    CounterSideBest,
}

impl PriceType {
    /// Resolve a caller-supplied code; `None` for unsupported codes.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Fixed),
            1 => Some(Self::Latest),
            2 => Some(Self::BestFiveCancel),
            3 => Some(Self::OwnSideBest),
            5 => Some(Self::CounterSideBest),
            _ => None,
        }
    }

    /// The numeric code callers use.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Fixed => 0,
            Self::Latest => 1,
            Self::BestFiveCancel => 2,
            Self::OwnSideBest => 3,
            Self::CounterSideBest => 5,
        }
    }
}

/// Structured result of one order placement attempt.
///
/// Business failures (insufficient funds, lot too small, symbol not held)
/// are reported here with `success: false`; they are not errors and reach
/// the HTTP caller with status 200. `notional_value` is the *intended*
/// value (quantity x reference price), not the filled value - fills are the
/// broker's business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOutcome {
    /// Whether the order was accepted by the broker link.
    pub success: bool,
    /// Venue-qualified symbol the order targeted.
    pub symbol: String,
    /// Shares submitted (0 when sizing failed).
    pub order_quantity: i64,
    /// Reference price the sizing used.
    pub price: Decimal,
    /// Intended notional value: `order_quantity * price`.
    pub notional_value: Decimal,
    /// Broker-assigned order handle; present only on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
    /// Human-readable summary, always present.
    pub message: String,
}

impl TradeOutcome {
    /// A successful submission.
    #[must_use]
    pub fn accepted(
        symbol: impl Into<String>,
        quantity: i64,
        price: Decimal,
        order_id: i64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            symbol: symbol.into(),
            order_quantity: quantity,
            price,
            notional_value: Decimal::from(quantity) * price,
            order_id: Some(order_id),
            message: message.into(),
        }
    }

    /// A structured failure with zero quantity.
    #[must_use]
    pub fn rejected(
        symbol: impl Into<String>,
        price: Decimal,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            symbol: symbol.into(),
            order_quantity: 0,
            price,
            notional_value: Decimal::ZERO,
            order_id: None,
            message: message.into(),
        }
    }

    /// A structured failure for an order that was sized but not accepted.
    #[must_use]
    pub fn rejected_sized(
        symbol: impl Into<String>,
        quantity: i64,
        price: Decimal,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            symbol: symbol.into(),
            order_quantity: quantity,
            price,
            notional_value: Decimal::ZERO,
            order_id: None,
            message: message.into(),
        }
    }
}

/// Result of a cancel request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOutcome {
    /// Whether the broker acknowledged the cancel.
    pub success: bool,
    /// The order the cancel targeted.
    pub order_id: i64,
    /// Human-readable summary.
    pub message: String,
}

/// One row of an order query.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    /// Broker-assigned order handle.
    pub order_id: i64,
    /// Venue-qualified symbol.
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Raw broker status code.
    pub status: u8,
    /// Human-readable status label.
    pub status_label: &'static str,
    /// Submitted volume.
    pub volume: i64,
    /// Submission time (unix seconds).
    pub time: i64,
    /// Submitted price.
    pub price: Decimal,
    /// Price mode the order was submitted with.
    pub price_type: crate::broker::WirePriceMode,
    /// Volume filled so far.
    pub traded_volume: i64,
    /// Average fill price so far.
    pub traded_price: Decimal,
    /// Strategy tag attached at submission.
    pub strategy_name: String,
}

/// Broker order status codes that still accept a cancel.
pub const CANCELABLE_STATUSES: &[u8] = &[ORDER_REPORTED, ORDER_PARTIALLY_FILLED];

/// Status code: order reported to the venue.
pub const ORDER_REPORTED: u8 = 50;

/// Status code: order partially filled.
pub const ORDER_PARTIALLY_FILLED: u8 = 55;

/// Status code: order fully filled.
pub const ORDER_FILLED: u8 = 56;

/// Status code: order canceled.
pub const ORDER_CANCELED: u8 = 54;

/// Human-readable label for a broker order status code.
#[must_use]
pub const fn order_status_label(status: u8) -> &'static str {
    match status {
        48 => "not submitted",
        49 => "queued",
        50 => "reported",
        51 => "reported, cancel pending",
        52 => "partially filled, cancel pending",
        53 => "partially canceled",
        54 => "canceled",
        55 => "partially filled",
        56 => "filled",
        57 => "rejected",
        _ => "unknown",
    }
}

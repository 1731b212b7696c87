//! The broker link boundary.
//!
//! The underlying broker SDK is an opaque, stateful, asynchronous external
//! service. Everything the gateway needs from it is expressed through the
//! narrow [`BrokerTransport`] capability interface; a [`TransportFactory`]
//! mints a fresh transport handle for every connection attempt, so a
//! half-dead handle from a prior attempt can never be reused.
//!
//! Push callbacks (order/trade/position/asset updates, disconnect notice)
//! arrive on the [`BrokerCallbackSink`]; the session never blocks on them
//! and never reconnects from them - reconnection is pulled lazily by the
//! next operation that needs the link.

pub mod records;
pub mod retry;
pub mod sim;

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use records::{AssetFields, PositionFields, RawAssetRecord, RawOrderRecord, RawPositionRecord};
pub use retry::RetryPolicy;

/// Order side at the wire level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireSide {
    /// Buy.
    Buy,
    /// Sell.
    Sell,
}

/// Broker-native price modes an order can be submitted with.
///
/// The best-five immediate-or-cancel mode exists in two venue-specific
/// variants; the execution engine picks the right one from the symbol's
/// venue suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WirePriceMode {
    /// Limit order at the supplied price.
    Fixed,
    /// Market order at the latest trade price.
    Latest,
    /// Best five levels, cancel the remainder (Shanghai variant).
    BestFiveCancelShanghai,
    /// Best five levels, cancel the remainder (Shenzhen variant).
    BestFiveCancelShenzhen,
    /// Own-side best price.
    OwnSideBest,
    /// Counter-side best price.
    CounterSideBest,
}

/// Transport-level failures raised by the broker link.
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    /// The link dropped or the call could not reach the broker.
    #[error("transport error: {message}")]
    Transport {
        /// Error details.
        message: String,
    },

    /// The connect handshake was refused.
    #[error("connect handshake failed with code {code}")]
    ConnectFailed {
        /// Broker-reported result code.
        code: i32,
    },

    /// The account subscription was refused after a successful connect.
    #[error("account subscription failed with code {code}")]
    SubscribeFailed {
        /// Broker-reported result code.
        code: i32,
    },

    /// No market data is available for the symbol.
    #[error("no market data for {symbol}")]
    NoMarketData {
        /// The symbol that was queried.
        symbol: String,
    },
}

impl BrokerError {
    /// Convenience constructor for transport faults.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// One order as handed to the broker link.
#[derive(Debug, Clone)]
pub struct OrderTicket<'a> {
    /// Venue-qualified symbol in the order-submission convention.
    pub symbol: &'a str,
    /// Buy or sell.
    pub side: WireSide,
    /// Shares to submit.
    pub quantity: i64,
    /// Resolved price mode.
    pub price_mode: WirePriceMode,
    /// Limit price; ignored by market modes.
    pub price: Decimal,
    /// Strategy tag recorded against the order.
    pub strategy_tag: &'a str,
}

/// Trade (fill) push from the broker.
#[derive(Debug, Clone)]
pub struct TradeUpdate {
    /// Account the fill belongs to.
    pub account_id: String,
    /// Venue-qualified symbol.
    pub symbol: String,
    /// Order the fill belongs to.
    pub order_id: i64,
    /// Filled volume.
    pub traded_volume: i64,
    /// Fill price.
    pub traded_price: Decimal,
}

/// Asynchronous order rejection push.
#[derive(Debug, Clone)]
pub struct OrderErrorNotice {
    /// Account the order belonged to.
    pub account_id: String,
    /// Strategy tag of the rejected order.
    pub strategy_name: String,
    /// Broker error code.
    pub error_id: i32,
    /// Broker error message.
    pub error_msg: String,
}

/// Asynchronous cancel rejection push.
#[derive(Debug, Clone)]
pub struct CancelErrorNotice {
    /// Order the cancel targeted.
    pub order_id: i64,
    /// Broker error code.
    pub error_id: i32,
    /// Broker error message.
    pub error_msg: String,
}

/// Account status push.
#[derive(Debug, Clone)]
pub struct AccountStatusNotice {
    /// Account the status belongs to.
    pub account_id: String,
    /// Broker account type code.
    pub account_kind: i32,
    /// Raw status code.
    pub status: i32,
}

impl AccountStatusNotice {
    /// Human-readable label for the raw status code.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self.status {
            -1 => "invalid",
            0 => "ok",
            1 => "connecting",
            2 => "logging in",
            3 => "failed",
            4 => "initializing",
            5 => "correcting",
            6 => "closed",
            7 => "pass-through link broken",
            8 => "locked",
            9 => "disabled",
            _ => "unknown",
        }
    }
}

/// Sink for the broker's push callbacks.
///
/// Implementations must be cheap and non-blocking; the broker delivers these
/// on its own callback channel. The disconnect notice in particular must not
/// trigger reconnection here - the session reconnects lazily on the next
/// operation that needs the link.
pub trait BrokerCallbackSink: Send + Sync {
    /// The transport lost its connection.
    fn on_disconnected(&self);
    /// An order changed state.
    fn on_order_update(&self, order: &RawOrderRecord);
    /// A fill arrived.
    fn on_trade_update(&self, trade: &TradeUpdate);
    /// A position changed.
    fn on_position_update(&self, position: &RawPositionRecord);
    /// Account assets changed.
    fn on_asset_update(&self, asset: &RawAssetRecord);
    /// An order was rejected asynchronously.
    fn on_order_error(&self, notice: &OrderErrorNotice);
    /// A cancel was rejected asynchronously.
    fn on_cancel_error(&self, notice: &CancelErrorNotice);
    /// The account status changed.
    fn on_account_status(&self, notice: &AccountStatusNotice);
}

/// Narrow capability interface over one authenticated broker connection.
///
/// A transport is bound to one account and one session token at creation
/// time and is owned exclusively by its session; on reconnect the session
/// replaces the whole handle.
#[async_trait]
pub trait BrokerTransport: Send + Sync {
    /// Start the transport's internal worker.
    async fn start(&self) -> Result<(), BrokerError>;

    /// Perform the connect handshake.
    async fn connect(&self) -> Result<(), BrokerError>;

    /// Subscribe the account for queries and callbacks.
    async fn subscribe(&self) -> Result<(), BrokerError>;

    /// Query all positions the broker reports for the account.
    async fn query_positions(&self) -> Result<Vec<RawPositionRecord>, BrokerError>;

    /// Query the account asset snapshot.
    async fn query_asset(&self) -> Result<RawAssetRecord, BrokerError>;

    /// Place an order; returns the broker-assigned handle.
    ///
    /// A handle `<= 0` is the broker's sentinel for a synchronous rejection.
    async fn place_order(&self, ticket: OrderTicket<'_>) -> Result<i64, BrokerError>;

    /// Cancel an order; returns the broker result code (0 = accepted).
    async fn cancel_order(&self, order_id: i64) -> Result<i32, BrokerError>;

    /// Query orders, optionally restricted to cancelable ones.
    async fn query_orders(&self, cancelable_only: bool)
        -> Result<Vec<RawOrderRecord>, BrokerError>;

    /// Query one order by handle.
    async fn query_order(&self, order_id: i64) -> Result<Option<RawOrderRecord>, BrokerError>;

    /// Last trade price for a symbol in the data-query convention.
    async fn last_price(&self, data_symbol: &str) -> Result<Decimal, BrokerError>;

    /// Instrument display name for a symbol in the data-query convention.
    async fn instrument_name(&self, data_symbol: &str) -> Result<String, BrokerError>;
}

/// Mints a fresh transport handle per connection attempt.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Create a transport bound to `account_id` under `session_token`,
    /// with `callbacks` registered before the worker starts.
    async fn create(
        &self,
        account_id: &str,
        session_token: i64,
        callbacks: Arc<dyn BrokerCallbackSink>,
    ) -> Result<Box<dyn BrokerTransport>, BrokerError>;
}

//! Externally visible data model.
//!
//! Canonical structs used everywhere downstream of the broker boundary.
//! Raw broker record shapes never escape [`crate::broker::records`]; these
//! types are what the engine, the pool and the HTTP layer exchange.

mod order;
mod position;

pub use order::{
    order_status_label, CancelOutcome, OrderSide, OrderView, PriceType, TradeOutcome,
    CANCELABLE_STATUSES, ORDER_CANCELED, ORDER_FILLED, ORDER_PARTIALLY_FILLED, ORDER_REPORTED,
};
pub use position::{BoardGroup, Portfolio, Position, PositionFilter, PositionReport};

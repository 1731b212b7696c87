//! Raw broker record shapes and their one-point normalization.
//!
//! The broker link returns positions and assets either as attribute-bearing
//! records or as plain key-value maps, depending on link version and query
//! path. Both shapes are modelled here as a tagged union and resolved
//! exactly once, at this boundary, into the canonical structs from
//! [`crate::models`]. Nothing downstream ever branches on shape again.
//!
//! Missing fields default to zero; a zero market value with a positive
//! volume and cost basis is reconciled to `volume * avg_cost`.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::models::{order_status_label, OrderSide, OrderView, Portfolio, Position};

use super::{WirePriceMode, WireSide};

/// Attribute-bearing position record.
#[derive(Debug, Clone, Default)]
pub struct PositionFields {
    /// Venue-qualified symbol.
    pub stock_code: String,
    /// Total held shares.
    pub volume: i64,
    /// Shares sellable right now.
    pub can_use_volume: i64,
    /// Shares frozen by open orders.
    pub frozen_volume: i64,
    /// Shares in transit.
    pub on_road_volume: i64,
    /// Shares held since yesterday.
    pub yesterday_volume: i64,
    /// Average cost per share.
    pub avg_price: Decimal,
    /// Price at open of the position.
    pub open_price: Decimal,
    /// Broker-reported market value.
    pub market_value: Decimal,
}

/// A position as the broker link reports it.
#[derive(Debug, Clone)]
pub enum RawPositionRecord {
    /// Attribute-bearing record.
    Attributes(PositionFields),
    /// Plain key-value map.
    Map(Map<String, Value>),
}

impl RawPositionRecord {
    /// The venue-qualified symbol this record belongs to.
    #[must_use]
    pub fn symbol(&self) -> String {
        match self {
            Self::Attributes(fields) => fields.stock_code.clone(),
            Self::Map(map) => map
                .get("stock_code")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Resolve into the canonical [`Position`].
    #[must_use]
    pub fn normalize(&self) -> Position {
        let (symbol, volume, usable, frozen, avg_cost, open_price, market_value) = match self {
            Self::Attributes(f) => (
                f.stock_code.clone(),
                f.volume,
                f.can_use_volume,
                f.frozen_volume,
                f.avg_price,
                f.open_price,
                f.market_value,
            ),
            Self::Map(map) => (
                self.symbol(),
                int_field(map, "volume"),
                int_field(map, "can_use_volume"),
                int_field(map, "frozen_volume"),
                decimal_field(map, "avg_price"),
                decimal_field(map, "open_price"),
                decimal_field(map, "market_value"),
            ),
        };

        let market_value = reconcile_market_value(market_value, volume, avg_cost);

        Position {
            symbol,
            volume,
            usable_volume: usable,
            frozen_volume: frozen,
            avg_cost,
            open_price,
            market_value,
        }
    }
}

/// Attribute-bearing asset record.
#[derive(Debug, Clone, Default)]
pub struct AssetFields {
    /// Total account value.
    pub total_asset: Decimal,
    /// Cash available to trade.
    pub cash: Decimal,
    /// Cash frozen by open orders.
    pub frozen_cash: Decimal,
    /// Market value of all positions.
    pub market_value: Decimal,
    /// Broker-reported profit, when provided.
    pub profit: Option<Decimal>,
    /// Broker-reported profit ratio, when provided.
    pub profit_ratio: Option<Decimal>,
}

/// An account asset snapshot as the broker link reports it.
#[derive(Debug, Clone)]
pub enum RawAssetRecord {
    /// Attribute-bearing record.
    Attributes(AssetFields),
    /// Plain key-value map.
    Map(Map<String, Value>),
}

impl RawAssetRecord {
    /// Resolve into the canonical [`Portfolio`].
    #[must_use]
    pub fn normalize(&self) -> Portfolio {
        match self {
            Self::Attributes(f) => Portfolio {
                total_asset: f.total_asset,
                cash: f.cash,
                frozen_cash: f.frozen_cash,
                market_value: f.market_value,
                profit: f.profit.unwrap_or_default(),
                profit_ratio: f.profit_ratio.unwrap_or_default(),
            },
            Self::Map(map) => Portfolio {
                total_asset: decimal_field(map, "total_asset"),
                cash: decimal_field(map, "cash"),
                frozen_cash: decimal_field(map, "frozen_cash"),
                market_value: decimal_field(map, "market_value"),
                profit: decimal_field(map, "profit"),
                profit_ratio: decimal_field(map, "profit_ratio"),
            },
        }
    }
}

/// One order row as the broker link reports it.
#[derive(Debug, Clone)]
pub struct RawOrderRecord {
    /// Broker-assigned order handle.
    pub order_id: i64,
    /// Venue-qualified symbol.
    pub stock_code: String,
    /// Buy or sell.
    pub side: WireSide,
    /// Raw status code.
    pub status: u8,
    /// Submitted volume.
    pub volume: i64,
    /// Submission time (unix seconds).
    pub order_time: i64,
    /// Submitted price.
    pub price: Decimal,
    /// Price mode the order was submitted with.
    pub price_mode: WirePriceMode,
    /// Volume filled so far.
    pub traded_volume: i64,
    /// Average fill price so far.
    pub traded_price: Decimal,
    /// Strategy tag attached at submission.
    pub strategy_name: String,
}

impl RawOrderRecord {
    /// Build the externally visible order row.
    #[must_use]
    pub fn to_view(&self) -> OrderView {
        OrderView {
            order_id: self.order_id,
            symbol: self.stock_code.clone(),
            side: match self.side {
                WireSide::Buy => OrderSide::Buy,
                WireSide::Sell => OrderSide::Sell,
            },
            status: self.status,
            status_label: order_status_label(self.status),
            volume: self.volume,
            time: self.order_time,
            price: self.price,
            price_type: self.price_mode,
            traded_volume: self.traded_volume,
            traded_price: self.traded_price,
            strategy_name: self.strategy_name.clone(),
        }
    }
}

/// Recompute a zero market value from the cost basis when possible.
fn reconcile_market_value(reported: Decimal, volume: i64, avg_cost: Decimal) -> Decimal {
    if reported == Decimal::ZERO && volume > 0 && avg_cost > Decimal::ZERO {
        Decimal::from(volume) * avg_cost
    } else {
        reported
    }
}

fn int_field(map: &Map<String, Value>, key: &str) -> i64 {
    map.get(key).and_then(Value::as_i64).unwrap_or_default()
}

fn decimal_field(map: &Map<String, Value>, key: &str) -> Decimal {
    match map.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Decimal::from)
            .or_else(|| n.as_f64().and_then(Decimal::from_f64))
            .unwrap_or_default(),
        // Some link versions report decimals as strings.
        Some(Value::String(s)) => s.parse().unwrap_or_default(),
        _ => Decimal::ZERO,
    }
}

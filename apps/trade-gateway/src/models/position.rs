//! Position and portfolio types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Canonical position record, per symbol, per session.
///
/// Invariant: `usable_volume <= volume`. Usable volume excludes shares
/// locked by the T+1 settlement rule (bought today, sellable tomorrow).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Venue-qualified symbol.
    pub symbol: String,
    /// Total held shares.
    pub volume: i64,
    /// Shares sellable right now.
    pub usable_volume: i64,
    /// Shares frozen by open orders.
    pub frozen_volume: i64,
    /// Average cost per share.
    pub avg_cost: Decimal,
    /// Price at open of the position.
    pub open_price: Decimal,
    /// Broker-reported market value.
    pub market_value: Decimal,
}

impl Position {
    /// Unrealized profit at `current_price`; zero when no cost basis exists.
    #[must_use]
    pub fn unrealized_profit(&self, current_price: Decimal) -> Decimal {
        if self.avg_cost > Decimal::ZERO {
            (current_price - self.avg_cost) * Decimal::from(self.volume)
        } else {
            Decimal::ZERO
        }
    }
}

/// Filter applied when querying positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionFilter {
    /// Sellable now: `usable_volume > 0`.
    Usable,
    /// Bought but still locked: `usable_volume == 0 && volume > 0`.
    Pending,
    /// Any held: `volume > 0`.
    Held,
    /// Everything the broker reports, including zero-volume leftovers.
    All,
}

impl PositionFilter {
    /// Whether a position passes this filter.
    #[must_use]
    pub const fn admits(self, volume: i64, usable_volume: i64) -> bool {
        match self {
            Self::Usable => usable_volume > 0,
            Self::Pending => usable_volume == 0 && volume > 0,
            Self::Held => volume > 0,
            Self::All => true,
        }
    }
}

/// Board groups used to slice the held-symbol list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardGroup {
    /// Main boards: everything not on ChiNext or the Beijing exchange.
    Main,
    /// ChiNext (`30` prefix).
    ChiNext,
    /// STAR market (`68` prefix).
    Star,
    /// Beijing exchange (`8`/`4` prefixes).
    Beijing,
}

impl BoardGroup {
    /// Whether a venue-qualified symbol belongs to this group.
    #[must_use]
    pub fn matches(self, symbol: &str) -> bool {
        match self {
            Self::Main => {
                !symbol.starts_with("30") && !symbol.starts_with('8') && !symbol.starts_with('4')
            }
            Self::ChiNext => symbol.starts_with("30"),
            Self::Star => symbol.starts_with("68"),
            Self::Beijing => symbol.starts_with('8') || symbol.starts_with('4'),
        }
    }
}

/// Per-session account snapshot.
///
/// Broker-reported; `total_asset` is approximately `cash + frozen_cash +
/// market_value` but the identity is not enforced here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Total account value.
    pub total_asset: Decimal,
    /// Cash available to trade.
    pub cash: Decimal,
    /// Cash frozen by open orders.
    pub frozen_cash: Decimal,
    /// Market value of all positions.
    pub market_value: Decimal,
    /// Broker-reported profit (zero when not provided).
    pub profit: Decimal,
    /// Broker-reported profit ratio (zero when not provided).
    pub profit_ratio: Decimal,
}

/// Enriched position row returned by the positions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionReport {
    /// Venue-qualified symbol.
    pub symbol: String,
    /// Instrument display name (falls back to the symbol).
    pub name: String,
    /// Total held shares.
    pub volume: i64,
    /// Shares sellable right now.
    pub can_use_volume: i64,
    /// Shares frozen by open orders.
    pub frozen_volume: i64,
    /// Market value, reconciled from cost when the broker reports zero.
    pub market_value: Decimal,
    /// Average cost per share.
    pub avg_price: Decimal,
    /// Price at open of the position.
    pub open_price: Decimal,
    /// Live last-trade price, or the average cost when unavailable.
    pub current_price: Decimal,
    /// Unrealized profit against the cost basis.
    pub profit: Decimal,
    /// Unrealized profit as a percentage of the cost basis.
    pub profit_ratio: Decimal,
}

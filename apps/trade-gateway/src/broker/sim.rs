//! Simulated broker link.
//!
//! An in-process paper broker implementing [`BrokerTransport`] without any
//! real connectivity. It backs the default wiring of the binary and every
//! test that needs a broker: orders rest as `reported` and freeze cash or
//! volume until canceled, and faults (refused connects, dropped links,
//! failing operations) can be scripted per account.
//!
//! One [`SimBroker`] holds the account book; the factory mints a fresh
//! [`BrokerTransport`] handle over it per connection attempt, recording the
//! session token each attempt used.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::models::{ORDER_CANCELED, ORDER_PARTIALLY_FILLED, ORDER_REPORTED};
use crate::symbol;

use super::{
    BrokerCallbackSink, BrokerError, BrokerTransport, OrderTicket, PositionFields, RawAssetRecord,
    RawOrderRecord, RawPositionRecord, TransportFactory, WirePriceMode, WireSide,
};

#[derive(Debug, Clone, Default)]
struct SimPosition {
    volume: i64,
    usable: i64,
    frozen: i64,
    avg_cost: Decimal,
    open_price: Decimal,
}

#[derive(Debug, Clone)]
struct SimOrder {
    record: RawOrderRecord,
}

#[derive(Debug, Default)]
struct SimState {
    cash: Decimal,
    frozen_cash: Decimal,
    positions: BTreeMap<String, SimPosition>,
    orders: Vec<SimOrder>,
    next_order_id: i64,
    last_prices: HashMap<String, Decimal>,
    names: HashMap<String, String>,
    report_as_maps: bool,
    link_up: bool,
    subscribed: bool,
    connect_failures: u32,
    subscribe_failures: u32,
    op_failures: u32,
    connect_count: u32,
    tokens_seen: Vec<i64>,
}

/// The account book behind one simulated brokerage account.
#[derive(Debug, Default)]
pub struct SimBroker {
    state: Mutex<SimState>,
}

impl SimBroker {
    /// A broker with the given starting cash.
    #[must_use]
    pub fn with_cash(cash: Decimal) -> Arc<Self> {
        let broker = Self::default();
        broker.lock().cash = cash;
        Arc::new(broker)
    }

    #[allow(clippy::unwrap_used)] // lock poisoning is unrecoverable here
    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap()
    }

    /// Overwrite the cash balance.
    pub fn set_cash(&self, cash: Decimal) {
        self.lock().cash = cash;
    }

    /// Set the last trade price for a symbol (data-query convention).
    pub fn set_last_price(&self, data_symbol: &str, price: Decimal) {
        self.lock().last_prices.insert(data_symbol.to_string(), price);
    }

    /// Set the display name for a symbol (data-query convention).
    pub fn set_instrument_name(&self, data_symbol: &str, name: &str) {
        self.lock().names.insert(data_symbol.to_string(), name.to_string());
    }

    /// Seed a held position (market convention symbol).
    pub fn seed_position(&self, symbol: &str, volume: i64, usable: i64, avg_cost: Decimal) {
        self.lock().positions.insert(
            symbol.to_string(),
            SimPosition {
                volume,
                usable,
                frozen: 0,
                avg_cost,
                open_price: avg_cost,
            },
        );
    }

    /// Report positions and assets as key-value maps instead of records.
    pub fn report_as_maps(&self, enabled: bool) {
        self.lock().report_as_maps = enabled;
    }

    /// Refuse the next `n` connect handshakes.
    pub fn fail_connects(&self, n: u32) {
        self.lock().connect_failures = n;
    }

    /// Refuse the next `n` account subscriptions.
    pub fn fail_subscribes(&self, n: u32) {
        self.lock().subscribe_failures = n;
    }

    /// Fail the next `n` broker operations with a transport error.
    pub fn fail_operations(&self, n: u32) {
        self.lock().op_failures = n;
    }

    /// Drop the link; operations fail until the next connect handshake.
    pub fn drop_link(&self) {
        self.lock().link_up = false;
    }

    /// Cash currently available to trade.
    #[must_use]
    pub fn cash(&self) -> Decimal {
        self.lock().cash
    }

    /// All orders the broker has seen, newest last.
    #[must_use]
    pub fn orders(&self) -> Vec<RawOrderRecord> {
        self.lock().orders.iter().map(|o| o.record.clone()).collect()
    }

    /// Session tokens observed across connect handshakes.
    #[must_use]
    pub fn tokens_seen(&self) -> Vec<i64> {
        self.lock().tokens_seen.clone()
    }

    /// How many connect handshakes have succeeded.
    #[must_use]
    pub fn connect_count(&self) -> u32 {
        self.lock().connect_count
    }

    fn check_op(state: &mut SimState) -> Result<(), BrokerError> {
        if state.op_failures > 0 {
            state.op_failures -= 1;
            return Err(BrokerError::transport("scripted fault"));
        }
        if !state.link_up {
            return Err(BrokerError::transport("link down"));
        }
        if !state.subscribed {
            return Err(BrokerError::transport("account not subscribed"));
        }
        Ok(())
    }

    fn effective_price(state: &SimState, ticket: &OrderTicket<'_>) -> Decimal {
        if ticket.price_mode == WirePriceMode::Fixed {
            return ticket.price;
        }
        let data = symbol::data_symbol(ticket.symbol);
        state
            .last_prices
            .get(&data)
            .copied()
            .unwrap_or(ticket.price)
    }
}

/// One connection handle over a [`SimBroker`].
pub struct SimTransport {
    broker: Arc<SimBroker>,
    session_token: i64,
    #[allow(dead_code)] // held so the sink outlives the handle, as a real link would
    callbacks: Arc<dyn BrokerCallbackSink>,
}

#[async_trait]
impl BrokerTransport for SimTransport {
    async fn start(&self) -> Result<(), BrokerError> {
        Ok(())
    }

    async fn connect(&self) -> Result<(), BrokerError> {
        let mut state = self.broker.lock();
        state.tokens_seen.push(self.session_token);
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(BrokerError::ConnectFailed { code: -1 });
        }
        state.link_up = true;
        state.connect_count += 1;
        Ok(())
    }

    async fn subscribe(&self) -> Result<(), BrokerError> {
        let mut state = self.broker.lock();
        if state.subscribe_failures > 0 {
            state.subscribe_failures -= 1;
            return Err(BrokerError::SubscribeFailed { code: -1 });
        }
        state.subscribed = true;
        Ok(())
    }

    async fn query_positions(&self) -> Result<Vec<RawPositionRecord>, BrokerError> {
        let mut state = self.broker.lock();
        SimBroker::check_op(&mut state)?;

        let as_maps = state.report_as_maps;
        Ok(state
            .positions
            .iter()
            .map(|(sym, pos)| {
                if as_maps {
                    let mut map = serde_json::Map::new();
                    map.insert("stock_code".into(), serde_json::json!(sym));
                    map.insert("volume".into(), serde_json::json!(pos.volume));
                    map.insert("can_use_volume".into(), serde_json::json!(pos.usable));
                    map.insert("frozen_volume".into(), serde_json::json!(pos.frozen));
                    map.insert("avg_price".into(), serde_json::json!(pos.avg_cost));
                    map.insert("open_price".into(), serde_json::json!(pos.open_price));
                    RawPositionRecord::Map(map)
                } else {
                    RawPositionRecord::Attributes(PositionFields {
                        stock_code: sym.clone(),
                        volume: pos.volume,
                        can_use_volume: pos.usable,
                        frozen_volume: pos.frozen,
                        avg_price: pos.avg_cost,
                        open_price: pos.open_price,
                        market_value: Decimal::ZERO,
                        ..Default::default()
                    })
                }
            })
            .collect())
    }

    async fn query_asset(&self) -> Result<RawAssetRecord, BrokerError> {
        let mut state = self.broker.lock();
        SimBroker::check_op(&mut state)?;

        let market_value: Decimal = state
            .positions
            .iter()
            .map(|(sym, pos)| {
                let price = state
                    .last_prices
                    .get(&symbol::data_symbol(sym))
                    .copied()
                    .unwrap_or(pos.avg_cost);
                Decimal::from(pos.volume) * price
            })
            .sum();
        let total_asset = state.cash + state.frozen_cash + market_value;

        if state.report_as_maps {
            let mut map = serde_json::Map::new();
            map.insert("total_asset".into(), serde_json::json!(total_asset));
            map.insert("cash".into(), serde_json::json!(state.cash));
            map.insert("frozen_cash".into(), serde_json::json!(state.frozen_cash));
            map.insert("market_value".into(), serde_json::json!(market_value));
            Ok(RawAssetRecord::Map(map))
        } else {
            Ok(RawAssetRecord::Attributes(super::AssetFields {
                total_asset,
                cash: state.cash,
                frozen_cash: state.frozen_cash,
                market_value,
                profit: None,
                profit_ratio: None,
            }))
        }
    }

    async fn place_order(&self, ticket: OrderTicket<'_>) -> Result<i64, BrokerError> {
        let mut state = self.broker.lock();
        SimBroker::check_op(&mut state)?;

        let price = SimBroker::effective_price(&state, &ticket);
        let notional = Decimal::from(ticket.quantity) * price;

        match ticket.side {
            WireSide::Buy => {
                if notional > state.cash {
                    return Ok(-1);
                }
                state.cash -= notional;
                state.frozen_cash += notional;
            }
            WireSide::Sell => {
                let Some(pos) = state.positions.get_mut(ticket.symbol) else {
                    return Ok(-1);
                };
                if ticket.quantity > pos.usable {
                    return Ok(-1);
                }
                pos.usable -= ticket.quantity;
                pos.frozen += ticket.quantity;
            }
        }

        state.next_order_id += 1;
        let order_id = state.next_order_id;
        state.orders.push(SimOrder {
            record: RawOrderRecord {
                order_id,
                stock_code: ticket.symbol.to_string(),
                side: ticket.side,
                status: ORDER_REPORTED,
                volume: ticket.quantity,
                order_time: 0,
                price,
                price_mode: ticket.price_mode,
                traded_volume: 0,
                traded_price: Decimal::ZERO,
                strategy_name: ticket.strategy_tag.to_string(),
            },
        });
        Ok(order_id)
    }

    async fn cancel_order(&self, order_id: i64) -> Result<i32, BrokerError> {
        let mut state = self.broker.lock();
        SimBroker::check_op(&mut state)?;

        let Some(idx) = state
            .orders
            .iter()
            .position(|o| o.record.order_id == order_id)
        else {
            return Ok(-1);
        };
        let record = state.orders[idx].record.clone();
        if record.status != ORDER_REPORTED && record.status != ORDER_PARTIALLY_FILLED {
            return Ok(-1);
        }

        let remaining = record.volume - record.traded_volume;
        match record.side {
            WireSide::Buy => {
                let unfrozen = Decimal::from(remaining) * record.price;
                state.frozen_cash -= unfrozen;
                state.cash += unfrozen;
            }
            WireSide::Sell => {
                if let Some(pos) = state.positions.get_mut(&record.stock_code) {
                    pos.frozen -= remaining;
                    pos.usable += remaining;
                }
            }
        }
        state.orders[idx].record.status = ORDER_CANCELED;
        Ok(0)
    }

    async fn query_orders(
        &self,
        cancelable_only: bool,
    ) -> Result<Vec<RawOrderRecord>, BrokerError> {
        let mut state = self.broker.lock();
        SimBroker::check_op(&mut state)?;

        Ok(state
            .orders
            .iter()
            .map(|o| o.record.clone())
            .filter(|r| {
                !cancelable_only
                    || r.status == ORDER_REPORTED
                    || r.status == ORDER_PARTIALLY_FILLED
            })
            .collect())
    }

    async fn query_order(&self, order_id: i64) -> Result<Option<RawOrderRecord>, BrokerError> {
        let mut state = self.broker.lock();
        SimBroker::check_op(&mut state)?;

        Ok(state
            .orders
            .iter()
            .find(|o| o.record.order_id == order_id)
            .map(|o| o.record.clone()))
    }

    async fn last_price(&self, data_symbol: &str) -> Result<Decimal, BrokerError> {
        let mut state = self.broker.lock();
        SimBroker::check_op(&mut state)?;

        state
            .last_prices
            .get(data_symbol)
            .copied()
            .ok_or_else(|| BrokerError::NoMarketData {
                symbol: data_symbol.to_string(),
            })
    }

    async fn instrument_name(&self, data_symbol: &str) -> Result<String, BrokerError> {
        let mut state = self.broker.lock();
        SimBroker::check_op(&mut state)?;

        state
            .names
            .get(data_symbol)
            .cloned()
            .ok_or_else(|| BrokerError::NoMarketData {
                symbol: data_symbol.to_string(),
            })
    }
}

/// Mints [`SimTransport`] handles, one simulated account book per account id.
pub struct SimTransportFactory {
    brokers: Mutex<HashMap<String, Arc<SimBroker>>>,
    default_cash: Decimal,
}

impl SimTransportFactory {
    /// A factory seeding new accounts with one million in cash.
    #[must_use]
    pub fn new() -> Self {
        Self {
            brokers: Mutex::new(HashMap::new()),
            default_cash: Decimal::from(1_000_000),
        }
    }

    /// The account book for `account_id`, created on first use.
    #[must_use]
    pub fn broker(&self, account_id: &str) -> Arc<SimBroker> {
        #[allow(clippy::unwrap_used)] // lock poisoning is unrecoverable here
        let mut brokers = self.brokers.lock().unwrap();
        Arc::clone(
            brokers
                .entry(account_id.to_string())
                .or_insert_with(|| SimBroker::with_cash(self.default_cash)),
        )
    }

    /// Bind a pre-seeded account book to `account_id`.
    pub fn register(&self, account_id: &str, broker: Arc<SimBroker>) {
        #[allow(clippy::unwrap_used)] // lock poisoning is unrecoverable here
        self.brokers
            .lock()
            .unwrap()
            .insert(account_id.to_string(), broker);
    }
}

impl Default for SimTransportFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransportFactory for SimTransportFactory {
    async fn create(
        &self,
        account_id: &str,
        session_token: i64,
        callbacks: Arc<dyn BrokerCallbackSink>,
    ) -> Result<Box<dyn BrokerTransport>, BrokerError> {
        Ok(Box::new(SimTransport {
            broker: self.broker(account_id),
            session_token,
            callbacks,
        }))
    }
}

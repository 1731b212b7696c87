//! Order sizing and execution.
//!
//! Drives a [`BrokerSession`] through order submission with bounded retries.
//! The central resilience assumption: most submission failures are
//! connection-related, so every failed attempt forces a session reconnect
//! before the next try. Business-rule rejections arrive asynchronously via
//! the order-error callback and are only logged, never retried here.
//!
//! Every operation returns a structured outcome; nothing in this module
//! raises past the engine boundary except a broker fault outside any retry
//! loop (cancel and order queries), which the HTTP layer turns into a JSON
//! error.

pub mod sizing;

use rust_decimal::Decimal;

use crate::broker::{OrderTicket, WirePriceMode, WireSide};
use crate::error::GatewayError;
use crate::models::{
    CancelOutcome, OrderSide, OrderView, PositionFilter, PriceType, TradeOutcome,
    CANCELABLE_STATUSES,
};
use crate::session::BrokerSession;
use crate::symbol;

use sizing::LOT_SIZE;

/// Fixed repo instrument the idle-cash sweep buys.
const REPO_SYMBOL: &str = "131810.SZ";

/// Resolve a caller price-type code into the wire mode for `symbol`.
///
/// The best-five immediate-or-cancel mode splits by venue: Shanghai and
/// Shenzhen use different wire variants.
pub(crate) fn resolve_price_mode(code: u8, symbol: &str) -> Option<WirePriceMode> {
    Some(match PriceType::from_code(code)? {
        PriceType::Fixed => WirePriceMode::Fixed,
        PriceType::Latest => WirePriceMode::Latest,
        PriceType::BestFiveCancel => {
            if symbol.ends_with("SH") {
                WirePriceMode::BestFiveCancelShanghai
            } else {
                WirePriceMode::BestFiveCancelShenzhen
            }
        }
        PriceType::OwnSideBest => WirePriceMode::OwnSideBest,
        PriceType::CounterSideBest => WirePriceMode::CounterSideBest,
    })
}

impl BrokerSession {
    /// Strategy tag recorded against every order of this session.
    fn strategy_tag(&self) -> String {
        format!("quant_{}", self.strategy_code())
    }

    /// Buy a target percentage of total account equity.
    ///
    /// `value = total_asset * pct`, clamped to available cash, floored to a
    /// whole lot at `reference_price`. Sizing failures come back as
    /// structured outcomes, never errors.
    pub async fn buy_target_pct(
        &mut self,
        code: &str,
        reference_price: Decimal,
        pct: Decimal,
        price_type: u8,
    ) -> TradeOutcome {
        let symbol = symbol::market_symbol(code);
        let portfolio = match self.portfolio().await {
            Ok(portfolio) => portfolio,
            Err(e) => {
                return TradeOutcome::rejected(
                    symbol,
                    reference_price,
                    format!("failed to fetch account portfolio: {e}"),
                );
            }
        };

        let target_value = portfolio.total_asset * pct;
        let outcome = self
            .buy_sized(
                &symbol,
                reference_price,
                target_value,
                portfolio.cash,
                price_type,
            )
            .await;
        self.notifier().send_text(&outcome.message).await;
        outcome
    }

    /// Buy everything: target-percent buy with `pct = 1`.
    pub async fn buy_all_in(&mut self, code: &str, reference_price: Decimal) -> TradeOutcome {
        self.buy_target_pct(code, reference_price, Decimal::ONE, 0)
            .await
    }

    /// Buy an absolute share count, still clamped to available cash and
    /// floored to a lot boundary.
    pub async fn buy_shares(
        &mut self,
        code: &str,
        reference_price: Decimal,
        shares: i64,
        price_type: u8,
    ) -> TradeOutcome {
        let symbol = symbol::market_symbol(code);
        let portfolio = match self.portfolio().await {
            Ok(portfolio) => portfolio,
            Err(e) => {
                return TradeOutcome::rejected(
                    symbol,
                    reference_price,
                    format!("failed to fetch account portfolio: {e}"),
                );
            }
        };

        let mut shares = shares;
        let required = Decimal::from(shares) * reference_price;
        if required > portfolio.cash {
            tracing::info!(
                account_id = %self.account_id(),
                required = %required,
                available = %portfolio.cash,
                "requested shares exceed cash, clamping"
            );
            shares = sizing::lot_quantity(portfolio.cash, reference_price);
            if shares <= 0 {
                return TradeOutcome::rejected(
                    symbol,
                    reference_price,
                    format!(
                        "insufficient funds: required {required}, available {}",
                        portfolio.cash
                    ),
                );
            }
        }

        let quantity = sizing::floor_to_lot(shares);
        if quantity <= 0 {
            return TradeOutcome::rejected(
                symbol,
                reference_price,
                format!("order below one lot: {shares} shares"),
            );
        }

        self.submit_with_retry(&symbol, WireSide::Buy, quantity, reference_price, price_type)
            .await
    }

    /// Sell a fraction of the currently usable volume of a held position.
    ///
    /// Fails structurally when the symbol is not held or the floored
    /// quantity comes out below one lot. A position query that exhausts its
    /// retry budget propagates as an error.
    pub async fn sell_target_pct(
        &mut self,
        code: &str,
        reference_price: Decimal,
        pct: Decimal,
        price_type: u8,
    ) -> Result<TradeOutcome, GatewayError> {
        let symbol = symbol::market_symbol(code);
        tracing::info!(
            account_id = %self.account_id(),
            symbol = %symbol,
            price = %reference_price,
            pct = %pct,
            "sell requested"
        );

        let positions = self.positions(PositionFilter::All).await?;
        let Some(position) = positions.get(&symbol) else {
            return Ok(TradeOutcome::rejected(
                symbol,
                reference_price,
                format!("position not held: {code}"),
            ));
        };

        let quantity = sizing::sell_quantity(position.usable_volume, pct);
        let outcome = if quantity < LOT_SIZE {
            TradeOutcome::rejected_sized(
                &symbol,
                quantity,
                reference_price,
                format!("sell quantity below one lot: {quantity}"),
            )
        } else {
            self.submit_with_retry(&symbol, WireSide::Sell, quantity, reference_price, price_type)
                .await
        };
        self.notifier().send_text(&outcome.message).await;
        Ok(outcome)
    }

    /// Sell an absolute share count; zero or omitted shares default to the
    /// full usable volume of the position.
    pub async fn sell_shares(
        &mut self,
        code: &str,
        reference_price: Decimal,
        shares: Option<i64>,
        price_type: u8,
    ) -> Result<TradeOutcome, GatewayError> {
        let symbol = symbol::market_symbol(code);
        let positions = self.positions(PositionFilter::All).await?;
        let Some(position) = positions.get(&symbol) else {
            return Ok(TradeOutcome::rejected(
                symbol,
                reference_price,
                format!("position not held: {code}"),
            ));
        };

        let quantity = match shares {
            None | Some(0) => position.usable_volume,
            Some(n) => n,
        };
        tracing::info!(
            account_id = %self.account_id(),
            symbol = %symbol,
            quantity,
            "selling shares"
        );

        if quantity < LOT_SIZE {
            return Ok(TradeOutcome::rejected_sized(
                &symbol,
                quantity,
                reference_price,
                format!("sell quantity below one lot: {quantity}"),
            ));
        }

        Ok(self
            .submit_with_retry(&symbol, WireSide::Sell, quantity, reference_price, price_type)
            .await)
    }

    /// Sweep idle cash into the overnight reverse repo.
    pub async fn reverse_repo(&mut self) -> Result<TradeOutcome, GatewayError> {
        let portfolio = self.portfolio().await?;
        let quantity = sizing::repo_quantity(portfolio.cash);
        if quantity <= 0 {
            return Ok(TradeOutcome::rejected(
                REPO_SYMBOL,
                Decimal::ZERO,
                "idle cash below the minimum repo lot",
            ));
        }

        Ok(self
            .submit_with_retry(
                REPO_SYMBOL,
                WireSide::Buy,
                quantity,
                Decimal::ZERO,
                PriceType::Latest.code(),
            )
            .await)
    }

    /// Cancel one order by its broker handle.
    pub async fn cancel_order(&mut self, order_id: i64) -> Result<CancelOutcome, GatewayError> {
        let result = self.transport()?.cancel_order(order_id).await?;
        Ok(if result == 0 {
            CancelOutcome {
                success: true,
                order_id,
                message: format!("cancel accepted for order {order_id}"),
            }
        } else {
            CancelOutcome {
                success: false,
                order_id,
                message: format!("cancel refused for order {order_id}"),
            }
        })
    }

    /// Cancel every cancelable order on one side of the book.
    ///
    /// Only orders the broker still reports as reported or partially filled
    /// accept a cancel; each outcome is pushed to the notification sink.
    pub async fn cancel_all(&mut self, side: OrderSide) -> Result<Vec<CancelOutcome>, GatewayError> {
        let wire_side = match side {
            OrderSide::Buy => WireSide::Buy,
            OrderSide::Sell => WireSide::Sell,
        };

        let orders = self.transport()?.query_orders(true).await?;
        let mut outcomes = Vec::new();
        for record in orders {
            if record.side != wire_side || !CANCELABLE_STATUSES.contains(&record.status) {
                continue;
            }
            tracing::info!(
                account_id = %self.account_id(),
                order_id = record.order_id,
                symbol = %record.stock_code,
                "canceling order"
            );
            let result = self.transport()?.cancel_order(record.order_id).await?;
            let success = result == 0;
            self.notifier()
                .send_text(&format!(
                    "cancel {side} order {} for {}: {}",
                    record.order_id,
                    self.account_id(),
                    if success { "accepted" } else { "refused" }
                ))
                .await;
            outcomes.push(CancelOutcome {
                success,
                order_id: record.order_id,
                message: format!(
                    "cancel {} for order {}",
                    if success { "accepted" } else { "refused" },
                    record.order_id
                ),
            });
        }
        Ok(outcomes)
    }

    /// All orders of this session, optionally only cancelable ones.
    pub async fn orders(&mut self, cancelable_only: bool) -> Result<Vec<OrderView>, GatewayError> {
        let records = self.transport()?.query_orders(cancelable_only).await?;
        Ok(records.iter().map(|r| r.to_view()).collect())
    }

    /// One order by its broker handle.
    pub async fn order(&mut self, order_id: i64) -> Result<Option<OrderView>, GatewayError> {
        let record = self.transport()?.query_order(order_id).await?;
        Ok(record.map(|r| r.to_view()))
    }

    /// Shared buy path: clamp to cash, floor to a lot, submit.
    async fn buy_sized(
        &mut self,
        symbol: &str,
        reference_price: Decimal,
        target_value: Decimal,
        cash: Decimal,
        price_type: u8,
    ) -> TradeOutcome {
        let value = sizing::clamp_to_cash(target_value, cash);
        let quantity = sizing::lot_quantity(value, reference_price);
        if quantity <= 0 {
            let message = if target_value > cash {
                format!("insufficient funds: required {target_value}, available {cash}")
            } else {
                format!(
                    "insufficient funds for one lot: need {}, available {cash}",
                    reference_price * Decimal::from(LOT_SIZE)
                )
            };
            tracing::info!(
                account_id = %self.account_id(),
                symbol = %symbol,
                target_value = %target_value,
                cash = %cash,
                "buy sizing failed"
            );
            return TradeOutcome::rejected(symbol, reference_price, message);
        }

        self.submit_with_retry(symbol, WireSide::Buy, quantity, reference_price, price_type)
            .await
    }

    /// Submit one order with bounded retries.
    ///
    /// A transport error forces a reconnect before the next attempt; a
    /// sentinel handle from the broker is a synchronous rejection and is
    /// not retried. Exhausted retries come back as a structured failure.
    async fn submit_with_retry(
        &mut self,
        symbol: &str,
        side: WireSide,
        quantity: i64,
        reference_price: Decimal,
        price_type: u8,
    ) -> TradeOutcome {
        let Some(price_mode) = resolve_price_mode(price_type, symbol) else {
            return TradeOutcome::rejected_sized(
                symbol,
                quantity,
                reference_price,
                format!("unsupported price type {price_type}"),
            );
        };

        let side_label = match side {
            WireSide::Buy => "buy",
            WireSide::Sell => "sell",
        };
        let strategy_tag = self.strategy_tag();
        let policy = crate::broker::RetryPolicy::SUBMIT;
        tracing::info!(
            account_id = %self.account_id(),
            symbol = %symbol,
            quantity,
            price = %reference_price,
            price_mode = ?price_mode,
            strategy = %strategy_tag,
            "submitting {side_label} order"
        );

        let mut last_err = String::new();
        for attempt in 1..=policy.max_attempts {
            let ticket = OrderTicket {
                symbol,
                side,
                quantity,
                price_mode,
                price: reference_price,
                strategy_tag: &strategy_tag,
            };
            let placed = match self.transport() {
                Ok(transport) => transport.place_order(ticket).await,
                Err(e) => Err(e),
            };

            match placed {
                Ok(order_id) if order_id > 0 => {
                    return TradeOutcome::accepted(
                        symbol,
                        quantity,
                        reference_price,
                        order_id,
                        format!(
                            "{side_label} order placed: {symbol} {quantity} shares @ {reference_price}, order id {order_id}"
                        ),
                    );
                }
                Ok(_sentinel) => {
                    return TradeOutcome::rejected_sized(
                        symbol,
                        quantity,
                        reference_price,
                        format!(
                            "{side_label} order refused: {symbol} {quantity} shares @ {reference_price}"
                        ),
                    );
                }
                Err(e) => {
                    last_err = e.to_string();
                    let notice = format!(
                        "{} order retry {attempt} broker link error",
                        self.account_id()
                    );
                    self.notifier().send_text(&notice).await;
                    tracing::error!(
                        account_id = %self.account_id(),
                        symbol = %symbol,
                        attempt,
                        error = %e,
                        "order submission failed"
                    );
                    self.connect().await;
                }
            }
        }

        let outcome = TradeOutcome::rejected_sized(
            symbol,
            quantity,
            reference_price,
            format!(
                "submission failed after {} attempts: {last_err}",
                policy.max_attempts
            ),
        );
        self.notifier().send_text(&outcome.message).await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal_macros::dec;
    use test_case::test_case;

    use crate::broker::sim::{SimBroker, SimTransportFactory};
    use crate::broker::TransportFactory;
    use crate::models::{ORDER_CANCELED, ORDER_REPORTED};
    use crate::notify::NoopNotifier;
    use crate::session::SessionConfig;

    use super::*;

    #[test_case(0, "600000.SH", Some(WirePriceMode::Fixed))]
    #[test_case(1, "600000.SH", Some(WirePriceMode::Latest))]
    #[test_case(2, "600000.SH", Some(WirePriceMode::BestFiveCancelShanghai))]
    #[test_case(2, "000001.SZ", Some(WirePriceMode::BestFiveCancelShenzhen))]
    #[test_case(3, "600000.SH", Some(WirePriceMode::OwnSideBest))]
    #[test_case(5, "000001.SZ", Some(WirePriceMode::CounterSideBest))]
    #[test_case(4, "600000.SH", None)]
    fn price_mode_resolution(code: u8, symbol: &str, expected: Option<WirePriceMode>) {
        assert_eq!(resolve_price_mode(code, symbol), expected);
    }

    async fn connected_session(
        factory: &Arc<SimTransportFactory>,
        account_id: &str,
    ) -> BrokerSession {
        let mut session = BrokerSession::new(
            SessionConfig {
                account_id: account_id.to_string(),
                strategy_code: 7,
                display_name: "test".to_string(),
            },
            Arc::clone(factory) as Arc<dyn TransportFactory>,
            Arc::new(NoopNotifier),
        );
        session.try_establish().await.unwrap();
        session
    }

    /// Broker with the given cash and enough position value to reach a
    /// round total equity.
    fn account_with(
        factory: &SimTransportFactory,
        account_id: &str,
        cash: Decimal,
        position_shares: i64,
    ) -> Arc<SimBroker> {
        let broker = SimBroker::with_cash(cash);
        if position_shares > 0 {
            broker.seed_position("000001.SZ", position_shares, position_shares, dec!(10.00));
        }
        factory.register(account_id, Arc::clone(&broker));
        broker
    }

    #[tokio::test]
    async fn buy_target_pct_sizes_from_equity() {
        // pct 0.1, total 100k (50k cash + 50k positions), price 10
        // -> value 10k <= cash -> 1000 shares.
        let factory = Arc::new(SimTransportFactory::new());
        let broker = account_with(&factory, "1001", dec!(50000), 5000);
        let mut session = connected_session(&factory, "1001").await;

        let outcome = session
            .buy_target_pct("600000", dec!(10.00), dec!(0.1), 0)
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.order_quantity, 1000);
        assert_eq!(outcome.notional_value, dec!(10000.00));
        assert_eq!(outcome.symbol, "600000.SH");

        let orders = broker.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].stock_code, "600000.SH");
        assert_eq!(orders[0].volume, 1000);
    }

    #[tokio::test]
    async fn buy_target_pct_clamps_to_cash() {
        // Same request with only 5k cash: value clamps to 5k -> 500 shares.
        let factory = Arc::new(SimTransportFactory::new());
        account_with(&factory, "1001", dec!(5000), 9500);
        let mut session = connected_session(&factory, "1001").await;

        let outcome = session
            .buy_target_pct("600000", dec!(10.00), dec!(0.1), 0)
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.order_quantity, 500);
        assert_eq!(outcome.notional_value, dec!(5000.00));
    }

    #[tokio::test]
    async fn buy_with_no_cash_is_insufficient_funds() {
        let factory = Arc::new(SimTransportFactory::new());
        account_with(&factory, "1001", dec!(50), 0);
        let mut session = connected_session(&factory, "1001").await;

        let outcome = session
            .buy_target_pct("600000", dec!(10.00), dec!(0.5), 0)
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.order_quantity, 0);
        assert!(outcome.message.contains("insufficient funds"));
        assert!(outcome.message.contains("available"));
    }

    #[tokio::test]
    async fn sell_target_pct_floors_odd_volume() {
        // Scenario: usable 250, pct 1.0 -> 200 shares, not 250.
        let factory = Arc::new(SimTransportFactory::new());
        let broker = factory.broker("1001");
        broker.seed_position("600000.SH", 250, 250, dec!(10.00));
        let mut session = connected_session(&factory, "1001").await;

        let outcome = session
            .sell_target_pct("600000", dec!(10.00), dec!(1.0), 0)
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.order_quantity, 200);

        let orders = broker.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].volume, 200);
        assert_eq!(orders[0].side, WireSide::Sell);
    }

    #[tokio::test]
    async fn sell_unheld_symbol_is_structured_failure() {
        let factory = Arc::new(SimTransportFactory::new());
        let mut session = connected_session(&factory, "1001").await;

        let outcome = session
            .sell_target_pct("600000", dec!(10.00), dec!(1.0), 0)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("not held"));
    }

    #[tokio::test]
    async fn sell_below_one_lot_is_structured_failure() {
        let factory = Arc::new(SimTransportFactory::new());
        factory
            .broker("1001")
            .seed_position("600000.SH", 90, 90, dec!(10.00));
        let mut session = connected_session(&factory, "1001").await;

        let outcome = session
            .sell_target_pct("600000", dec!(10.00), dec!(1.0), 0)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("below one lot"));
    }

    #[tokio::test]
    async fn sell_shares_defaults_to_full_usable_volume() {
        let factory = Arc::new(SimTransportFactory::new());
        let broker = factory.broker("1001");
        broker.seed_position("600000.SH", 250, 250, dec!(10.00));
        let mut session = connected_session(&factory, "1001").await;

        let outcome = session
            .sell_shares("600000", dec!(10.00), None, 0)
            .await
            .unwrap();
        assert!(outcome.success);
        // Explicit share counts are not floored; the full 250 go out.
        assert_eq!(outcome.order_quantity, 250);
    }

    #[tokio::test]
    async fn unsupported_price_type_is_structured_failure() {
        let factory = Arc::new(SimTransportFactory::new());
        factory
            .broker("1001")
            .seed_position("600000.SH", 1000, 1000, dec!(10.00));
        let mut session = connected_session(&factory, "1001").await;

        let outcome = session
            .sell_target_pct("600000", dec!(10.00), dec!(1.0), 4)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("unsupported price type 4"));
    }

    #[tokio::test]
    async fn submission_recovers_after_transport_error() {
        let factory = Arc::new(SimTransportFactory::new());
        let broker = factory.broker("1001");
        let mut session = connected_session(&factory, "1001").await;
        let connects_before = broker.connect_count();

        broker.fail_operations(1);
        let outcome = session
            .submit_with_retry("600000.SH", WireSide::Buy, 100, dec!(10.00), 0)
            .await;
        assert!(outcome.success);
        // The failed attempt forced exactly one reconnect.
        assert_eq!(broker.connect_count(), connects_before + 1);
    }

    #[tokio::test]
    async fn submission_exhaustion_is_structured_failure() {
        let factory = Arc::new(SimTransportFactory::new());
        let broker = factory.broker("1001");
        let mut session = connected_session(&factory, "1001").await;
        let connects_before = broker.connect_count();

        // Every submission attempt dies; reconnects still succeed, so the
        // loop burns its full budget and reports a structured failure.
        broker.fail_operations(3);
        let outcome = session
            .submit_with_retry("600000.SH", WireSide::Buy, 100, dec!(10.00), 0)
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.order_quantity, 100);
        assert!(outcome.message.contains("after 3 attempts"));
        assert_eq!(broker.connect_count(), connects_before + 3);
    }

    #[tokio::test]
    async fn sentinel_handle_is_rejected_without_retry() {
        let factory = Arc::new(SimTransportFactory::new());
        let broker = factory.broker("1001");
        let mut session = connected_session(&factory, "1001").await;
        let connects_before = broker.connect_count();

        // Selling an unheld symbol makes the sim refuse synchronously.
        let outcome = session
            .submit_with_retry("600000.SH", WireSide::Sell, 100, dec!(10.00), 0)
            .await;
        assert!(!outcome.success);
        assert!(outcome.message.contains("refused"));
        // A synchronous rejection is not connection-related: no reconnect.
        assert_eq!(broker.connect_count(), connects_before);
    }

    #[tokio::test]
    async fn reverse_repo_sweeps_idle_cash() {
        let factory = Arc::new(SimTransportFactory::new());
        let broker = factory.broker("1001");
        let mut session = connected_session(&factory, "1001").await;

        let outcome = session.reverse_repo().await.unwrap();
        assert!(outcome.success);
        // 1_000_000 of cash -> floor(1_000_000 / 1000) * 10 = 10_000 units.
        assert_eq!(outcome.order_quantity, 10_000);

        let orders = broker.orders();
        assert_eq!(orders[0].stock_code, REPO_SYMBOL);
        assert_eq!(orders[0].price_mode, WirePriceMode::Latest);
    }

    #[tokio::test]
    async fn cancel_all_filters_by_side() {
        let factory = Arc::new(SimTransportFactory::new());
        let broker = factory.broker("1001");
        broker.seed_position("600000.SH", 1000, 1000, dec!(10.00));
        let mut session = connected_session(&factory, "1001").await;

        let buy = session.buy_shares("000001", dec!(10.00), 500, 0).await;
        assert!(buy.success);
        let sell = session
            .sell_shares("600000", dec!(10.00), Some(200), 0)
            .await
            .unwrap();
        assert!(sell.success);

        let canceled = session.cancel_all(OrderSide::Sell).await.unwrap();
        assert_eq!(canceled.len(), 1);
        assert!(canceled[0].success);

        let orders = broker.orders();
        let sell_order = orders.iter().find(|o| o.side == WireSide::Sell).unwrap();
        let buy_order = orders.iter().find(|o| o.side == WireSide::Buy).unwrap();
        assert_eq!(sell_order.status, ORDER_CANCELED);
        assert_eq!(buy_order.status, ORDER_REPORTED);
    }

    #[tokio::test]
    async fn order_queries_return_views() {
        let factory = Arc::new(SimTransportFactory::new());
        let mut session = connected_session(&factory, "1001").await;

        let placed = session.buy_shares("600000", dec!(10.00), 500, 0).await;
        assert!(placed.success);
        let order_id = placed.order_id.unwrap();

        let views = session.orders(false).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].status_label, "reported");
        assert_eq!(views[0].strategy_name, "quant_7");

        let single = session.order(order_id).await.unwrap().unwrap();
        assert_eq!(single.order_id, order_id);
        assert!(session.order(order_id + 99).await.unwrap().is_none());
    }
}

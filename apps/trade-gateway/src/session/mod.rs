//! Broker session lifecycle and the position/portfolio query layer.
//!
//! One [`BrokerSession`] owns one authenticated connection to a single
//! brokerage account. The session is the only holder of the transport
//! handle; on reconnect the handle is replaced, never shared, under a
//! session token that is incremented before every attempt so a token from a
//! prior attempt can never collide with a still-live handle.
//!
//! State machine:
//!
//! ```text
//! Disconnected --connect--> Connecting --handshake ok--> Connected
//!     --subscribe ok--> Subscribed
//! ```
//!
//! Any transport error demotes the session to `Failed` and the bounded
//! reconnect loop runs again. Reconnection is pulled lazily: the disconnect
//! callback only records the loss, and the next operation that needs the
//! link performs the reconnect.

mod callbacks;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::broker::{
    BrokerCallbackSink, BrokerError, BrokerTransport, RetryPolicy, TransportFactory,
};
use crate::error::GatewayError;
use crate::models::{BoardGroup, Portfolio, Position, PositionFilter, PositionReport};
use crate::notify::Notifier;
use crate::symbol;

pub use callbacks::LoggingCallbackSink;

/// Where a session stands in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No live transport handle.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Handshake done, account not yet subscribed.
    Connected,
    /// Fully usable.
    Subscribed,
    /// Last attempt ended in a transport error.
    Failed,
}

/// Static identity of one brokerage account.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique numeric account id.
    pub account_id: String,
    /// Strategy code; also seeds the session token.
    pub strategy_code: i64,
    /// Human-facing account name.
    pub display_name: String,
}

/// One authenticated connection to a brokerage account.
pub struct BrokerSession {
    account_id: String,
    strategy_code: i64,
    display_name: String,
    session_token: i64,
    state: ConnectionState,
    transport: Option<Box<dyn BrokerTransport>>,
    factory: Arc<dyn TransportFactory>,
    callbacks: Arc<dyn BrokerCallbackSink>,
    link_lost: Arc<AtomicBool>,
    notifier: Arc<dyn Notifier>,
}

impl BrokerSession {
    /// Create a session; it stays `Disconnected` until [`connect`] runs.
    ///
    /// The session token is seeded as
    /// `strategy_code * 1_000_000_000 + account_id` and incremented before
    /// every connection attempt.
    ///
    /// [`connect`]: Self::connect
    #[must_use]
    pub fn new(
        config: SessionConfig,
        factory: Arc<dyn TransportFactory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let account_number: i64 = config.account_id.parse().unwrap_or_default();
        let link_lost = Arc::new(AtomicBool::new(false));
        let callbacks = Arc::new(LoggingCallbackSink::with_link_flag(
            &config.account_id,
            Arc::clone(&link_lost),
        ));
        Self {
            session_token: config.strategy_code * 1_000_000_000 + account_number,
            account_id: config.account_id,
            strategy_code: config.strategy_code,
            display_name: config.display_name,
            state: ConnectionState::Disconnected,
            transport: None,
            factory,
            callbacks,
            link_lost,
            notifier,
        }
    }

    /// The account this session trades.
    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Human-facing account name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Strategy code configured for this session.
    #[must_use]
    pub const fn strategy_code(&self) -> i64 {
        self.strategy_code
    }

    /// Token distinguishing the current connection attempt.
    #[must_use]
    pub const fn session_token(&self) -> i64 {
        self.session_token
    }

    /// Current lifecycle state; a link-lost push demotes a subscribed
    /// session to `Disconnected` until the next reconnect.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        if self.state == ConnectionState::Subscribed && self.link_lost.load(Ordering::Relaxed) {
            ConnectionState::Disconnected
        } else {
            self.state
        }
    }

    /// Establish (or re-establish) the broker link.
    ///
    /// Bounded at 3 attempts with a 1-second pause. A subscription failure
    /// after a successful handshake is fatal immediately: an unsubscribed
    /// session cannot trade safely. On exhaustion a notification is emitted
    /// and the process terminates - a trading process with no working broker
    /// link must not continue silently.
    pub async fn connect(&mut self) {
        if let Err(e) = self.try_establish().await {
            let msg = format!(
                "failed to connect broker link for {} after {} attempts: {e}",
                self.account_id,
                RetryPolicy::CONNECT.max_attempts
            );
            self.notifier.send_text(&msg).await;
            tracing::error!(
                account_id = %self.account_id,
                error = %e,
                "broker link unusable, terminating"
            );
            std::process::exit(1);
        }
    }

    /// The bounded connect loop, separated from the fatal exit for tests.
    pub(crate) async fn try_establish(&mut self) -> Result<(), BrokerError> {
        let policy = RetryPolicy::CONNECT;
        let mut last_err = BrokerError::transport("no attempt made");

        for attempt in 1..=policy.max_attempts {
            self.state = ConnectionState::Connecting;
            self.session_token += 1;
            tracing::info!(
                account_id = %self.account_id,
                session_token = self.session_token,
                attempt,
                "connecting broker link"
            );

            match self.connect_once().await {
                Ok(()) => {
                    self.link_lost.store(false, Ordering::Relaxed);
                    self.state = ConnectionState::Subscribed;
                    tracing::info!(
                        account_id = %self.account_id,
                        session_token = self.session_token,
                        "broker link subscribed"
                    );
                    return Ok(());
                }
                Err(e @ BrokerError::SubscribeFailed { .. }) => {
                    // Subscription refused on a working handshake: retrying
                    // will not help, surface immediately.
                    self.state = ConnectionState::Failed;
                    tracing::error!(account_id = %self.account_id, error = %e, "account subscription refused");
                    return Err(e);
                }
                Err(e) => {
                    self.state = ConnectionState::Failed;
                    tracing::warn!(
                        account_id = %self.account_id,
                        attempt,
                        error = %e,
                        "broker connect attempt failed"
                    );
                    last_err = e;
                }
            }

            policy.wait().await;
        }

        Err(last_err)
    }

    /// One connection attempt: fresh handle, start worker, handshake,
    /// subscribe. The old handle is dropped only once the new one works.
    async fn connect_once(&mut self) -> Result<(), BrokerError> {
        let transport = self
            .factory
            .create(
                &self.account_id,
                self.session_token,
                Arc::clone(&self.callbacks),
            )
            .await?;
        transport.start().await?;
        transport.connect().await?;
        self.state = ConnectionState::Connected;
        transport.subscribe().await?;
        self.transport = Some(transport);
        Ok(())
    }

    /// The live transport handle, if any.
    pub(crate) fn transport(&self) -> Result<&dyn BrokerTransport, BrokerError> {
        self.transport
            .as_deref()
            .ok_or_else(|| BrokerError::transport("no live transport handle"))
    }

    /// Notification sink shared with the execution engine.
    pub(crate) fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// Account snapshot, re-fetched from the broker on every call.
    ///
    /// Retries at most twice, reconnecting the link after each failure.
    pub async fn portfolio(&mut self) -> Result<Portfolio, GatewayError> {
        let policy = RetryPolicy::QUERY_ASSET;
        let mut last_err = String::new();

        for _attempt in 1..=policy.max_attempts {
            match self.query_asset_once().await {
                Ok(portfolio) => return Ok(portfolio),
                Err(e) => {
                    tracing::warn!(account_id = %self.account_id, error = %e, "asset query failed");
                    last_err = e.to_string();
                    self.connect().await;
                }
            }
        }

        Err(GatewayError::LinkExhausted {
            attempts: policy.max_attempts,
            message: last_err,
        })
    }

    async fn query_asset_once(&self) -> Result<Portfolio, BrokerError> {
        Ok(self.transport()?.query_asset().await?.normalize())
    }

    /// All positions passing `filter`, keyed by venue symbol.
    ///
    /// Re-fetched from the broker on every call; three attempts with a
    /// 1-second pause and a reconnect between them.
    pub async fn positions(
        &mut self,
        filter: PositionFilter,
    ) -> Result<BTreeMap<String, Position>, GatewayError> {
        let policy = RetryPolicy::QUERY_POSITIONS;
        let mut last_err = String::new();

        for _attempt in 1..=policy.max_attempts {
            match self.query_positions_once().await {
                Ok(records) => {
                    let mut held = BTreeMap::new();
                    for position in records {
                        if filter.admits(position.volume, position.usable_volume) {
                            held.insert(position.symbol.clone(), position);
                        }
                    }
                    return Ok(held);
                }
                Err(e) => {
                    tracing::warn!(account_id = %self.account_id, error = %e, "position query failed");
                    last_err = e.to_string();
                    policy.wait().await;
                    self.connect().await;
                }
            }
        }

        Err(GatewayError::LinkExhausted {
            attempts: policy.max_attempts,
            message: last_err,
        })
    }

    async fn query_positions_once(&self) -> Result<Vec<Position>, BrokerError> {
        let records = self.transport()?.query_positions().await?;
        Ok(records.iter().map(|r| r.normalize()).collect())
    }

    /// Enriched position rows with live prices and display names.
    ///
    /// The live last-trade price falls back to the average cost when the
    /// data feed has nothing for the symbol, so the reported profit is
    /// deterministically zero in the fallback case, never an error.
    pub async fn position_report(&mut self) -> Result<Vec<PositionReport>, GatewayError> {
        let positions = self.positions(PositionFilter::All).await?;
        let transport = self.transport()?;

        let mut rows = Vec::with_capacity(positions.len());
        for position in positions.values() {
            let data_symbol = symbol::data_symbol(&position.symbol);
            let current_price = match transport.last_price(&data_symbol).await {
                Ok(price) => price,
                Err(_) => position.avg_cost,
            };
            let name = transport
                .instrument_name(&data_symbol)
                .await
                .unwrap_or_else(|_| position.symbol.clone());

            let volume = Decimal::from(position.volume);
            let cost_value = if position.avg_cost > Decimal::ZERO {
                volume * position.avg_cost
            } else {
                Decimal::ZERO
            };
            let current_value = if current_price > Decimal::ZERO {
                volume * current_price
            } else {
                position.market_value
            };
            let profit = if cost_value > Decimal::ZERO {
                current_value - cost_value
            } else {
                Decimal::ZERO
            };
            let profit_ratio = if cost_value > Decimal::ZERO {
                profit / cost_value * Decimal::ONE_HUNDRED
            } else {
                Decimal::ZERO
            };

            rows.push(PositionReport {
                symbol: position.symbol.clone(),
                name,
                volume: position.volume,
                can_use_volume: position.usable_volume,
                frozen_volume: position.frozen_volume,
                market_value: position.market_value,
                avg_price: position.avg_cost,
                open_price: position.open_price,
                current_price,
                profit,
                profit_ratio,
            });
        }

        Ok(rows)
    }

    /// Venue symbols of sellable positions, optionally sliced by board.
    ///
    /// Repo collateral placeholders (`SHR` prefix) are always excluded.
    pub async fn held_symbols(
        &mut self,
        group: Option<BoardGroup>,
    ) -> Result<Vec<String>, GatewayError> {
        let positions = self.positions(PositionFilter::Usable).await?;
        Ok(positions
            .keys()
            .filter(|s| !s.starts_with("SHR"))
            .filter(|s| group.is_none_or(|g| g.matches(s)))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::broker::sim::SimTransportFactory;
    use crate::notify::NoopNotifier;

    use super::*;

    fn config() -> SessionConfig {
        SessionConfig {
            account_id: "99007036".to_string(),
            strategy_code: 7,
            display_name: "primary".to_string(),
        }
    }

    fn session(factory: &Arc<SimTransportFactory>) -> BrokerSession {
        BrokerSession::new(
            config(),
            Arc::clone(factory) as Arc<dyn TransportFactory>,
            Arc::new(NoopNotifier),
        )
    }

    #[tokio::test]
    async fn connect_reaches_subscribed() {
        let factory = Arc::new(SimTransportFactory::new());
        let mut session = session(&factory);
        assert_eq!(session.state(), ConnectionState::Disconnected);

        session.try_establish().await.unwrap();
        assert_eq!(session.state(), ConnectionState::Subscribed);
    }

    #[tokio::test(start_paused = true)]
    async fn session_token_is_fresh_per_attempt() {
        let factory = Arc::new(SimTransportFactory::new());
        let broker = factory.broker("99007036");
        broker.fail_connects(2);

        let mut session = session(&factory);
        let base = session.session_token();
        session.try_establish().await.unwrap();

        // Two refused handshakes plus the successful one, each under its
        // own token.
        assert_eq!(
            broker.tokens_seen(),
            vec![base + 1, base + 2, base + 3]
        );
        assert_eq!(session.session_token(), base + 3);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_gives_up_after_three_attempts() {
        let factory = Arc::new(SimTransportFactory::new());
        let broker = factory.broker("99007036");
        broker.fail_connects(10);

        let mut session = session(&factory);
        let err = session.try_establish().await.unwrap_err();
        assert!(matches!(err, BrokerError::ConnectFailed { .. }));
        assert_eq!(broker.tokens_seen().len(), 3);
        assert_eq!(session.state(), ConnectionState::Failed);
    }

    #[tokio::test]
    async fn subscribe_failure_is_immediately_fatal() {
        let factory = Arc::new(SimTransportFactory::new());
        let broker = factory.broker("99007036");
        broker.fail_subscribes(1);

        let mut session = session(&factory);
        let err = session.try_establish().await.unwrap_err();
        assert!(matches!(err, BrokerError::SubscribeFailed { .. }));
        // No second handshake after a refused subscription.
        assert_eq!(broker.tokens_seen().len(), 1);
    }

    #[tokio::test]
    async fn portfolio_recovers_through_reconnect() {
        let factory = Arc::new(SimTransportFactory::new());
        let broker = factory.broker("99007036");
        let mut session = session(&factory);
        session.try_establish().await.unwrap();

        broker.fail_operations(1);
        let portfolio = session.portfolio().await.unwrap();
        assert_eq!(portfolio.cash, dec!(1000000));
        // The failed query forced one reconnect.
        assert_eq!(broker.connect_count(), 2);
    }

    #[tokio::test]
    async fn position_filters_apply() {
        let factory = Arc::new(SimTransportFactory::new());
        let broker = factory.broker("99007036");
        broker.seed_position("600000.SH", 1000, 600, dec!(10.00));
        broker.seed_position("000001.SZ", 500, 0, dec!(12.00));

        let mut session = session(&factory);
        session.try_establish().await.unwrap();

        let usable = session.positions(PositionFilter::Usable).await.unwrap();
        assert_eq!(usable.keys().collect::<Vec<_>>(), vec!["600000.SH"]);

        let pending = session.positions(PositionFilter::Pending).await.unwrap();
        assert_eq!(pending.keys().collect::<Vec<_>>(), vec!["000001.SZ"]);

        let held = session.positions(PositionFilter::Held).await.unwrap();
        assert_eq!(held.len(), 2);
    }

    #[tokio::test]
    async fn position_report_falls_back_to_avg_cost() {
        let factory = Arc::new(SimTransportFactory::new());
        let broker = factory.broker("99007036");
        broker.seed_position("600000.SH", 1000, 1000, dec!(10.00));
        // No last price seeded: profit must be deterministically zero.

        let mut session = session(&factory);
        session.try_establish().await.unwrap();

        let rows = session.position_report().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].current_price, dec!(10.00));
        assert_eq!(rows[0].profit, dec!(0));
        assert_eq!(rows[0].name, "600000.SH");
    }

    #[tokio::test]
    async fn position_report_uses_live_price() {
        let factory = Arc::new(SimTransportFactory::new());
        let broker = factory.broker("99007036");
        broker.seed_position("600000.SH", 1000, 1000, dec!(10.00));
        broker.set_last_price("600000.SS", dec!(11.00));
        broker.set_instrument_name("600000.SS", "SPD Bank");

        let mut session = session(&factory);
        session.try_establish().await.unwrap();

        let rows = session.position_report().await.unwrap();
        assert_eq!(rows[0].current_price, dec!(11.00));
        assert_eq!(rows[0].profit, dec!(1000.00));
        assert_eq!(rows[0].profit_ratio, dec!(10));
        assert_eq!(rows[0].name, "SPD Bank");
    }

    #[tokio::test]
    async fn map_shaped_records_read_the_same() {
        let factory = Arc::new(SimTransportFactory::new());
        let broker = factory.broker("99007036");
        broker.seed_position("600000.SH", 1000, 600, dec!(10.00));

        let mut session = session(&factory);
        session.try_establish().await.unwrap();
        let from_attrs = session.positions(PositionFilter::All).await.unwrap();

        broker.report_as_maps(true);
        let from_maps = session.positions(PositionFilter::All).await.unwrap();

        assert_eq!(from_attrs, from_maps);
    }

    #[tokio::test]
    async fn held_symbols_slices_by_board() {
        let factory = Arc::new(SimTransportFactory::new());
        let broker = factory.broker("99007036");
        broker.seed_position("600000.SH", 1000, 1000, dec!(10.00));
        broker.seed_position("300750.SZ", 500, 500, dec!(100.00));
        broker.seed_position("830799.BJ", 300, 300, dec!(5.00));

        let mut session = session(&factory);
        session.try_establish().await.unwrap();

        let all = session.held_symbols(None).await.unwrap();
        assert_eq!(all.len(), 3);

        let chinext = session
            .held_symbols(Some(BoardGroup::ChiNext))
            .await
            .unwrap();
        assert_eq!(chinext, vec!["300750.SZ"]);

        let beijing = session
            .held_symbols(Some(BoardGroup::Beijing))
            .await
            .unwrap();
        assert_eq!(beijing, vec!["830799.BJ"]);
    }
}

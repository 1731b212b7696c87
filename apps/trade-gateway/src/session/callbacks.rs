//! Logging sink for the broker's push callbacks.
//!
//! Callbacks arrive on the broker's own channel and must never block. They
//! are logged and, for the disconnect notice, recorded in a shared flag -
//! reconnection itself is pulled lazily by the next operation that needs
//! the link.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::broker::{
    AccountStatusNotice, BrokerCallbackSink, CancelErrorNotice, OrderErrorNotice, RawAssetRecord,
    RawOrderRecord, RawPositionRecord, TradeUpdate,
};
use crate::models::order_status_label;

/// Callback sink that logs every push under its account id.
pub struct LoggingCallbackSink {
    account_id: String,
    link_lost: Arc<AtomicBool>,
}

impl LoggingCallbackSink {
    /// A sink with its own link-lost flag.
    #[must_use]
    pub fn new(account_id: &str) -> Self {
        Self::with_link_flag(account_id, Arc::new(AtomicBool::new(false)))
    }

    /// A sink sharing the session's link-lost flag.
    #[must_use]
    pub fn with_link_flag(account_id: &str, link_lost: Arc<AtomicBool>) -> Self {
        Self {
            account_id: account_id.to_string(),
            link_lost,
        }
    }
}

impl BrokerCallbackSink for LoggingCallbackSink {
    fn on_disconnected(&self) {
        self.link_lost.store(true, Ordering::Relaxed);
        tracing::warn!(
            account_id = %self.account_id,
            "broker link lost; will reconnect on next use"
        );
    }

    fn on_order_update(&self, order: &RawOrderRecord) {
        tracing::info!(
            account_id = %self.account_id,
            symbol = %order.stock_code,
            order_id = order.order_id,
            status = order.status,
            status_label = order_status_label(order.status),
            "order update"
        );
    }

    fn on_trade_update(&self, trade: &TradeUpdate) {
        tracing::info!(
            account_id = %self.account_id,
            symbol = %trade.symbol,
            order_id = trade.order_id,
            traded_volume = trade.traded_volume,
            traded_price = %trade.traded_price,
            "trade update"
        );
    }

    fn on_position_update(&self, position: &RawPositionRecord) {
        tracing::info!(
            account_id = %self.account_id,
            symbol = %position.symbol(),
            "position update"
        );
    }

    fn on_asset_update(&self, asset: &RawAssetRecord) {
        let portfolio = asset.normalize();
        tracing::info!(
            account_id = %self.account_id,
            cash = %portfolio.cash,
            total_asset = %portfolio.total_asset,
            "asset update"
        );
    }

    fn on_order_error(&self, notice: &OrderErrorNotice) {
        // Business-rule rejections arrive here asynchronously; they are
        // logged, never retried.
        tracing::warn!(
            account_id = %notice.account_id,
            strategy_name = %notice.strategy_name,
            error_id = notice.error_id,
            error_msg = %notice.error_msg,
            "order rejected asynchronously"
        );
    }

    fn on_cancel_error(&self, notice: &CancelErrorNotice) {
        tracing::warn!(
            account_id = %self.account_id,
            order_id = notice.order_id,
            error_id = notice.error_id,
            error_msg = %notice.error_msg,
            "cancel rejected asynchronously"
        );
    }

    fn on_account_status(&self, notice: &AccountStatusNotice) {
        tracing::info!(
            account_id = %notice.account_id,
            account_kind = notice.account_kind,
            status = notice.status,
            status_label = notice.label(),
            "account status"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnect_sets_the_shared_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let sink = LoggingCallbackSink::with_link_flag("1001", Arc::clone(&flag));

        sink.on_disconnected();
        assert!(flag.load(Ordering::Relaxed));
    }
}

//! Error taxonomy for the trade gateway.
//!
//! Three tiers, matching how failures are allowed to travel:
//!
//! | Tier | Type | Fate |
//! |------|------|------|
//! | Startup | [`ConfigError`] | process does not start |
//! | Transport | [`crate::broker::BrokerError`] | reconnect + bounded retry |
//! | Operation | [`GatewayError`] | structured JSON error at the HTTP boundary |
//!
//! Business-level failures (insufficient funds, lot too small, symbol not
//! held) are *data*, not errors: they travel inside
//! [`crate::models::TradeOutcome`] with `success: false` and reach the caller
//! as HTTP 200.

use thiserror::Error;

use crate::broker::BrokerError;

/// Errors that prevent the gateway from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No enabled trading account in the configuration.
    #[error("no enabled trading accounts configured")]
    NoAccounts,

    /// An enabled account points at a data directory that does not exist.
    #[error("account {account_id}: broker data directory not found: {path}")]
    MissingDataDir {
        /// Account the directory belongs to.
        account_id: String,
        /// The configured path.
        path: String,
    },

    /// Account ids must be numeric; the session token is derived from them.
    #[error("account {account_id}: account id must be numeric")]
    BadAccountId {
        /// The offending account id.
        account_id: String,
    },

    /// A signing client was configured without a secret.
    #[error("signing secret for client {client_id} is empty")]
    EmptyClientSecret {
        /// The offending client id.
        client_id: String,
    },

    /// Underlying configuration source failed to load or deserialize.
    #[error(transparent)]
    Source(#[from] config::ConfigError),
}

/// Operation-level failures surfaced to the HTTP layer.
///
/// These are the only faults a route handler ever sees; everything
/// business-level is reported inside the operation's structured outcome.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The caller addressed a session index outside the pool.
    #[error("invalid trader index: {index}")]
    InvalidTraderIndex {
        /// The index that was requested.
        index: usize,
    },

    /// An operation exhausted its retry budget without a usable broker link.
    #[error("broker link unavailable after {attempts} attempts: {message}")]
    LinkExhausted {
        /// How many attempts were made.
        attempts: u32,
        /// The last transport error observed.
        message: String,
    },

    /// A broker call failed outside any retry loop.
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

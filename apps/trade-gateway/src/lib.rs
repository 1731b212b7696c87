// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Trade Gateway - Core Library
//!
//! A signed HTTP gateway that places percentage-of-portfolio equity orders
//! through one or more brokerage trading sessions for the Shanghai, Shenzhen
//! and Beijing equity venues.
//!
//! # Architecture
//!
//! The broker SDK is opaque and unreliable; the gateway shields callers from
//! it behind a synchronous request/response contract:
//!
//! - `symbol`: venue classification and the two symbol-suffix conventions
//! - `broker`: the narrow capability interface over one broker connection
//!   (transport + factory traits, raw record normalization, retry policy,
//!   simulated paper transport)
//! - `session`: connection lifecycle per brokerage account (connect /
//!   subscribe / lazy reconnect) and the position & portfolio query layer
//! - `execution`: order sizing math and the submission driver with bounded
//!   retry and forced reconnect
//! - `pool`: immutable-after-init session registry with per-session
//!   serialization and broadcast fan-out
//! - `server`: axum router, HMAC signature gate, cookie login
//! - `notify`: outbound push-message sink for trade outcomes

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Broker link boundary - transport traits, records, retry policy, sim.
pub mod broker;

/// Environment/file-driven gateway settings.
pub mod config;

/// Error taxonomy for startup and operation failures.
pub mod error;

/// Order sizing math and the submission driver.
pub mod execution;

/// Externally visible data model.
pub mod models;

/// Outbound notification sink.
pub mod notify;

/// Session registry and request fan-out.
pub mod pool;

/// Broker session lifecycle and query layer.
pub mod session;

/// HTTP surface and authentication gates.
pub mod server;

/// Symbol normalization for the Shanghai/Shenzhen/Beijing venues.
pub mod symbol;

pub use broker::{BrokerError, BrokerTransport, RetryPolicy, TransportFactory};
pub use config::GatewaySettings;
pub use error::{ConfigError, GatewayError};
pub use models::{Portfolio, Position, PositionFilter, PriceType, TradeOutcome};
pub use notify::{NoopNotifier, Notifier, WebhookNotifier};
pub use pool::SessionPool;
pub use session::BrokerSession;
pub use server::{create_router, AppState};

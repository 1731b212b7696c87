//! Session registry and request fan-out.
//!
//! The pool is built once at startup and never mutated afterwards; the
//! insertion-ordered index is the addressing scheme callers use
//! (`trader_index`). Every slot wraps its session in an async mutex, so
//! concurrent requests against the same index serialize instead of
//! interleaving on one transport handle.
//!
//! Fan-out is per-session independent: one session's failure becomes that
//! session's outcome entry and never drops the other entries - partial
//! success is a normal, representable terminal state.

use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::GatewayError;
use crate::models::TradeOutcome;
use crate::session::BrokerSession;

/// One slot of the pool: a session behind its serialization mutex.
pub struct SessionSlot {
    /// Position of this slot in the pool; the caller-facing address.
    pub index: usize,
    /// Account the slot's session trades.
    pub account_id: String,
    /// Human-facing account name.
    pub display_name: String,
    /// The session itself; lock to operate.
    pub session: Mutex<BrokerSession>,
}

/// Immutable-after-init registry of broker sessions.
pub struct SessionPool {
    slots: Vec<SessionSlot>,
}

impl SessionPool {
    /// Build the registry; slot order fixes the `trader_index` addressing.
    #[must_use]
    pub fn new(sessions: Vec<BrokerSession>) -> Self {
        let slots = sessions
            .into_iter()
            .enumerate()
            .map(|(index, session)| SessionSlot {
                index,
                account_id: session.account_id().to_string(),
                display_name: session.display_name().to_string(),
                session: Mutex::new(session),
            })
            .collect();
        Self { slots }
    }

    /// Number of sessions in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the pool holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Account summaries in index order.
    #[must_use]
    pub fn accounts(&self) -> Vec<AccountSummary> {
        self.slots
            .iter()
            .map(|slot| AccountSummary {
                index: slot.index,
                account_id: slot.account_id.clone(),
                nick_name: if slot.display_name.is_empty() {
                    format!("account {}", slot.index + 1)
                } else {
                    slot.display_name.clone()
                },
            })
            .collect()
    }

    /// The slot at `index`.
    pub fn get(&self, index: usize) -> Result<&SessionSlot, GatewayError> {
        self.slots
            .get(index)
            .ok_or(GatewayError::InvalidTraderIndex { index })
    }

    /// One named slot, or all of them when `index` is omitted.
    pub fn one_or_all(&self, index: Option<usize>) -> Result<Vec<&SessionSlot>, GatewayError> {
        match index {
            Some(index) => Ok(vec![self.get(index)?]),
            None => Ok(self.slots.iter().collect()),
        }
    }

    /// Every slot, in index order.
    pub fn all(&self) -> impl Iterator<Item = &SessionSlot> {
        self.slots.iter()
    }
}

/// Account row of the accounts endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    /// Pool index; the `trader_index` callers address.
    pub index: usize,
    /// Account id.
    pub account_id: String,
    /// Human-facing account name.
    pub nick_name: String,
}

/// Per-session entry of a broadcast result.
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    /// Which session this entry belongs to.
    pub trader_index: usize,
    /// `success` or `failed`; a business failure inside `result` still
    /// counts as `success` here - only faults mark a session `failed`.
    pub status: &'static str,
    /// The structured outcome, when the session produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TradeOutcome>,
    /// The fault, when it did not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionOutcome {
    /// A session that produced a structured outcome.
    #[must_use]
    pub fn success(trader_index: usize, result: TradeOutcome) -> Self {
        Self {
            trader_index,
            status: "success",
            result: Some(result),
            error: None,
        }
    }

    /// A session that faulted before producing an outcome.
    #[must_use]
    pub fn failed(trader_index: usize, error: impl Into<String>) -> Self {
        Self {
            trader_index,
            status: "failed",
            result: None,
            error: Some(error.into()),
        }
    }

    /// Build an entry from an operation result.
    #[must_use]
    pub fn from_result(trader_index: usize, result: Result<TradeOutcome, GatewayError>) -> Self {
        match result {
            Ok(outcome) => Self::success(trader_index, outcome),
            Err(e) => Self::failed(trader_index, e.to_string()),
        }
    }
}

//! A reference [`TccComponent`] for tests and demos.
//!
//! Mirrors the source system's mock participant: per-transaction state lives
//! in memory, and two request payload flags let a caller script failure
//! modes without writing a new participant for every test.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use tcc_core::component::{TccComponent, TccRequest, TccResponse};
use tcc_core::error::ParticipantError;

/// Set on a [`TccRequest`]'s `data` to make `try_op` refuse the reservation.
pub const REJECT_FLAG: &str = "reject_flag";
/// Set on a [`TccRequest`]'s `data` to make `try_op` sleep past the caller's
/// deadline before responding, simulating a hung participant.
pub const HANG_FLAG: &str = "hang_flag";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TxState {
    Tried,
    Confirmed,
    Canceled,
}

/// In-memory participant fixture. Every operation is idempotent by `tx_id`,
/// matching the contract every real [`TccComponent`] must satisfy.
#[derive(Debug)]
pub struct FixtureComponent {
    id: String,
    hang_for: std::time::Duration,
    txs: Mutex<HashMap<String, TxState>>,
}

impl FixtureComponent {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            hang_for: std::time::Duration::from_secs(3600),
            txs: Mutex::new(HashMap::new()),
        }
    }

    /// Override how long a `hang_flag` request sleeps before responding.
    /// Defaults to an hour, far past any realistic test deadline; tests that
    /// need a bounded hang without waiting out the default should use this.
    pub fn with_hang_duration(mut self, hang_for: std::time::Duration) -> Self {
        self.hang_for = hang_for;
        self
    }

    fn flag(data: &HashMap<String, Value>, key: &str) -> bool {
        matches!(data.get(key), Some(Value::Bool(true)))
    }
}

#[async_trait]
impl TccComponent for FixtureComponent {
    fn id(&self) -> &str {
        &self.id
    }

    async fn try_op(&self, req: TccRequest) -> Result<TccResponse, ParticipantError> {
        {
            let txs = self.txs.lock().unwrap();
            match txs.get(&req.tx_id) {
                // A late try_op after cancel is refused, not an error.
                Some(TxState::Canceled) => {
                    debug!(component = %self.id, tx_id = %req.tx_id, "try after cancel, refusing");
                    return Ok(TccResponse::refuse(self.id.clone(), req.tx_id));
                }
                Some(TxState::Tried) | Some(TxState::Confirmed) => {
                    return Ok(TccResponse::ack(self.id.clone(), req.tx_id));
                }
                None => {}
            }
        }

        if Self::flag(&req.data, HANG_FLAG) {
            tokio::time::sleep(self.hang_for).await;
        }

        if Self::flag(&req.data, REJECT_FLAG) {
            return Ok(TccResponse::refuse(self.id.clone(), req.tx_id));
        }

        self.txs
            .lock()
            .unwrap()
            .insert(req.tx_id.clone(), TxState::Tried);
        Ok(TccResponse::ack(self.id.clone(), req.tx_id))
    }

    async fn confirm(&self, tx_id: &str) -> Result<TccResponse, ParticipantError> {
        let mut txs = self.txs.lock().unwrap();
        match txs.get(tx_id) {
            Some(TxState::Confirmed) => Ok(TccResponse::ack(self.id.clone(), tx_id)),
            Some(TxState::Tried) => {
                txs.insert(tx_id.to_string(), TxState::Confirmed);
                Ok(TccResponse::ack(self.id.clone(), tx_id))
            }
            // Never tried, or already canceled: refuse, no error.
            Some(TxState::Canceled) | None => Ok(TccResponse::refuse(self.id.clone(), tx_id)),
        }
    }

    async fn cancel(&self, tx_id: &str) -> Result<TccResponse, ParticipantError> {
        let mut txs = self.txs.lock().unwrap();
        match txs.get(tx_id) {
            Some(TxState::Confirmed) => Err(ParticipantError::new(
                self.id.clone(),
                format!("cannot cancel already-confirmed tx {tx_id}"),
            )),
            Some(TxState::Canceled) => Ok(TccResponse::ack(self.id.clone(), tx_id)),
            // cancel of an unknown or never-tried tx must still succeed.
            Some(TxState::Tried) | None => {
                txs.insert(tx_id.to_string(), TxState::Canceled);
                Ok(TccResponse::ack(self.id.clone(), tx_id))
            }
        }
    }
}

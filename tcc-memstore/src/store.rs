//! A single-process, in-memory [`TxStore`] reference implementation.
//!
//! This exists for tests and demos, the same role the source system's
//! `example` package plays: a minimal, obviously-correct backend that lets
//! the coordinator's contracts be exercised without a real database.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::sync::Mutex;

use tcc_core::component::TccComponent;
use tcc_core::error::StoreError;
use tcc_core::manager::new_tx_id;
use tcc_core::model::{ComponentTryEntity, Transaction, TryStatus, TxStatus};
use tcc_core::store::TxStore;

#[derive(Default)]
struct State {
    txs: HashMap<String, Transaction>,
    lock_expires_at: Option<SystemTime>,
}

/// In-memory `TxStore`. The distributed lock is simulated with a
/// lease-expiry timestamp so a coordinator that crashed while holding it
/// doesn't wedge every other replica forever.
pub struct MemStore {
    state: Mutex<State>,
}

impl Default for MemStore {
    fn default() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TxStore for MemStore {
    async fn create_tx(&self, components: &[&dyn TccComponent]) -> Result<String, StoreError> {
        let tx_id = new_tx_id();
        let mut state = self.state.lock().await;
        if state.txs.contains_key(&tx_id) {
            return Err(StoreError::new(format!("tx id collision: {tx_id}")));
        }

        let components = components
            .iter()
            .map(|c| ComponentTryEntity {
                component_id: c.id().to_string(),
                try_status: TryStatus::Hanging,
            })
            .collect();

        state.txs.insert(
            tx_id.clone(),
            Transaction {
                tx_id: tx_id.clone(),
                components,
                status: TxStatus::Hanging,
                created_at: SystemTime::now(),
            },
        );
        Ok(tx_id)
    }

    async fn tx_update(
        &self,
        tx_id: &str,
        component_id: &str,
        accept: bool,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let tx = state
            .txs
            .get_mut(tx_id)
            .ok_or_else(|| StoreError::new(format!("unknown tx id: {tx_id}")))?;

        let entry = tx
            .components
            .iter_mut()
            .find(|c| c.component_id == component_id)
            .ok_or_else(|| {
                StoreError::new(format!("unknown component id {component_id} for tx {tx_id}"))
            })?;

        let wanted = if accept {
            TryStatus::Successful
        } else {
            TryStatus::Failure
        };

        match entry.try_status {
            TryStatus::Hanging => entry.try_status = wanted,
            status if status == wanted => {} // idempotent re-write of the same outcome
            status => {
                return Err(StoreError::new(format!(
                    "invalid try status transition {status:?} -> {wanted:?} for component {component_id}"
                )))
            }
        }
        Ok(())
    }

    async fn tx_submit(&self, tx_id: &str, success: bool) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let tx = state
            .txs
            .get_mut(tx_id)
            .ok_or_else(|| StoreError::new(format!("unknown tx id: {tx_id}")))?;

        let wanted = if success {
            TxStatus::Successful
        } else {
            TxStatus::Failure
        };

        match tx.status {
            TxStatus::Hanging => tx.status = wanted,
            status if status == wanted => {}
            status => {
                return Err(StoreError::new(format!(
                    "invalid tx status transition {status:?} -> {wanted:?} for tx {tx_id}"
                )))
            }
        }
        Ok(())
    }

    async fn get_hanging_txs(&self) -> Result<Vec<Transaction>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .txs
            .values()
            .filter(|tx| tx.status == TxStatus::Hanging)
            .cloned()
            .collect())
    }

    async fn get_tx(&self, tx_id: &str) -> Result<Transaction, StoreError> {
        let state = self.state.lock().await;
        state
            .txs
            .get(tx_id)
            .cloned()
            .ok_or_else(|| StoreError::new(format!("unknown tx id: {tx_id}")))
    }

    async fn lock(&self, expire: Duration) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let now = SystemTime::now();
        if let Some(expires_at) = state.lock_expires_at {
            if expires_at > now {
                return Err(StoreError::new("lock already held"));
            }
        }
        state.lock_expires_at = Some(now + expire);
        Ok(())
    }

    async fn unlock(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.lock_expires_at = None;
        Ok(())
    }
}

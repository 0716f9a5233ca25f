//! Transaction records and the pure status-derivation function.

use std::collections::HashMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a caller asks a single participant to do, keyed by component id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEntity {
    pub component_id: String,
    pub request: HashMap<String, Value>,
}

impl RequestEntity {
    pub fn new(component_id: impl Into<String>) -> Self {
        Self {
            component_id: component_id.into(),
            request: HashMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.request.insert(key.into(), value.into());
        self
    }
}

/// Per-participant outcome of the first (Try) phase. Monotonic: may move
/// `Hanging -> Successful` or `Hanging -> Failure`, never back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TryStatus {
    Hanging,
    Successful,
    Failure,
}

/// Whole-transaction status. Terminal statuses are `Successful` and
/// `Failure`; `Hanging` is the only non-terminal value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Hanging,
    Successful,
    Failure,
}

/// A single participant's slot inside a [`Transaction`] record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentTryEntity {
    pub component_id: String,
    pub try_status: TryStatus,
}

/// The durable record a [`crate::store::TxStore`] owns. The coordinator only
/// ever reads it back via `get_tx`/`get_hanging_txs`, or mutates it through
/// `tx_update`/`tx_submit` — never in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_id: String,
    pub components: Vec<ComponentTryEntity>,
    pub status: TxStatus,
    pub created_at: SystemTime,
}

impl Transaction {
    /// Derive the transaction's current logical status given a cutoff
    /// instant below which a still-hanging transaction is deemed stuck.
    ///
    /// 1. Any component `Failure` -> `Failure`.
    /// 2. Otherwise, if every component is `Successful` -> `Successful`.
    /// 3. Otherwise hanging; if `created_at` is before `cutoff` -> `Failure`
    ///    (deadline exceeded), else -> `Hanging`.
    ///
    /// The deadline only matters while some component is not yet
    /// `Successful` — an already-successful transaction is never flipped to
    /// `Failure` by a stale `created_at`.
    pub fn derive_status(&self, cutoff: SystemTime) -> TxStatus {
        let mut hanging_exists = false;
        for component in &self.components {
            match component.try_status {
                TryStatus::Failure => return TxStatus::Failure,
                TryStatus::Successful => {}
                TryStatus::Hanging => hanging_exists = true,
            }
        }

        if hanging_exists {
            if self.created_at < cutoff {
                TxStatus::Failure
            } else {
                TxStatus::Hanging
            }
        } else {
            TxStatus::Successful
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn tx(statuses: &[TryStatus], created_at: SystemTime) -> Transaction {
        Transaction {
            tx_id: "t".into(),
            components: statuses
                .iter()
                .enumerate()
                .map(|(i, s)| ComponentTryEntity {
                    component_id: i.to_string(),
                    try_status: *s,
                })
                .collect(),
            status: TxStatus::Hanging,
            created_at,
        }
    }

    #[test]
    fn any_failure_dominates() {
        let now = SystemTime::now();
        let t = tx(
            &[TryStatus::Successful, TryStatus::Failure, TryStatus::Hanging],
            now,
        );
        assert_eq!(t.derive_status(now - Duration::from_secs(1)), TxStatus::Failure);
    }

    #[test]
    fn all_successful_is_successful() {
        let now = SystemTime::now();
        let t = tx(&[TryStatus::Successful, TryStatus::Successful], now);
        assert_eq!(t.derive_status(now - Duration::from_secs(5)), TxStatus::Successful);
    }

    #[test]
    fn hanging_before_cutoff_stays_hanging() {
        let now = SystemTime::now();
        let t = tx(&[TryStatus::Successful, TryStatus::Hanging], now);
        assert_eq!(t.derive_status(now - Duration::from_secs(5)), TxStatus::Hanging);
    }

    #[test]
    fn hanging_past_cutoff_becomes_failure() {
        let created = SystemTime::now() - Duration::from_secs(10);
        let t = tx(&[TryStatus::Successful, TryStatus::Hanging], created);
        let cutoff = SystemTime::now() - Duration::from_secs(5);
        assert_eq!(t.derive_status(cutoff), TxStatus::Failure);
    }

    #[test]
    fn successful_is_never_flipped_by_cutoff() {
        let created = SystemTime::now() - Duration::from_secs(10);
        let t = tx(&[TryStatus::Successful, TryStatus::Successful], created);
        let cutoff = SystemTime::now();
        assert_eq!(t.derive_status(cutoff), TxStatus::Successful);
    }
}

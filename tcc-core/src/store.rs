//! The durable transaction log contract.

use std::time::Duration;

use async_trait::async_trait;

use crate::component::TccComponent;
use crate::error::StoreError;
use crate::model::Transaction;

/// Durable log of transactions and per-participant try outcomes, plus the
/// coordinator-wide distributed lock the reconciler uses to keep replicas
/// from double-driving second phase.
///
/// Implementations own durability; the coordinator only ever borrows an
/// immutable snapshot via `get_tx`/`get_hanging_txs`.
#[async_trait]
pub trait TxStore: Send + Sync {
    /// Allocate a unique transaction id and persist an initial record with
    /// every participant's try status `Hanging` and overall status
    /// `Hanging`. Must fail on id collision.
    async fn create_tx(&self, components: &[&dyn TccComponent]) -> Result<String, StoreError>;

    /// Atomically transition `component_id`'s try status from `Hanging` to
    /// `Successful` (if `accept`) or `Failure` (otherwise). Re-writing the
    /// same outcome that already holds is allowed (idempotent); changing
    /// away from a non-`Hanging` status must fail.
    async fn tx_update(
        &self,
        tx_id: &str,
        component_id: &str,
        accept: bool,
    ) -> Result<(), StoreError>;

    /// Atomically set the record's terminal status. Must fail if the record
    /// already holds the *opposite* terminal status.
    async fn tx_submit(&self, tx_id: &str, success: bool) -> Result<(), StoreError>;

    /// All records whose status is `Hanging`.
    async fn get_hanging_txs(&self) -> Result<Vec<Transaction>, StoreError>;

    /// A single record, or an error if missing.
    async fn get_tx(&self, tx_id: &str) -> Result<Transaction, StoreError>;

    /// Acquire the coordinator-wide mutex with a lease no shorter than
    /// `expire`. May fail if already held elsewhere.
    async fn lock(&self, expire: Duration) -> Result<(), StoreError>;

    /// Release the mutex. Must be idempotent for the holding caller.
    async fn unlock(&self) -> Result<(), StoreError>;
}

//! The two-phase orchestrator and manager façade.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::component::{TccComponent, TccRequest};
use crate::error::TxManagerError;
use crate::model::{RequestEntity, Transaction, TxStatus};
use crate::reconciler;
use crate::registry::Registry;
use crate::store::TxStore;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_MONITOR_TICK: Duration = Duration::from_secs(10);

/// The two recognized options: `timeout` bounds the first phase and is the
/// reconciler's "stuck" cutoff; `monitor_tick` is the reconciler's base
/// period and distributed lock lease length. Non-positive values supplied
/// through the `with_*` setters are replaced by the default, mirroring the
/// source system's functional options.
#[derive(Clone, Copy, Debug)]
pub struct TxManagerOptions {
    pub timeout: Duration,
    pub monitor_tick: Duration,
}

impl Default for TxManagerOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            monitor_tick: DEFAULT_MONITOR_TICK,
        }
    }
}

impl TxManagerOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = if timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            timeout
        };
        self
    }

    pub fn with_monitor_tick(mut self, tick: Duration) -> Self {
        self.monitor_tick = if tick.is_zero() {
            DEFAULT_MONITOR_TICK
        } else {
            tick
        };
        self
    }
}

/// Owns lifecycle (start/stop) and composes the registry, the store, and
/// the background reconciler into the public `register`/`transaction` API.
pub struct TxManager {
    registry: Arc<Registry>,
    store: Arc<dyn TxStore>,
    opts: TxManagerOptions,
    stop_signal: CancellationToken,
}

impl TxManager {
    /// Construct a manager over `store` and start its reconciler task.
    pub fn new(store: Arc<dyn TxStore>, opts: TxManagerOptions) -> Self {
        let registry = Arc::new(Registry::new());
        let stop_signal = CancellationToken::new();

        tokio::spawn(reconciler::run(
            registry.clone(),
            store.clone(),
            opts,
            stop_signal.clone(),
        ));

        Self {
            registry,
            store,
            opts,
            stop_signal,
        }
    }

    /// Register a participant. See [`Registry::register`].
    pub fn register(&self, component: Arc<dyn TccComponent>) -> Result<(), TxManagerError> {
        self.registry.register(component).map_err(Into::into)
    }

    /// Signal the reconciler to exit. A `CancellationToken`'s cancelled
    /// state is a flag, not a one-shot wakeup, so this is safe to call
    /// whichever phase of its loop the reconciler is currently in, and
    /// idempotent; in-flight `transaction` calls are not aborted.
    pub fn stop(&self) {
        self.stop_signal.cancel();
    }

    /// Run a transaction to completion: resolve participants, create the
    /// durable record, fan out `Try`, then drive second phase. Returns
    /// `Err` only for validation, resolution, or `create_tx` failures —
    /// once Try fan-out has begun, the result is always `Ok((tx_id,
    /// success))`.
    #[instrument(skip(self, reqs), fields(count = reqs.len()))]
    pub async fn transaction(
        &self,
        reqs: Vec<RequestEntity>,
    ) -> Result<(String, bool), TxManagerError> {
        if reqs.is_empty() {
            return Err(TxManagerError::EmptyRequest);
        }

        let mut seen = std::collections::HashSet::with_capacity(reqs.len());
        for req in &reqs {
            if !seen.insert(req.component_id.clone()) {
                return Err(TxManagerError::DuplicateRequest(req.component_id.clone()));
            }
        }

        let ids: Vec<&str> = reqs.iter().map(|r| r.component_id.as_str()).collect();
        let components = self.registry.resolve(ids)?;

        let refs: Vec<&dyn TccComponent> = components.iter().map(|c| c.as_ref()).collect();
        let tx_id = self.store.create_tx(&refs).await?;

        let success = self.try_phase(&tx_id, components, reqs).await;

        if let Err(err) = self.advance_progress_by_id(&tx_id).await {
            warn!(tx_id = %tx_id, error = %err, "second phase failed, leaving to reconciler");
        }

        Ok((tx_id, success))
    }

    /// First phase: fan out `Try` to every participant, bounded by
    /// `opts.timeout`. Reacts to the first failure by canceling the rest and
    /// reporting `success = false`; otherwise waits for every task.
    async fn try_phase(
        &self,
        tx_id: &str,
        components: Vec<Arc<dyn TccComponent>>,
        reqs: Vec<RequestEntity>,
    ) -> bool {
        let cancel = CancellationToken::new();
        let mut tasks: JoinSet<Result<(), TxManagerError>> = JoinSet::new();

        for (component, req) in components.into_iter().zip(reqs.into_iter()) {
            let store = self.store.clone();
            let tx_id = tx_id.to_string();
            let cancel = cancel.clone();
            let deadline = self.opts.timeout;

            tasks.spawn(async move {
                let component_id = component.id().to_string();
                let tcc_req = TccRequest {
                    component_id: component_id.clone(),
                    tx_id: tx_id.clone(),
                    data: req.request,
                };

                let outcome = tokio::select! {
                    _ = cancel.cancelled() => None,
                    res = tokio::time::timeout(deadline, component.try_op(tcc_req)) => Some(res),
                };

                let ack = match outcome {
                    None => false,
                    Some(Err(_elapsed)) => false,
                    Some(Ok(Err(e))) => {
                        return Err(TxManagerError::Participant(e));
                    }
                    Some(Ok(Ok(resp))) => resp.ack,
                };

                // A failing TXUpdate is itself a task error — it must never
                // be mistaken for participant success.
                store.tx_update(&tx_id, &component_id, ack).await?;

                if ack {
                    Ok(())
                } else {
                    Err(TxManagerError::ParticipantRefused(component_id))
                }
            });
        }

        let mut success = true;
        while let Some(joined) = tasks.join_next().await {
            let result = match joined {
                Ok(result) => result,
                Err(join_err) => Err(TxManagerError::Participant(
                    crate::error::ParticipantError::new("unknown", join_err.to_string()),
                )),
            };
            if let Err(e) = result {
                if success {
                    // First error: cancel the siblings still in flight.
                    warn!(tx_id = %tx_id, error = %e, "try phase failed, canceling siblings");
                    cancel.cancel();
                }
                success = false;
            }
        }
        success
    }

    async fn advance_progress_by_id(&self, tx_id: &str) -> Result<(), TxManagerError> {
        let tx = self.store.get_tx(tx_id).await?;
        self.advance_progress(&tx).await
    }

    /// Drive a transaction to terminal state: Confirm every participant if
    /// it derived as `Successful`, Cancel every participant if `Failure`,
    /// or do nothing if still `Hanging` (the reconciler retries later).
    /// Participants are processed sequentially and in record order — both
    /// `confirm` and `cancel` are idempotent, so this is safe to retry, and
    /// sequential processing keeps failure attribution precise.
    pub async fn advance_progress(&self, tx: &Transaction) -> Result<(), TxManagerError> {
        advance_progress_with(&self.registry, self.store.as_ref(), self.opts, tx).await
    }
}

/// Generate a globally unique transaction id. Exposed for `TxStore`
/// implementations that want the same id scheme the in-memory reference
/// store uses.
pub fn new_tx_id() -> String {
    Uuid::new_v4().to_string()
}

/// Shared second-phase advancement logic. Both [`TxManager::advance_progress`]
/// (invoked inline after first phase) and the reconciler (invoked per
/// hanging transaction it picks up) call through this, so the two code
/// paths can never drift.
pub(crate) async fn advance_progress_with(
    registry: &Registry,
    store: &dyn TxStore,
    opts: TxManagerOptions,
    tx: &Transaction,
) -> Result<(), TxManagerError> {
    let cutoff = SystemTime::now()
        .checked_sub(opts.timeout)
        .unwrap_or(SystemTime::UNIX_EPOCH);
    let status = tx.derive_status(cutoff);

    let success = match status {
        TxStatus::Hanging => return Ok(()),
        TxStatus::Successful => true,
        TxStatus::Failure => false,
    };

    for component in &tx.components {
        let handle = registry
            .resolve_one(&component.component_id)
            .map_err(|_| TxManagerError::UnregisteredParticipant(component.component_id.clone()))?;

        let resp = if success {
            handle.confirm(&tx.tx_id).await?
        } else {
            handle.cancel(&tx.tx_id).await?
        };

        if !resp.ack {
            return Err(TxManagerError::ParticipantRefused(
                component.component_id.clone(),
            ));
        }
    }

    store.tx_submit(&tx.tx_id, success).await?;
    info!(tx_id = %tx.tx_id, success, "transaction reached terminal state");
    Ok(())
}

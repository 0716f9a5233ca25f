//! Background loop that drives hanging transactions to terminal state.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::TxManagerError;
use crate::manager::TxManagerOptions;
use crate::registry::Registry;
use crate::store::TxStore;

/// `backoff(t) = min(t * 2, monitor_tick * 8)` — exponential with a cap at
/// 8x the base tick. Monotonic non-decreasing in `t`.
pub fn backoff(current: Duration, monitor_tick: Duration) -> Duration {
    let doubled = current.saturating_mul(2);
    let cap = monitor_tick.saturating_mul(8);
    doubled.min(cap)
}

/// Run for the manager's lifetime. Each iteration: check cancellation, wait
/// a (possibly backed-off) tick or cancellation, try to take the
/// distributed lock, fetch hanging transactions, advance each concurrently,
/// then release the lock unconditionally.
///
/// The stop signal is a `CancellationToken` rather than a `Notify`: its
/// cancelled state persists once set, so `stop()` is observed no matter
/// which phase of the loop is running when it fires, instead of only being
/// visible to a task already parked in a wakeup call.
pub async fn run(
    registry: Arc<Registry>,
    store: Arc<dyn TxStore>,
    opts: TxManagerOptions,
    stop_signal: CancellationToken,
) {
    let mut tick = opts.monitor_tick;
    let mut last_ok = true;

    loop {
        if stop_signal.is_cancelled() {
            return;
        }

        tick = if last_ok {
            opts.monitor_tick
        } else {
            backoff(tick, opts.monitor_tick)
        };

        tokio::select! {
            _ = stop_signal.cancelled() => return,
            _ = tokio::time::sleep(tick) => {}
        }

        if stop_signal.is_cancelled() {
            return;
        }

        if store.lock(opts.monitor_tick).await.is_err() {
            // Lock contention is typically another coordinator holding it;
            // don't escalate backoff for that.
            last_ok = true;
            continue;
        }

        let txs = match store.get_hanging_txs().await {
            Ok(txs) => txs,
            Err(e) => {
                warn!(error = %e, "failed to fetch hanging transactions");
                let _ = store.unlock().await;
                last_ok = false;
                continue;
            }
        };

        debug!(count = txs.len(), "reconciling hanging transactions");
        last_ok = advance_all(&registry, &store, &opts, txs).await.is_ok();
        let _ = store.unlock().await;
    }
}

/// Advance every hanging transaction concurrently; the first error becomes
/// the iteration's outcome, but every task still runs to completion.
async fn advance_all(
    registry: &Arc<Registry>,
    store: &Arc<dyn TxStore>,
    opts: &TxManagerOptions,
    txs: Vec<crate::model::Transaction>,
) -> Result<(), TxManagerError> {
    let mut tasks: JoinSet<Result<(), TxManagerError>> = JoinSet::new();

    for tx in txs {
        let registry = registry.clone();
        let store = store.clone();
        let opts = *opts;
        tasks.spawn(async move {
            // advance_progress only needs the registry, the store, and the
            // timeout, so it is reimplemented here as a free function rather
            // than reaching back through a manager handle the reconciler
            // does not otherwise need.
            crate::manager::advance_progress_with(&registry, store.as_ref(), opts, &tx).await
        });
    }

    let mut first_err = None;
    while let Some(joined) = tasks.join_next().await {
        let result = match joined {
            Ok(result) => result,
            Err(join_err) => Err(TxManagerError::Participant(
                crate::error::ParticipantError::new("unknown", join_err.to_string()),
            )),
        };
        if let Err(e) = result {
            if first_err.is_none() {
                first_err = Some(e);
            }
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_ladder() {
        let tick = Duration::from_secs(1);
        let a = backoff(tick, tick);
        assert_eq!(a, Duration::from_secs(2));
        let b = backoff(a, tick);
        assert_eq!(b, Duration::from_secs(4));
        let c = backoff(b, tick);
        assert_eq!(c, Duration::from_secs(8));
        let d = backoff(c, tick);
        assert_eq!(d, Duration::from_secs(8));
    }

    #[test]
    fn backoff_is_monotonic_non_decreasing() {
        let tick = Duration::from_millis(100);
        let mut current = tick;
        let mut prev = current;
        for _ in 0..10 {
            current = backoff(current, tick);
            assert!(current >= prev);
            prev = current;
        }
    }
}

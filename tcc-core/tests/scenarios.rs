//! End-to-end scenarios exercising [`TxManager`] against the in-memory
//! reference store and participant fixture.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use serde_json::Value;

use tcc_core::{RequestEntity, TxManager, TxManagerError, TxManagerOptions, TxStatus, TxStore};
use tcc_memstore::{FixtureComponent, MemStore, HANG_FLAG, REJECT_FLAG};

fn manager(opts: TxManagerOptions) -> (TxManager, Arc<MemStore>) {
    let store = Arc::new(MemStore::new());
    let mgr = TxManager::new(store.clone(), opts);
    (mgr, store)
}

#[tokio::test]
async fn all_ack_succeeds() {
    let (mgr, store) = manager(TxManagerOptions::default());
    for id in ["a", "b", "c", "d", "e"] {
        mgr.register(Arc::new(FixtureComponent::new(id))).unwrap();
    }

    let reqs = ["a", "b", "c", "d", "e"]
        .into_iter()
        .map(RequestEntity::new)
        .collect();

    let (tx_id, success) = mgr.transaction(reqs).await.unwrap();
    assert!(success);

    let tx = store.get_tx(&tx_id).await.unwrap();
    assert_eq!(tx.status, TxStatus::Successful);
    mgr.stop();
}

#[tokio::test]
async fn all_reject_fails() {
    let (mgr, store) = manager(TxManagerOptions::default());
    for id in ["a", "b", "c"] {
        mgr.register(Arc::new(FixtureComponent::new(id))).unwrap();
    }

    let reqs = ["a", "b", "c"]
        .into_iter()
        .map(|id| RequestEntity::new(id).with_data(REJECT_FLAG, Value::Bool(true)))
        .collect();

    let (tx_id, success) = mgr.transaction(reqs).await.unwrap();
    assert!(!success);

    let tx = store.get_tx(&tx_id).await.unwrap();
    assert_eq!(tx.status, TxStatus::Failure);
    mgr.stop();
}

#[tokio::test]
async fn duplicate_component_id_is_rejected_before_create_tx() {
    let (mgr, _store) = manager(TxManagerOptions::default());
    mgr.register(Arc::new(FixtureComponent::new("a"))).unwrap();

    let reqs = vec![RequestEntity::new("a"), RequestEntity::new("a")];
    let err = mgr.transaction(reqs).await.unwrap_err();
    assert!(matches!(err, TxManagerError::DuplicateRequest(id) if id == "a"));
    mgr.stop();
}

#[tokio::test]
async fn unknown_component_is_rejected_before_create_tx() {
    let (mgr, _store) = manager(TxManagerOptions::default());
    mgr.register(Arc::new(FixtureComponent::new("a"))).unwrap();

    let reqs = vec![RequestEntity::new("a"), RequestEntity::new("ghost")];
    let err = mgr.transaction(reqs).await.unwrap_err();
    assert!(matches!(err, TxManagerError::Registry(_)));
    mgr.stop();
}

#[tokio::test(start_paused = true)]
async fn hanging_participant_is_reconciled_to_failure() {
    let opts = TxManagerOptions::default()
        .with_timeout(Duration::from_millis(50))
        .with_monitor_tick(Duration::from_millis(50));
    let store = Arc::new(MemStore::new());
    let mgr = TxManager::new(store.clone(), opts);

    mgr.register(Arc::new(FixtureComponent::new("ok"))).unwrap();
    mgr.register(Arc::new(
        FixtureComponent::new("slow").with_hang_duration(Duration::from_secs(10)),
    ))
    .unwrap();

    let reqs = vec![
        RequestEntity::new("ok"),
        RequestEntity::new("slow").with_data(HANG_FLAG, Value::Bool(true)),
    ];

    let (tx_id, success) = mgr.transaction(reqs).await.unwrap();
    assert!(!success);

    // Drive virtual time past several reconciler ticks.
    tokio::time::advance(Duration::from_secs(2)).await;
    tokio::time::sleep(Duration::from_millis(1)).await;

    let tx = store.get_tx(&tx_id).await.unwrap();
    assert_eq!(tx.status, TxStatus::Failure);
    mgr.stop();
}

#[tokio::test]
async fn advance_progress_twice_is_idempotent() {
    let store = Arc::new(MemStore::new());
    let mgr = TxManager::new(store.clone(), TxManagerOptions::default());
    mgr.register(Arc::new(FixtureComponent::new("a"))).unwrap();

    let (tx_id, success) = mgr.transaction(vec![RequestEntity::new("a")]).await.unwrap();
    assert!(success);

    let tx = store.get_tx(&tx_id).await.unwrap();
    mgr.advance_progress(&tx).await.unwrap();
    mgr.advance_progress(&tx).await.unwrap();
    mgr.stop();
}

#[tokio::test]
async fn concurrent_transactions_over_random_subsets_all_succeed() {
    let (mgr, _store) = manager(TxManagerOptions::default());
    let mgr = Arc::new(mgr);
    let ids: Vec<String> = (0..10).map(|i| format!("p{i}")).collect();
    for id in &ids {
        mgr.register(Arc::new(FixtureComponent::new(id.clone())))
            .unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..100 {
        let mgr = mgr.clone();
        let mut pool = ids.clone();
        pool.shuffle(&mut rand::thread_rng());
        let subset: Vec<RequestEntity> = pool
            .into_iter()
            .take(3)
            .map(RequestEntity::new)
            .collect();

        handles.push(tokio::spawn(async move { mgr.transaction(subset).await }));
    }

    for handle in handles {
        let (_tx_id, success) = handle.await.unwrap().unwrap();
        assert!(success);
    }

    mgr.stop();
}

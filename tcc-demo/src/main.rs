//! A thin binary wiring a [`tcc_core::TxManager`] up with the in-memory
//! reference store and a handful of fixture participants, and running one
//! transaction to completion.

mod settings;

use std::sync::Arc;

use tcc_base::Result;
use tcc_core::{RequestEntity, TxManager};
use tcc_memstore::{FixtureComponent, MemStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opts = settings::load()?;
    let store = Arc::new(MemStore::new());
    let manager = TxManager::new(store, opts);

    for id in ["inventory", "payments", "shipping"] {
        manager.register(Arc::new(FixtureComponent::new(id)))?;
    }

    let reqs = vec![
        RequestEntity::new("inventory"),
        RequestEntity::new("payments"),
        RequestEntity::new("shipping"),
    ];

    let (tx_id, success) = manager.transaction(reqs).await?;
    info!(tx_id, success, "demo transaction finished");

    manager.stop();
    Ok(())
}

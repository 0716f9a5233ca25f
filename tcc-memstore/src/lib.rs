//! In-memory reference implementations of [`tcc_core::TxStore`] and
//! [`tcc_core::TccComponent`], for tests and demos. Not for production use:
//! state is lost on restart and the distributed lock only excludes
//! concurrent *tasks*, not concurrent processes.

mod fixture;
mod store;

pub use fixture::{FixtureComponent, HANG_FLAG, REJECT_FLAG};
pub use store::MemStore;

// The binary-facing error type. A host like tcc-demo wants exactly one
// error type to log and return from main, not a match arm per concern
// (registry/store/participant/orchestrator). Every crate-local thiserror
// enum in tcc-core already implements std::error::Error, so the blanket
// From impl below is all a caller needs: `manager.transaction(reqs).await?`
// folds a TxManagerError in without any explicit conversion at the call
// site, and the same is true of a settings-loading ConfigError.
//
// A log-on-creation side effect is attached here rather than at each
// error site, so every domain error that ever crosses into this type is
// recorded exactly once, regardless of how many layers it passed through
// on its way up.

use backtrace_error::DynBacktraceError;
use tracing::error;

#[cfg(test)]
use test_log::test;

#[derive(Debug)]
#[allow(dead_code)]
pub struct Error(DynBacktraceError);
pub type Result<T> = std::result::Result<T, Error>;

impl<E: std::error::Error + Send + Sync + 'static> From<E> for Error {
    fn from(err: E) -> Error {
        Error::new(err)
    }
}

impl Error {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(err: E) -> Error {
        error!(target: "tcc", "{:?}", err);
        let dbe = DynBacktraceError::from(err);
        Error(dbe)
    }
}

#[test]
fn folds_a_registry_error_via_blanket_from() {
    use tcc_core_error_test_support::RegistryError;

    let _err: Error = RegistryError::DuplicateId("inventory".into()).into();
}

// A minimal stand-in for tcc_core::error::RegistryError so this crate's
// own test doesn't need a dependency on tcc-core (which itself depends on
// tcc-base indirectly through tcc-demo's wiring, not directly — see
// DESIGN.md). Exercises the exact shape of error this type is meant to
// fold: a thiserror enum with no special-casing required.
#[cfg(test)]
mod tcc_core_error_test_support {
    #[derive(Debug, thiserror::Error)]
    pub enum RegistryError {
        #[error("component id already registered: {0}")]
        DuplicateId(String),
    }
}

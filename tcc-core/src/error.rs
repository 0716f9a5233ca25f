//! Error taxonomy for the coordinator.
//!
//! Each enum here covers one concern (registry, store, participant, the
//! orchestrator/reconciler). All of them implement [`std::error::Error`], so
//! a host binary wiring this crate up (see `tcc-demo`) can fold them into
//! its own application error with a single blanket `From` impl instead of
//! matching on every variant everywhere. This crate itself has no opinion
//! on what that application error looks like.

use thiserror::Error;

/// Failures from resolving or registering participants.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("component id already registered: {0}")]
    DuplicateId(String),
    #[error("component id not registered: {0}")]
    UnknownId(String),
}

/// Opaque failure returned by a [`crate::component::TccComponent`] operation.
///
/// The coordinator never interprets *why* a participant failed, only that it
/// did; participants are plug-ins and keep their own error detail private.
#[derive(Debug, Error)]
#[error("component {component_id} failed: {reason}")]
pub struct ParticipantError {
    pub component_id: String,
    pub reason: String,
}

impl ParticipantError {
    pub fn new(component_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            component_id: component_id.into(),
            reason: reason.into(),
        }
    }
}

/// Opaque failure returned by a [`crate::store::TxStore`] operation.
#[derive(Debug, Error)]
#[error("tx store operation failed: {0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Errors surfaced synchronously from [`crate::manager::TxManager`] methods.
///
/// Per the orchestration contract, `transaction()` only ever returns one of
/// these for validation, resolution, or `create_tx` failures — once Try
/// fan-out has begun, failures are folded into `success = false` instead.
#[derive(Debug, Error)]
pub enum TxManagerError {
    #[error("empty request list")]
    EmptyRequest,
    #[error("duplicate component id in request: {0}")]
    DuplicateRequest(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Participant(#[from] ParticipantError),
    #[error("component {0} refused")]
    ParticipantRefused(String),
    #[error("transaction references unregistered component: {0}")]
    UnregisteredParticipant(String),
}

//! The capability every business participant must expose.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ParticipantError;

/// Input to a participant's first-phase `try_op` call.
#[derive(Clone, Debug)]
pub struct TccRequest {
    pub component_id: String,
    pub tx_id: String,
    pub data: HashMap<String, Value>,
}

/// Output of every participant operation.
#[derive(Clone, Debug)]
pub struct TccResponse {
    pub component_id: String,
    pub tx_id: String,
    pub ack: bool,
}

impl TccResponse {
    pub fn ack(component_id: impl Into<String>, tx_id: impl Into<String>) -> Self {
        Self {
            component_id: component_id.into(),
            tx_id: tx_id.into(),
            ack: true,
        }
    }

    pub fn refuse(component_id: impl Into<String>, tx_id: impl Into<String>) -> Self {
        Self {
            component_id: component_id.into(),
            tx_id: tx_id.into(),
            ack: false,
        }
    }
}

/// A pluggable business resource capable of participating in a TCC
/// transaction. Implementations must make all three operations idempotent by
/// `(id(), tx_id)`:
///
/// - `cancel` of an unknown or never-tried transaction must succeed (empty
///   rollback, `ack = true`).
/// - `confirm` must refuse (`ack = false`, no error) if the transaction was
///   never tried, or was already canceled.
/// - a late `try_op` arriving after `cancel` must be rejected (`ack =
///   false`, no error), not treated as an error.
#[async_trait]
pub trait TccComponent: Send + Sync + std::fmt::Debug {
    /// Stable identity, constant for the participant's lifetime.
    fn id(&self) -> &str;

    /// Reserve resources tentatively for `req.tx_id`.
    async fn try_op(&self, req: TccRequest) -> Result<TccResponse, ParticipantError>;

    /// Commit a previously successful `try_op` for `tx_id`.
    async fn confirm(&self, tx_id: &str) -> Result<TccResponse, ParticipantError>;

    /// Release any reservation held for `tx_id`.
    async fn cancel(&self, tx_id: &str) -> Result<TccResponse, ParticipantError>;
}

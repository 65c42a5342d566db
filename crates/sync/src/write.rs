//! Write-API boundary types.
//!
//! The actual REST client lives outside this crate; the coordinator only
//! sees a write closure taking `(desired_state, precondition_token)` and
//! returning these shapes.

use serde::{Deserialize, Serialize};

/// Successful single-entity write.
#[derive(Debug, Clone)]
pub struct WriteOk<V> {
    /// Authoritative state returned by the server, when it differs from
    /// the optimistic state (None keeps the optimistic value).
    pub state: Option<V>,
    /// New version token for the resource.
    pub token: Option<String>,
}

impl<V> WriteOk<V> {
    pub fn confirmed(token: impl Into<String>) -> Self {
        Self {
            state: None,
            token: Some(token.into()),
        }
    }

    pub fn without_token() -> Self {
        Self {
            state: None,
            token: None,
        }
    }
}

/// Per-item status inside a bulk write response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchItemStatus {
    Confirmed,
    Failed,
    Conflict,
}

/// One element of the parallel array a bulk write returns. Keyed by
/// `entity_id` so the coordinator can fan outcomes back out to entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemOutcome {
    pub entity_id: String,
    pub status: BatchItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BatchItemOutcome {
    pub fn confirmed(entity_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            status: BatchItemStatus::Confirmed,
            token: Some(token.into()),
            message: None,
        }
    }

    pub fn failed(entity_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            status: BatchItemStatus::Failed,
            token: None,
            message: Some(message.into()),
        }
    }
}

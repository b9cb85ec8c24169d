//! Event envelope for pub/sub

use crate::types::EventKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Event ID (UUIDv7 for ordering)
    pub id: Uuid,

    /// Event kind
    pub kind: EventKind,

    /// Payload (JSON-serialized domain event)
    pub payload: serde_json::Value,

    /// Timestamp
    pub timestamp: DateTime<Utc>,

    /// Correlation ID (for tracing a flow across events)
    pub correlation_id: Option<String>,
}

impl EventEnvelope {
    /// Create new envelope
    pub fn new(kind: EventKind, payload: serde_json::Value, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            payload,
            timestamp,
            correlation_id: None,
        }
    }

    /// Set correlation ID
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Get subject name for this event
    pub fn subject(&self) -> &'static str {
        self.kind.subject()
    }

    /// Serialize to bytes (JSON)
    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| crate::Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes (JSON)
    pub fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| crate::Error::Serialization(e.to_string()))
    }
}

//! Refresh event wire types.
//!
//! The wire shape is shared by both transports and is frozen: camelCase
//! JSON with `entityId` / `originId` keys. Domains form a closed tagged
//! union so subscribers can handle them exhaustively; unknown domains
//! fail deserialization instead of flowing through untyped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resource domain an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Assignments,
    Projects,
    Departments,
    Deliverables,
}

impl Domain {
    pub const ALL: [Domain; 4] = [
        Domain::Assignments,
        Domain::Projects,
        Domain::Departments,
        Domain::Deliverables,
    ];

    /// Stable key, also the fallback store's per-domain file stem.
    pub fn key(&self) -> &'static str {
        match self {
            Domain::Assignments => "assignments",
            Domain::Projects => "projects",
            Domain::Departments => "departments",
            Domain::Deliverables => "deliverables",
        }
    }
}

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// A domain change notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshEvent {
    pub domain: Domain,
    pub kind: ChangeKind,
    pub entity_id: String,
    /// Changed field names, when the publisher knows them (lets receivers
    /// patch locally instead of refetching).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    /// The emitting context. Receivers drop events carrying their own id:
    /// the publisher already applied the effect locally.
    pub origin_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl RefreshEvent {
    pub fn new(
        domain: Domain,
        kind: ChangeKind,
        entity_id: impl Into<String>,
        fields: Option<Vec<String>>,
        origin_id: Uuid,
    ) -> Self {
        Self {
            domain,
            kind,
            entity_id: entity_id.into(),
            fields,
            origin_id,
            timestamp: Utc::now(),
        }
    }

    /// Identity tuple for at-least-once deduplication.
    pub fn dedup_key(&self) -> (Domain, ChangeKind, String, i64) {
        (
            self.domain,
            self.kind,
            self.entity_id.clone(),
            self.timestamp.timestamp_millis(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape_is_camel_case() {
        let event = RefreshEvent::new(
            Domain::Assignments,
            ChangeKind::Updated,
            "a42",
            Some(vec!["hours".to_string()]),
            Uuid::nil(),
        );
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["domain"].as_str(), Some("assignments"));
        assert_eq!(json["kind"].as_str(), Some("updated"));
        assert_eq!(json["entityId"].as_str(), Some("a42"));
        assert_eq!(json["originId"].as_str(), Some(&Uuid::nil().to_string()[..]));
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_fields_omitted_when_none() {
        let event = RefreshEvent::new(
            Domain::Projects,
            ChangeKind::Deleted,
            "p1",
            None,
            Uuid::nil(),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("fields").is_none());
    }

    #[test]
    fn test_unknown_domain_rejected() {
        let json = r#"{
            "domain": "invoices",
            "kind": "updated",
            "entityId": "x",
            "originId": "00000000-0000-0000-0000-000000000000",
            "timestamp": "2026-08-30T12:00:00Z"
        }"#;
        assert!(serde_json::from_str::<RefreshEvent>(json).is_err());
    }

    #[test]
    fn test_round_trip() {
        let event = RefreshEvent::new(
            Domain::Deliverables,
            ChangeKind::Created,
            "d9",
            None,
            Uuid::new_v4(),
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: RefreshEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.dedup_key(), event.dedup_key());
        assert_eq!(back.origin_id, event.origin_id);
    }
}

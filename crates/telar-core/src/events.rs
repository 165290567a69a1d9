//! In-process activity events.
//!
//! Domain modules emit an [`ActivityEvent`] after their primary write has
//! committed. The event is handed synchronously to the
//! [`ActivityRecorder`](crate::activity::ActivityRecorder), which appends
//! the audit record and then feeds the same event to notification
//! derivation. The chain is causal, not transactional: a failure past the
//! primary write loses only the derived records, never the primary one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::{Activity, ActivityAction, EntityType};

/// One mutating (or otherwise auditable) action on a domain entity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub owner_id: Uuid,
    pub action: ActivityAction,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub details: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_title: Option<String>,
    pub tags: Vec<String>,
}

impl ActivityEvent {
    /// Create an event with empty details, no title, and no tags.
    pub fn new(
        owner_id: Uuid,
        action: ActivityAction,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Self {
        Self {
            owner_id,
            action,
            entity_type,
            entity_id,
            details: JsonValue::Object(Default::default()),
            entity_title: None,
            tags: Vec::new(),
        }
    }

    /// Attach a free-form detail map.
    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = details;
        self
    }

    /// Attach the entity's display title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.entity_title = Some(title.into());
        self
    }

    /// Attach the entity's tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Materialize the immutable activity record for this event.
    pub fn into_activity(self, created_at: DateTime<Utc>) -> Activity {
        Activity {
            id: Uuid::now_v7(),
            owner_id: self.owner_id,
            action: self.action,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            details: self.details,
            entity_title: self.entity_title,
            tags: self.tags,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let owner = Uuid::new_v4();
        let entity = Uuid::new_v4();
        let event = ActivityEvent::new(
            owner,
            ActivityAction::Create,
            EntityType::Resource,
            entity,
        )
        .with_title("Go Concurrency")
        .with_tags(vec!["go".to_string(), "concurrency".to_string()])
        .with_details(serde_json::json!({"source": "import"}));

        assert_eq!(event.owner_id, owner);
        assert_eq!(event.entity_title.as_deref(), Some("Go Concurrency"));
        assert_eq!(event.tags.len(), 2);
    }

    #[test]
    fn test_into_activity_preserves_fields() {
        let now = Utc::now();
        let event = ActivityEvent::new(
            Uuid::new_v4(),
            ActivityAction::Delete,
            EntityType::Project,
            Uuid::new_v4(),
        )
        .with_title("Legacy migration");

        let owner = event.owner_id;
        let activity = event.into_activity(now);

        assert_eq!(activity.owner_id, owner);
        assert_eq!(activity.action, ActivityAction::Delete);
        assert_eq!(activity.entity_type, EntityType::Project);
        assert_eq!(activity.entity_title.as_deref(), Some("Legacy migration"));
        assert_eq!(activity.created_at, now);
    }
}

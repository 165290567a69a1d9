//! Core traits for telar storage abstractions.
//!
//! These traits define the interfaces that concrete persistence
//! implementations must satisfy, one per entity collection, enabling
//! pluggable backends and testability. Services receive them by explicit
//! constructor injection.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::pagination::{ListParams, PageRequest};

// =============================================================================
// ACTIVITY REPOSITORY
// =============================================================================

/// Filters for listing activity records.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListActivitiesRequest {
    /// Keep records whose action is in this set.
    pub actions: Option<Vec<ActivityAction>>,
    /// Keep records whose entity type is in this set.
    pub entity_types: Option<Vec<EntityType>>,
    /// Keep records for exactly this entity.
    pub entity_id: Option<Uuid>,
    /// Keep records carrying at least one of these tags.
    pub tags: Option<Vec<String>>,
    /// Case-insensitive substring match against the entity title.
    pub search: Option<String>,
    /// Keep records created at or after this instant.
    pub start_date: Option<DateTime<Utc>>,
    /// Keep records created at or before this instant.
    pub end_date: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub page: PageRequest,
}

/// One calendar-day bucket of a timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub count: i64,
}

/// Repository for the append-only activity log.
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// Append one activity record.
    async fn insert(&self, activity: &Activity) -> Result<()>;

    /// List records for an owner with filtering; returns (items, total).
    async fn list(
        &self,
        owner_id: Uuid,
        req: &ListActivitiesRequest,
        params: &ListParams,
    ) -> Result<(Vec<Activity>, i64)>;

    /// Most recent records for an owner, newest first.
    async fn recent(&self, owner_id: Uuid, limit: i64) -> Result<Vec<Activity>>;

    /// Record counts grouped by entity type.
    async fn counts_by_entity_type(&self, owner_id: Uuid) -> Result<HashMap<EntityType, i64>>;

    /// Record counts grouped by action.
    async fn counts_by_action(&self, owner_id: Uuid) -> Result<HashMap<ActivityAction, i64>>;

    /// Calendar-day buckets of record counts since `since`, ascending.
    /// Days with no activity do not appear.
    async fn timeline(&self, owner_id: Uuid, since: DateTime<Utc>) -> Result<Vec<TimelinePoint>>;
}

// =============================================================================
// PREFERENCE REPOSITORY
// =============================================================================

/// Repository for per-owner notification preference records.
#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    /// Fetch the preference record for an owner, if one exists.
    async fn find(&self, owner_id: Uuid) -> Result<Option<NotificationPreference>>;

    /// Insert a fresh preference record.
    async fn insert(&self, pref: &NotificationPreference) -> Result<()>;

    /// Persist the full current state of an existing record.
    async fn save(&self, pref: &NotificationPreference) -> Result<()>;
}

// =============================================================================
// NOTIFICATION REPOSITORY
// =============================================================================

/// Filters for listing notifications.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsRequest {
    pub is_read: Option<bool>,
    /// Keep notifications whose type is in this set.
    pub types: Option<Vec<NotificationType>>,
    /// Keep notifications whose priority is in this set.
    pub priorities: Option<Vec<NotificationPriority>>,
    pub related_entity_type: Option<EntityType>,
    pub related_entity_id: Option<Uuid>,
    /// Case-insensitive substring match against title or message.
    pub search: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub page: PageRequest,
}

/// Payload for creating a notification.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<NotificationType>,
    pub priority: Option<NotificationPriority>,
    pub related_entity_type: Option<EntityType>,
    pub related_entity_id: Option<Uuid>,
    pub additional_data: Option<JsonValue>,
    /// ISO-8601 expiry; normalized to a timestamp by the service.
    pub expires_at: Option<String>,
}

/// Payload for bulk read-state changes. `all` wins over `ids`; `value`
/// defaults to true (mark read).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub ids: Option<Vec<Uuid>>,
    pub all: Option<bool>,
    pub value: Option<bool>,
}

/// Repository for the notification collection.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Persist one notification.
    async fn insert(&self, notification: &Notification) -> Result<()>;

    /// Fetch one notification by id, owner-scoped.
    async fn find(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Notification>>;

    /// List visible notifications (unexpired as of `now`); returns
    /// (items, total).
    async fn list(
        &self,
        owner_id: Uuid,
        req: &ListNotificationsRequest,
        params: &ListParams,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Notification>, i64)>;

    /// Count unread, visible notifications as of `now`.
    async fn unread_count(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<i64>;

    /// Set the read flag on the given ids (or every notification of the
    /// owner when `ids` is None). Returns the number of rows actually
    /// changed, not merely matched.
    async fn set_read(&self, owner_id: Uuid, ids: Option<&[Uuid]>, value: bool) -> Result<u64>;

    /// Hard-delete one notification; true when a row was removed.
    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<bool>;

    /// Hard-delete every notification of the owner; returns the count.
    async fn delete_all(&self, owner_id: Uuid) -> Result<u64>;
}

// =============================================================================
// PREFERENCE UPDATE PAYLOAD
// =============================================================================

/// Partial preference update. Map-valued fields merge per key; scalar
/// fields overwrite. Window bounds are ISO-8601 strings and only take
/// effect when the same update turns `doNotDisturb` on.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreferencesRequest {
    pub enabled: Option<bool>,
    pub channel_preferences: Option<HashMap<NotificationChannel, bool>>,
    pub category_preferences: Option<HashMap<NotificationCategory, bool>>,
    pub do_not_disturb: Option<bool>,
    pub do_not_disturb_start: Option<String>,
    pub do_not_disturb_end: Option<String>,
}

// =============================================================================
// DASHBOARD SOURCE COLLECTIONS
// =============================================================================

/// Read access to the owner's resources, as the aggregator consumes them.
#[async_trait]
pub trait ResourceCollection: Send + Sync {
    /// Every resource of the owner.
    async fn list(&self, owner_id: Uuid) -> Result<Vec<ResourceSummary>>;

    /// Most recently created resources, newest first.
    async fn recent(&self, owner_id: Uuid, limit: i64) -> Result<Vec<ResourceSummary>>;

    /// Resources ranked by usage count, highest first.
    async fn most_used(&self, owner_id: Uuid, limit: i64) -> Result<Vec<ResourceSummary>>;
}

/// Read access to the owner's knowledge items.
#[async_trait]
pub trait KnowledgeCollection: Send + Sync {
    async fn list(&self, owner_id: Uuid) -> Result<Vec<KnowledgeSummary>>;

    async fn recent(&self, owner_id: Uuid, limit: i64) -> Result<Vec<KnowledgeSummary>>;

    async fn most_used(&self, owner_id: Uuid, limit: i64) -> Result<Vec<KnowledgeSummary>>;
}

/// Read access to the owner's projects. Projects rank by recency only;
/// they carry no usage counter.
#[async_trait]
pub trait ProjectCollection: Send + Sync {
    async fn list(&self, owner_id: Uuid) -> Result<Vec<ProjectSummary>>;

    async fn recent(&self, owner_id: Uuid, limit: i64) -> Result<Vec<ProjectSummary>>;
}

/// Read access to the owner's tags.
#[async_trait]
pub trait TagCollection: Send + Sync {
    /// Total number of tags the owner has.
    async fn count(&self, owner_id: Uuid) -> Result<i64>;

    /// Tags ranked by usage count, highest first.
    async fn top_by_usage(&self, owner_id: Uuid, limit: i64) -> Result<Vec<TagSummary>>;
}

//! Core data models for telar.
//!
//! Wire names follow the original HTTP contract: camelCase field names,
//! enum values like `"knowledgeItem"` and `"in_app"`. Database persistence
//! goes through the `as_str`/`FromStr` pairs so the stored strings and the
//! serialized strings never diverge.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// =============================================================================
// ENUMERATIONS
// =============================================================================

/// Action performed on a domain entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    View,
    Share,
    Import,
    Export,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Create => "create",
            ActivityAction::Update => "update",
            ActivityAction::Delete => "delete",
            ActivityAction::View => "view",
            ActivityAction::Share => "share",
            ActivityAction::Import => "import",
            ActivityAction::Export => "export",
        }
    }
}

impl FromStr for ActivityAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "create" => Ok(ActivityAction::Create),
            "update" => Ok(ActivityAction::Update),
            "delete" => Ok(ActivityAction::Delete),
            "view" => Ok(ActivityAction::View),
            "share" => Ok(ActivityAction::Share),
            "import" => Ok(ActivityAction::Import),
            "export" => Ok(ActivityAction::Export),
            other => Err(format!("unknown activity action: {}", other)),
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of domain entity an activity refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Resource,
    KnowledgeItem,
    Project,
    Category,
    Tag,
    Dashboard,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Resource => "resource",
            EntityType::KnowledgeItem => "knowledgeItem",
            EntityType::Project => "project",
            EntityType::Category => "category",
            EntityType::Tag => "tag",
            EntityType::Dashboard => "dashboard",
        }
    }

    /// The notification category gating events about this entity type.
    pub fn category(&self) -> NotificationCategory {
        match self {
            EntityType::Resource => NotificationCategory::Resources,
            EntityType::KnowledgeItem => NotificationCategory::Knowledge,
            EntityType::Project => NotificationCategory::Projects,
            EntityType::Tag => NotificationCategory::Tags,
            EntityType::Category => NotificationCategory::Categories,
            EntityType::Dashboard => NotificationCategory::Dashboard,
        }
    }

    /// Spanish display name used in notification templates.
    pub fn display_name(&self) -> &'static str {
        match self {
            EntityType::Resource => "recurso",
            EntityType::KnowledgeItem => "elemento de conocimiento",
            EntityType::Project => "proyecto",
            EntityType::Tag => "etiqueta",
            EntityType::Category => "categoría",
            EntityType::Dashboard => "dashboard",
        }
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "resource" => Ok(EntityType::Resource),
            "knowledgeItem" => Ok(EntityType::KnowledgeItem),
            "project" => Ok(EntityType::Project),
            "category" => Ok(EntityType::Category),
            "tag" => Ok(EntityType::Tag),
            "dashboard" => Ok(EntityType::Dashboard),
            other => Err(format!("unknown entity type: {}", other)),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity/flavor of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Info => "info",
            NotificationType::Success => "success",
            NotificationType::Warning => "warning",
            NotificationType::Error => "error",
        }
    }
}

impl FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "info" => Ok(NotificationType::Info),
            "success" => Ok(NotificationType::Success),
            "warning" => Ok(NotificationType::Warning),
            "error" => Ok(NotificationType::Error),
            other => Err(format!("unknown notification type: {}", other)),
        }
    }
}

/// Notification priority. Defaults to Medium on creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl NotificationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Medium => "medium",
            NotificationPriority::High => "high",
        }
    }
}

impl FromStr for NotificationPriority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "low" => Ok(NotificationPriority::Low),
            "medium" => Ok(NotificationPriority::Medium),
            "high" => Ok(NotificationPriority::High),
            other => Err(format!("unknown notification priority: {}", other)),
        }
    }
}

/// Delivery channel a user can toggle per preference record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    InApp,
    Email,
}

/// Notification category a user can opt out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Resources,
    Knowledge,
    Projects,
    Tags,
    Categories,
    Dashboard,
    System,
}

impl NotificationCategory {
    pub const ALL: [NotificationCategory; 7] = [
        NotificationCategory::Resources,
        NotificationCategory::Knowledge,
        NotificationCategory::Projects,
        NotificationCategory::Tags,
        NotificationCategory::Categories,
        NotificationCategory::Dashboard,
        NotificationCategory::System,
    ];
}

// =============================================================================
// ACTIVITY
// =============================================================================

/// An immutable audit record of one action on one entity.
///
/// Never updated or merged after creation; the system keeps no retention
/// policy for these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub action: ActivityAction,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    #[serde(default)]
    pub details: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_title: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// NOTIFICATION
// =============================================================================

/// A user-visible notification derived from an activity event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub priority: NotificationPriority,
    pub is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_entity_type: Option<EntityType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_entity_id: Option<Uuid>,
    #[serde(default)]
    pub additional_data: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Whether this notification is visible at `now` (unset or future expiry).
    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

// =============================================================================
// NOTIFICATION PREFERENCE
// =============================================================================

/// Per-owner notification preferences. Exactly one record per owner,
/// lazily created with defaults on first access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreference {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub enabled: bool,
    pub channel_preferences: HashMap<NotificationChannel, bool>,
    pub category_preferences: HashMap<NotificationCategory, bool>,
    pub do_not_disturb: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub do_not_disturb_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub do_not_disturb_end: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationPreference {
    /// The defaults record created on first access: enabled, in-app on,
    /// email off, every category allowed, no do-not-disturb.
    pub fn defaults(owner_id: Uuid) -> Self {
        let mut channel_preferences = HashMap::new();
        channel_preferences.insert(NotificationChannel::InApp, true);
        channel_preferences.insert(NotificationChannel::Email, false);

        let mut category_preferences = HashMap::new();
        for category in NotificationCategory::ALL {
            category_preferences.insert(category, true);
        }

        Self {
            id: Uuid::now_v7(),
            owner_id,
            enabled: true,
            channel_preferences,
            category_preferences,
            do_not_disturb: false,
            do_not_disturb_start: None,
            do_not_disturb_end: None,
            updated_at: Utc::now(),
        }
    }

    /// Whether the do-not-disturb window suppresses delivery at `now`.
    ///
    /// The window bounds are absolute timestamps (one-shot, not
    /// daily-recurring) and both bounds are inclusive. A window with either
    /// bound missing never suppresses.
    pub fn in_do_not_disturb(&self, now: DateTime<Utc>) -> bool {
        if !self.do_not_disturb {
            return false;
        }
        match (self.do_not_disturb_start, self.do_not_disturb_end) {
            (Some(start), Some(end)) => now >= start && now <= end,
            _ => false,
        }
    }

    /// Whether a category is allowed. Missing map entries count as allowed,
    /// matching the original document-store behavior.
    pub fn category_allowed(&self, category: NotificationCategory) -> bool {
        self.category_preferences
            .get(&category)
            .copied()
            .unwrap_or(true)
    }
}

// =============================================================================
// DASHBOARD SOURCE SUMMARIES
// =============================================================================

/// Resource type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Documentation,
    Tutorial,
    Link,
    File,
    Video,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Documentation => "documentation",
            ResourceType::Tutorial => "tutorial",
            ResourceType::Link => "link",
            ResourceType::File => "file",
            ResourceType::Video => "video",
        }
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "documentation" => Ok(ResourceType::Documentation),
            "tutorial" => Ok(ResourceType::Tutorial),
            "link" => Ok(ResourceType::Link),
            "file" => Ok(ResourceType::File),
            "video" => Ok(ResourceType::Video),
            other => Err(format!("unknown resource type: {}", other)),
        }
    }
}

/// Knowledge item type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeType {
    Wiki,
    Note,
    Snippet,
    Command,
    Solution,
}

impl KnowledgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KnowledgeType::Wiki => "wiki",
            KnowledgeType::Note => "note",
            KnowledgeType::Snippet => "snippet",
            KnowledgeType::Command => "command",
            KnowledgeType::Solution => "solution",
        }
    }
}

impl FromStr for KnowledgeType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "wiki" => Ok(KnowledgeType::Wiki),
            "note" => Ok(KnowledgeType::Note),
            "snippet" => Ok(KnowledgeType::Snippet),
            "command" => Ok(KnowledgeType::Command),
            "solution" => Ok(KnowledgeType::Solution),
            other => Err(format!("unknown knowledge type: {}", other)),
        }
    }
}

/// Project lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(ProjectStatus::Active),
            "completed" => Ok(ProjectStatus::Completed),
            "archived" => Ok(ProjectStatus::Archived),
            other => Err(format!("unknown project status: {}", other)),
        }
    }
}

/// Owner-scoped resource row as the aggregator reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Owner-scoped knowledge item row as the aggregator reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeSummary {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub knowledge_type: KnowledgeType,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Owner-scoped project row as the aggregator reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
}

/// Owner-scoped tag row with its usage counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSummary {
    pub owner_id: Uuid,
    pub name: String,
    pub usage_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_serde_values() {
        assert_eq!(
            serde_json::to_string(&ActivityAction::Create).unwrap(),
            r#""create""#
        );
        let parsed: ActivityAction = serde_json::from_str(r#""export""#).unwrap();
        assert_eq!(parsed, ActivityAction::Export);
    }

    #[test]
    fn test_entity_type_wire_value_is_camel_case() {
        assert_eq!(
            serde_json::to_string(&EntityType::KnowledgeItem).unwrap(),
            r#""knowledgeItem""#
        );
        assert_eq!(EntityType::KnowledgeItem.as_str(), "knowledgeItem");
        assert_eq!(
            "knowledgeItem".parse::<EntityType>().unwrap(),
            EntityType::KnowledgeItem
        );
    }

    #[test]
    fn test_channel_wire_value_is_snake_case() {
        assert_eq!(
            serde_json::to_string(&NotificationChannel::InApp).unwrap(),
            r#""in_app""#
        );
    }

    #[test]
    fn test_enum_round_trips_through_as_str() {
        for action in [
            ActivityAction::Create,
            ActivityAction::Update,
            ActivityAction::Delete,
            ActivityAction::View,
            ActivityAction::Share,
            ActivityAction::Import,
            ActivityAction::Export,
        ] {
            assert_eq!(action.as_str().parse::<ActivityAction>().unwrap(), action);
        }
        for kind in [
            NotificationType::Info,
            NotificationType::Success,
            NotificationType::Warning,
            NotificationType::Error,
        ] {
            assert_eq!(kind.as_str().parse::<NotificationType>().unwrap(), kind);
        }
    }

    #[test]
    fn test_entity_category_mapping() {
        assert_eq!(
            EntityType::Resource.category(),
            NotificationCategory::Resources
        );
        assert_eq!(
            EntityType::KnowledgeItem.category(),
            NotificationCategory::Knowledge
        );
        assert_eq!(
            EntityType::Project.category(),
            NotificationCategory::Projects
        );
        assert_eq!(EntityType::Tag.category(), NotificationCategory::Tags);
        assert_eq!(
            EntityType::Category.category(),
            NotificationCategory::Categories
        );
        assert_eq!(
            EntityType::Dashboard.category(),
            NotificationCategory::Dashboard
        );
    }

    #[test]
    fn test_display_names_are_spanish() {
        assert_eq!(EntityType::Resource.display_name(), "recurso");
        assert_eq!(
            EntityType::KnowledgeItem.display_name(),
            "elemento de conocimiento"
        );
        assert_eq!(EntityType::Category.display_name(), "categoría");
    }

    #[test]
    fn test_preference_defaults() {
        let owner = Uuid::new_v4();
        let pref = NotificationPreference::defaults(owner);

        assert_eq!(pref.owner_id, owner);
        assert!(pref.enabled);
        assert!(!pref.do_not_disturb);
        assert_eq!(
            pref.channel_preferences.get(&NotificationChannel::InApp),
            Some(&true)
        );
        assert_eq!(
            pref.channel_preferences.get(&NotificationChannel::Email),
            Some(&false)
        );
        assert_eq!(pref.category_preferences.len(), 7);
        assert!(pref
            .category_preferences
            .values()
            .all(|allowed| *allowed));
    }

    #[test]
    fn test_do_not_disturb_bounds_are_inclusive() {
        let mut pref = NotificationPreference::defaults(Uuid::new_v4());
        let start = Utc::now();
        let end = start + chrono::Duration::hours(2);
        pref.do_not_disturb = true;
        pref.do_not_disturb_start = Some(start);
        pref.do_not_disturb_end = Some(end);

        assert!(pref.in_do_not_disturb(start));
        assert!(pref.in_do_not_disturb(end));
        assert!(pref.in_do_not_disturb(start + chrono::Duration::hours(1)));
        assert!(!pref.in_do_not_disturb(start - chrono::Duration::seconds(1)));
        assert!(!pref.in_do_not_disturb(end + chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_do_not_disturb_requires_both_bounds() {
        let mut pref = NotificationPreference::defaults(Uuid::new_v4());
        pref.do_not_disturb = true;
        pref.do_not_disturb_start = Some(Utc::now() - chrono::Duration::hours(1));

        assert!(!pref.in_do_not_disturb(Utc::now()));
    }

    #[test]
    fn test_notification_visibility() {
        let now = Utc::now();
        let mut notification = Notification {
            id: Uuid::now_v7(),
            owner_id: Uuid::new_v4(),
            title: "t".to_string(),
            message: "m".to_string(),
            kind: NotificationType::Info,
            priority: NotificationPriority::default(),
            is_read: false,
            related_entity_type: None,
            related_entity_id: None,
            additional_data: JsonValue::Null,
            expires_at: None,
            created_at: now,
        };

        assert!(notification.is_visible(now));
        notification.expires_at = Some(now + chrono::Duration::days(7));
        assert!(notification.is_visible(now));
        notification.expires_at = Some(now - chrono::Duration::seconds(1));
        assert!(!notification.is_visible(now));
        // Exactly at the expiry instant the notification is no longer visible.
        notification.expires_at = Some(now);
        assert!(!notification.is_visible(now));
    }

    #[test]
    fn test_notification_type_field_serializes_as_type() {
        let n = Notification {
            id: Uuid::now_v7(),
            owner_id: Uuid::new_v4(),
            title: "t".to_string(),
            message: "m".to_string(),
            kind: NotificationType::Success,
            priority: NotificationPriority::High,
            is_read: false,
            related_entity_type: Some(EntityType::Resource),
            related_entity_id: None,
            additional_data: serde_json::json!({}),
            expires_at: None,
            created_at: Utc::now(),
        };

        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["type"], "success");
        assert_eq!(value["priority"], "high");
        assert_eq!(value["relatedEntityType"], "resource");
    }

    #[test]
    fn test_default_priority_is_medium() {
        assert_eq!(NotificationPriority::default(), NotificationPriority::Medium);
    }

    #[test]
    fn test_category_allowed_defaults_to_true_for_missing_entries() {
        let mut pref = NotificationPreference::defaults(Uuid::new_v4());
        pref.category_preferences.clear();
        assert!(pref.category_allowed(NotificationCategory::System));

        pref.category_preferences
            .insert(NotificationCategory::Tags, false);
        assert!(!pref.category_allowed(NotificationCategory::Tags));
    }
}

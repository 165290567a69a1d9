//! Notification derivation, storage, and querying.
//!
//! Notifications are materialized from activity events through an ordered
//! gating policy: the global enable flag, the do-not-disturb window, the
//! per-category opt-outs, and finally the action template. Only create,
//! update, and delete actions become user-visible; everything else the
//! activity log records (view, share, import, export) stays invisible on
//! purpose.
//!
//! The `create` path re-checks the enable flag and the do-not-disturb
//! window so direct callers cannot bypass the gate.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{EntityType, Notification, NotificationType};
use crate::pagination::Page;
use crate::preferences::PreferenceService;
use crate::temporal::parse_timestamp;
use crate::traits::{
    CreateNotificationRequest, ListNotificationsRequest, MarkReadRequest, NotificationRepository,
};
use crate::ActivityAction;

/// Retention for derived notifications. Policy constant, not
/// user-configurable.
pub const NOTIFICATION_TTL_DAYS: i64 = 7;

/// Sort-field whitelist for notification listings.
const SORT_FIELDS: &[(&str, &'static str)] = &[
    ("createdAt", "created_at"),
    ("priority", "priority"),
    ("type", "kind"),
    ("isRead", "is_read"),
];

/// Paginated notification listing with the owner's unread badge count.
///
/// `unread_count` covers every visible unread notification of the owner,
/// independent of the filter that produced `items`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    #[serde(flatten)]
    pub page: Page<Notification>,
    pub unread_count: i64,
}

/// Title, message, and type for a derived notification, or None when the
/// action produces no user-visible notification.
fn template_for(
    action: ActivityAction,
    entity_type: EntityType,
    entity_title: &str,
) -> Option<(String, String, NotificationType)> {
    let name = entity_type.display_name();
    match action {
        ActivityAction::Create => Some((
            format!("Nuevo {} creado", name),
            format!(
                "El {} \"{}\" ha sido creado exitosamente.",
                name, entity_title
            ),
            NotificationType::Success,
        )),
        ActivityAction::Update => Some((
            format!("{} actualizado", name),
            format!("El {} \"{}\" ha sido actualizado.", name, entity_title),
            NotificationType::Info,
        )),
        ActivityAction::Delete => Some((
            format!("{} eliminado", name),
            format!("El {} \"{}\" ha sido eliminado.", name, entity_title),
            NotificationType::Warning,
        )),
        _ => None,
    }
}

/// Service for deriving, storing, and querying notifications.
#[derive(Clone)]
pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
    preferences: PreferenceService,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>, preferences: PreferenceService) -> Self {
        Self { repo, preferences }
    }

    /// Persist a notification unless the owner's preferences suppress it.
    ///
    /// Returns None when suppressed by the enable flag or an active
    /// do-not-disturb window. The optional `expiresAt` string is parsed
    /// here; a malformed value is invalid input.
    pub async fn create(
        &self,
        owner_id: Uuid,
        req: CreateNotificationRequest,
    ) -> Result<Option<Notification>> {
        if req.title.is_empty() || req.message.is_empty() {
            return Err(Error::InvalidInput(
                "notification title and message must not be empty".to_string(),
            ));
        }

        let pref = self.preferences.get_or_create(owner_id).await?;
        let now = Utc::now();

        if !pref.enabled {
            debug!(
                subsystem = "notifications",
                op = "create",
                owner_id = %owner_id,
                "Notifications disabled for owner, suppressing"
            );
            return Ok(None);
        }

        if pref.in_do_not_disturb(now) {
            debug!(
                subsystem = "notifications",
                op = "create",
                owner_id = %owner_id,
                "Do-not-disturb window active, suppressing"
            );
            return Ok(None);
        }

        let expires_at = req
            .expires_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;

        let notification = Notification {
            id: Uuid::now_v7(),
            owner_id,
            title: req.title,
            message: req.message,
            kind: req.kind.unwrap_or(NotificationType::Info),
            priority: req.priority.unwrap_or_default(),
            is_read: false,
            related_entity_type: req.related_entity_type,
            related_entity_id: req.related_entity_id,
            additional_data: req
                .additional_data
                .unwrap_or_else(|| JsonValue::Object(Default::default())),
            expires_at,
            created_at: now,
        };

        self.repo.insert(&notification).await?;
        info!(
            subsystem = "notifications",
            op = "create",
            owner_id = %owner_id,
            notification_id = %notification.id,
            "Notification created"
        );
        Ok(Some(notification))
    }

    /// Derive and persist a notification for an activity event, applying
    /// the gating policy in order. Each failed gate suppresses without a
    /// notification; storage errors propagate to the caller.
    pub async fn derive_and_create(
        &self,
        owner_id: Uuid,
        action: ActivityAction,
        entity_type: EntityType,
        entity_id: Uuid,
        entity_title: &str,
        details: JsonValue,
    ) -> Result<Option<Notification>> {
        let pref = self.preferences.get_or_create(owner_id).await?;

        if !pref.enabled {
            return Ok(None);
        }

        if pref.in_do_not_disturb(Utc::now()) {
            return Ok(None);
        }

        let category = entity_type.category();
        if !pref.category_allowed(category) {
            debug!(
                subsystem = "notifications",
                op = "derive",
                owner_id = %owner_id,
                entity_type = %entity_type,
                "Category opted out, suppressing"
            );
            return Ok(None);
        }

        let Some((title, message, kind)) = template_for(action, entity_type, entity_title) else {
            return Ok(None);
        };

        let expires_at = Utc::now() + Duration::days(NOTIFICATION_TTL_DAYS);

        self.create(
            owner_id,
            CreateNotificationRequest {
                title,
                message,
                kind: Some(kind),
                priority: None,
                related_entity_type: Some(entity_type),
                related_entity_id: Some(entity_id),
                additional_data: Some(details),
                expires_at: Some(expires_at.to_rfc3339()),
            },
        )
        .await
    }

    /// List visible notifications with filters and the standalone unread
    /// count for the badge.
    pub async fn find_all(
        &self,
        owner_id: Uuid,
        req: &ListNotificationsRequest,
    ) -> Result<NotificationPage> {
        let params = req.page.resolve(SORT_FIELDS)?;
        let now = Utc::now();

        let (items, total) = self.repo.list(owner_id, req, &params, now).await?;
        let unread_count = self.repo.unread_count(owner_id, now).await?;

        Ok(NotificationPage {
            page: Page::new(items, total, &params),
            unread_count,
        })
    }

    /// Fetch one notification; NotFound when absent or foreign-owned.
    pub async fn find_one(&self, owner_id: Uuid, id: Uuid) -> Result<Notification> {
        self.repo
            .find(owner_id, id)
            .await?
            .ok_or(Error::NotificationNotFound(id))
    }

    /// Count unread, unexpired notifications for badge polling.
    pub async fn unread_count(&self, owner_id: Uuid) -> Result<i64> {
        self.repo.unread_count(owner_id, Utc::now()).await
    }

    /// Bulk read-state change. `all` wins over the id set; with neither,
    /// nothing changes. Returns the number of notifications actually
    /// flipped.
    pub async fn mark_read(&self, owner_id: Uuid, req: MarkReadRequest) -> Result<u64> {
        let value = req.value.unwrap_or(true);

        let count = if req.all.unwrap_or(false) {
            self.repo.set_read(owner_id, None, value).await?
        } else if let Some(ids) = req.ids.as_deref().filter(|ids| !ids.is_empty()) {
            self.repo.set_read(owner_id, Some(ids), value).await?
        } else {
            0
        };

        if count > 0 {
            info!(
                subsystem = "notifications",
                op = "mark_read",
                owner_id = %owner_id,
                result_count = count,
                value,
                "Updated notification read state"
            );
        }
        Ok(count)
    }

    /// Hard-delete one notification; NotFound when it does not exist.
    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<bool> {
        self.find_one(owner_id, id).await?;
        let deleted = self.repo.delete(owner_id, id).await?;
        if deleted {
            info!(
                subsystem = "notifications",
                op = "delete",
                owner_id = %owner_id,
                notification_id = %id,
                "Notification deleted"
            );
        }
        Ok(deleted)
    }

    /// Hard-delete every notification of the owner; returns the count.
    pub async fn delete_all(&self, owner_id: Uuid) -> Result<u64> {
        let count = self.repo.delete_all(owner_id).await?;
        if count > 0 {
            info!(
                subsystem = "notifications",
                op = "delete_all",
                owner_id = %owner_id,
                result_count = count,
                "Deleted all notifications"
            );
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MemoryNotificationRepository, MemoryPreferenceRepository};
    use crate::models::NotificationPriority;
    use crate::traits::UpdatePreferencesRequest;

    fn services() -> (NotificationService, PreferenceService) {
        let prefs = PreferenceService::new(Arc::new(MemoryPreferenceRepository::new()));
        let svc = NotificationService::new(
            Arc::new(MemoryNotificationRepository::new()),
            prefs.clone(),
        );
        (svc, prefs)
    }

    fn dto(title: &str) -> CreateNotificationRequest {
        CreateNotificationRequest {
            title: title.to_string(),
            message: "mensaje".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_template_create_is_success_typed() {
        let (title, message, kind) =
            template_for(ActivityAction::Create, EntityType::Resource, "Go Concurrency").unwrap();
        assert_eq!(title, "Nuevo recurso creado");
        assert!(message.contains("\"Go Concurrency\""));
        assert!(message.contains("creado exitosamente"));
        assert_eq!(kind, NotificationType::Success);
    }

    #[test]
    fn test_template_update_and_delete() {
        let (title, _, kind) =
            template_for(ActivityAction::Update, EntityType::Project, "X").unwrap();
        assert_eq!(title, "proyecto actualizado");
        assert_eq!(kind, NotificationType::Info);

        let (title, message, kind) =
            template_for(ActivityAction::Delete, EntityType::Tag, "rust").unwrap();
        assert_eq!(title, "etiqueta eliminado");
        assert!(message.contains("ha sido eliminado"));
        assert_eq!(kind, NotificationType::Warning);
    }

    #[test]
    fn test_template_suppresses_non_mutating_actions() {
        for action in [
            ActivityAction::View,
            ActivityAction::Share,
            ActivityAction::Import,
            ActivityAction::Export,
        ] {
            assert!(template_for(action, EntityType::Resource, "t").is_none());
        }
    }

    #[tokio::test]
    async fn test_create_persists_with_defaults() {
        let (svc, _) = services();
        let owner = Uuid::new_v4();

        let created = svc.create(owner, dto("hola")).await.unwrap().unwrap();
        assert_eq!(created.kind, NotificationType::Info);
        assert_eq!(created.priority, NotificationPriority::Medium);
        assert!(!created.is_read);
        assert!(created.expires_at.is_none());

        assert_eq!(svc.unread_count(owner).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_title() {
        let (svc, _) = services();
        let result = svc.create(Uuid::new_v4(), dto("")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_create_suppressed_when_disabled() {
        let (svc, prefs) = services();
        let owner = Uuid::new_v4();
        prefs
            .update(
                owner,
                UpdatePreferencesRequest {
                    enabled: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let created = svc.create(owner, dto("hola")).await.unwrap();
        assert!(created.is_none());
        assert_eq!(svc.unread_count(owner).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_suppressed_inside_dnd_window() {
        let (svc, prefs) = services();
        let owner = Uuid::new_v4();
        let start = Utc::now() - Duration::hours(1);
        let end = Utc::now() + Duration::hours(1);
        prefs
            .update(
                owner,
                UpdatePreferencesRequest {
                    do_not_disturb: Some(true),
                    do_not_disturb_start: Some(start.to_rfc3339()),
                    do_not_disturb_end: Some(end.to_rfc3339()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(svc.create(owner, dto("hola")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_allowed_outside_dnd_window() {
        let (svc, prefs) = services();
        let owner = Uuid::new_v4();
        let start = Utc::now() - Duration::hours(3);
        let end = Utc::now() - Duration::hours(1);
        prefs
            .update(
                owner,
                UpdatePreferencesRequest {
                    do_not_disturb: Some(true),
                    do_not_disturb_start: Some(start.to_rfc3339()),
                    do_not_disturb_end: Some(end.to_rfc3339()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(svc.create(owner, dto("hola")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_normalizes_expiry_string() {
        let (svc, _) = services();
        let owner = Uuid::new_v4();

        let mut req = dto("hola");
        req.expires_at = Some("2099-01-01T00:00:00Z".to_string());
        let created = svc.create(owner, req).await.unwrap().unwrap();
        assert_eq!(
            created.expires_at.unwrap().to_rfc3339(),
            "2099-01-01T00:00:00+00:00"
        );

        let mut req = dto("hola");
        req.expires_at = Some("mañana".to_string());
        assert!(matches!(
            svc.create(owner, req).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_derive_creates_for_each_mutating_action() {
        let (svc, _) = services();
        let owner = Uuid::new_v4();
        let entity = Uuid::new_v4();

        let cases = [
            (ActivityAction::Create, NotificationType::Success),
            (ActivityAction::Update, NotificationType::Info),
            (ActivityAction::Delete, NotificationType::Warning),
        ];
        for (action, expected) in cases {
            let derived = svc
                .derive_and_create(
                    owner,
                    action,
                    EntityType::KnowledgeItem,
                    entity,
                    "Patrones async",
                    serde_json::json!({}),
                )
                .await
                .unwrap()
                .unwrap();
            assert_eq!(derived.kind, expected);
            assert_eq!(derived.related_entity_type, Some(EntityType::KnowledgeItem));
            assert_eq!(derived.related_entity_id, Some(entity));
        }

        assert_eq!(svc.unread_count(owner).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_derive_suppresses_non_mutating_actions() {
        let (svc, _) = services();
        let owner = Uuid::new_v4();

        for action in [
            ActivityAction::View,
            ActivityAction::Share,
            ActivityAction::Import,
            ActivityAction::Export,
        ] {
            let derived = svc
                .derive_and_create(
                    owner,
                    action,
                    EntityType::Resource,
                    Uuid::new_v4(),
                    "t",
                    serde_json::json!({}),
                )
                .await
                .unwrap();
            assert!(derived.is_none());
        }
        assert_eq!(svc.unread_count(owner).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_derive_sets_seven_day_expiry() {
        let (svc, _) = services();
        let owner = Uuid::new_v4();

        let derived = svc
            .derive_and_create(
                owner,
                ActivityAction::Create,
                EntityType::Resource,
                Uuid::new_v4(),
                "Go Concurrency",
                serde_json::json!({}),
            )
            .await
            .unwrap()
            .unwrap();

        let expected = Utc::now() + Duration::days(NOTIFICATION_TTL_DAYS);
        let delta = (derived.expires_at.unwrap() - expected).num_seconds().abs();
        assert!(delta < 5, "expiry should be about seven days out");
    }

    #[tokio::test]
    async fn test_derive_respects_category_opt_out() {
        let (svc, prefs) = services();
        let owner = Uuid::new_v4();

        let mut categories = std::collections::HashMap::new();
        categories.insert(crate::models::NotificationCategory::Tags, false);
        prefs
            .update(
                owner,
                UpdatePreferencesRequest {
                    category_preferences: Some(categories),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let suppressed = svc
            .derive_and_create(
                owner,
                ActivityAction::Create,
                EntityType::Tag,
                Uuid::new_v4(),
                "rust",
                serde_json::json!({}),
            )
            .await
            .unwrap();
        assert!(suppressed.is_none());

        // Other categories are unaffected.
        let derived = svc
            .derive_and_create(
                owner,
                ActivityAction::Create,
                EntityType::Resource,
                Uuid::new_v4(),
                "Go Concurrency",
                serde_json::json!({}),
            )
            .await
            .unwrap();
        assert!(derived.is_some());
    }

    #[tokio::test]
    async fn test_derive_disabled_wins_over_category_settings() {
        let (svc, prefs) = services();
        let owner = Uuid::new_v4();
        prefs
            .update(
                owner,
                UpdatePreferencesRequest {
                    enabled: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        for entity_type in [
            EntityType::Resource,
            EntityType::KnowledgeItem,
            EntityType::Project,
            EntityType::Category,
            EntityType::Tag,
            EntityType::Dashboard,
        ] {
            let derived = svc
                .derive_and_create(
                    owner,
                    ActivityAction::Create,
                    entity_type,
                    Uuid::new_v4(),
                    "t",
                    serde_json::json!({}),
                )
                .await
                .unwrap();
            assert!(derived.is_none());
        }
    }

    #[tokio::test]
    async fn test_find_all_hides_expired_and_reports_unread_independently() {
        let (svc, _) = services();
        let owner = Uuid::new_v4();

        let mut expired = dto("vieja");
        expired.expires_at = Some((Utc::now() - Duration::hours(1)).to_rfc3339());
        svc.create(owner, expired).await.unwrap();

        svc.create(owner, dto("actual")).await.unwrap();

        let page = svc
            .find_all(owner, &ListNotificationsRequest::default())
            .await
            .unwrap();
        assert_eq!(page.page.total, 1);
        assert_eq!(page.page.items[0].title, "actual");
        assert_eq!(page.unread_count, 1);

        // Filtering to read notifications still reports the global unread count.
        let read_filter = ListNotificationsRequest {
            is_read: Some(true),
            ..Default::default()
        };
        let page = svc.find_all(owner, &read_filter).await.unwrap();
        assert_eq!(page.page.total, 0);
        assert_eq!(page.unread_count, 1);
    }

    #[tokio::test]
    async fn test_mark_read_all_then_new_notifications_count_unread() {
        let (svc, _) = services();
        let owner = Uuid::new_v4();

        svc.create(owner, dto("uno")).await.unwrap();
        svc.create(owner, dto("dos")).await.unwrap();

        let changed = svc
            .mark_read(
                owner,
                MarkReadRequest {
                    all: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(changed, 2);
        assert_eq!(svc.unread_count(owner).await.unwrap(), 0);

        svc.create(owner, dto("tres")).await.unwrap();
        assert_eq!(svc.unread_count(owner).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_counts_only_changed_rows() {
        let (svc, _) = services();
        let owner = Uuid::new_v4();

        let first = svc.create(owner, dto("uno")).await.unwrap().unwrap();
        svc.create(owner, dto("dos")).await.unwrap();

        let changed = svc
            .mark_read(
                owner,
                MarkReadRequest {
                    ids: Some(vec![first.id]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(changed, 1);

        // Marking the same notification again changes nothing.
        let changed = svc
            .mark_read(
                owner,
                MarkReadRequest {
                    ids: Some(vec![first.id]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(changed, 0);
    }

    #[tokio::test]
    async fn test_mark_read_all_wins_over_ids() {
        let (svc, _) = services();
        let owner = Uuid::new_v4();

        let first = svc.create(owner, dto("uno")).await.unwrap().unwrap();
        svc.create(owner, dto("dos")).await.unwrap();

        let changed = svc
            .mark_read(
                owner,
                MarkReadRequest {
                    all: Some(true),
                    ids: Some(vec![first.id]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(changed, 2);
    }

    #[tokio::test]
    async fn test_mark_read_without_target_is_a_noop() {
        let (svc, _) = services();
        let owner = Uuid::new_v4();
        svc.create(owner, dto("uno")).await.unwrap();

        let changed = svc
            .mark_read(owner, MarkReadRequest::default())
            .await
            .unwrap();
        assert_eq!(changed, 0);
        assert_eq!(svc.unread_count(owner).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_unread() {
        let (svc, _) = services();
        let owner = Uuid::new_v4();
        svc.create(owner, dto("uno")).await.unwrap();

        svc.mark_read(
            owner,
            MarkReadRequest {
                all: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let changed = svc
            .mark_read(
                owner,
                MarkReadRequest {
                    all: Some(true),
                    value: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(svc.unread_count(owner).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_unknown_notification_is_not_found() {
        let (svc, _) = services();
        let result = svc.delete(Uuid::new_v4(), Uuid::new_v4()).await;
        assert!(matches!(result, Err(Error::NotificationNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_is_owner_scoped() {
        let (svc, _) = services();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();

        let n = svc.create(owner, dto("uno")).await.unwrap().unwrap();
        assert!(matches!(
            svc.delete(other, n.id).await,
            Err(Error::NotificationNotFound(_))
        ));
        assert!(svc.delete(owner, n.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_all_returns_count() {
        let (svc, _) = services();
        let owner = Uuid::new_v4();
        svc.create(owner, dto("uno")).await.unwrap();
        svc.create(owner, dto("dos")).await.unwrap();

        assert_eq!(svc.delete_all(owner).await.unwrap(), 2);
        assert_eq!(svc.delete_all(owner).await.unwrap(), 0);
    }
}

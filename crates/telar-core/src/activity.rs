//! Activity recording and querying.
//!
//! The recorder is the entry point of the derivation pipeline: domain
//! modules hand it an [`ActivityEvent`] after their primary write commits.
//! Recording is at-most-once and fail-open — a storage failure is logged
//! and reported as "no record" so it can never abort the business
//! operation that triggered it. After a successful append the same event
//! is fed synchronously into notification derivation, and derivation
//! errors are swallowed the same way.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveTime, Utc};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::events::ActivityEvent;
use crate::models::{Activity, ActivityAction, EntityType};
use crate::notify::NotificationService;
use crate::pagination::Page;
use crate::traits::{ActivityRepository, ListActivitiesRequest, TimelinePoint};

/// Sort-field whitelist for activity listings.
const SORT_FIELDS: &[(&str, &'static str)] = &[
    ("createdAt", "created_at"),
    ("action", "action"),
    ("entityType", "entity_type"),
    ("entityTitle", "entity_title"),
];

/// Service recording activity events and answering activity queries.
#[derive(Clone)]
pub struct ActivityRecorder {
    repo: Arc<dyn ActivityRepository>,
    notifications: NotificationService,
}

impl ActivityRecorder {
    pub fn new(repo: Arc<dyn ActivityRepository>, notifications: NotificationService) -> Self {
        Self {
            repo,
            notifications,
        }
    }

    /// Append one activity record and derive its notification.
    ///
    /// Best-effort: a storage failure during the append returns `None`
    /// instead of an error, and a derivation failure after a successful
    /// append is logged and ignored. The caller's own operation must never
    /// be blocked or rolled back from here.
    pub async fn record(&self, event: ActivityEvent) -> Option<Activity> {
        let owner_id = event.owner_id;
        let activity = event.into_activity(Utc::now());

        if let Err(e) = self.repo.insert(&activity).await {
            error!(
                subsystem = "activity",
                component = "recorder",
                op = "record",
                owner_id = %owner_id,
                error = %e,
                "Failed to record activity"
            );
            return None;
        }

        debug!(
            subsystem = "activity",
            component = "recorder",
            op = "record",
            owner_id = %owner_id,
            activity_id = %activity.id,
            action = %activity.action,
            entity_type = %activity.entity_type,
            "Activity recorded"
        );

        let title = activity.entity_title.clone().unwrap_or_default();
        if let Err(e) = self
            .notifications
            .derive_and_create(
                activity.owner_id,
                activity.action,
                activity.entity_type,
                activity.entity_id,
                &title,
                activity.details.clone(),
            )
            .await
        {
            warn!(
                subsystem = "activity",
                component = "recorder",
                op = "derive",
                owner_id = %owner_id,
                activity_id = %activity.id,
                error = %e,
                "Notification derivation failed, activity kept"
            );
        }

        Some(activity)
    }

    /// List activity records with filtering and pagination.
    pub async fn list(
        &self,
        owner_id: Uuid,
        req: &ListActivitiesRequest,
    ) -> Result<Page<Activity>> {
        let params = req.page.resolve(SORT_FIELDS)?;
        let (items, total) = self.repo.list(owner_id, req, &params).await?;
        Ok(Page::new(items, total, &params))
    }

    /// Most recent activity records, newest first.
    pub async fn recent(&self, owner_id: Uuid, limit: i64) -> Result<Vec<Activity>> {
        self.repo.recent(owner_id, limit).await
    }

    /// Record counts grouped by entity type.
    pub async fn counts_by_entity_type(
        &self,
        owner_id: Uuid,
    ) -> Result<HashMap<EntityType, i64>> {
        self.repo.counts_by_entity_type(owner_id).await
    }

    /// Record counts grouped by action.
    pub async fn counts_by_action(&self, owner_id: Uuid) -> Result<HashMap<ActivityAction, i64>> {
        self.repo.counts_by_action(owner_id).await
    }

    /// Calendar-day activity buckets over the trailing `days` window,
    /// ascending. The window starts at midnight `days` days ago, so a
    /// full day is counted even when the query runs mid-day.
    pub async fn timeline(&self, owner_id: Uuid, days: i64) -> Result<Vec<TimelinePoint>> {
        let since = (Utc::now() - Duration::days(days))
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc();
        self.repo.timeline(owner_id, since).await
    }
}

//! In-memory repositories for deterministic testing.
//!
//! Every storage trait has a `Memory*` implementation backed by a plain
//! `Mutex`-guarded collection, matching the query semantics of the
//! PostgreSQL layer closely enough that the services can be exercised
//! without a database. Write failures can be injected to test the
//! fail-open paths.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use telar_core::mock::MemoryActivityRepository;
//!
//! let repo = Arc::new(MemoryActivityRepository::new());
//! let flaky = Arc::new(MemoryActivityRepository::new().with_failing_writes());
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::*;
use crate::pagination::ListParams;
use crate::traits::*;

/// The error every injected write failure returns.
fn storage_failure() -> Error {
    Error::Database(sqlx::Error::PoolClosed)
}

fn paginate<T>(mut items: Vec<T>, params: &ListParams) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let items = items
        .drain(..)
        .skip(params.skip as usize)
        .take(params.limit as usize)
        .collect();
    (items, total)
}

// =============================================================================
// ACTIVITY
// =============================================================================

/// In-memory [`ActivityRepository`].
#[derive(Default)]
pub struct MemoryActivityRepository {
    records: Mutex<Vec<Activity>>,
    fail_writes: bool,
}

impl MemoryActivityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail with a storage error.
    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }
}

fn sort_activities(items: &mut [Activity], params: &ListParams) {
    items.sort_by(|a, b| {
        let ordering = match params.sort_column {
            "action" => a.action.as_str().cmp(b.action.as_str()),
            "entity_type" => a.entity_type.as_str().cmp(b.entity_type.as_str()),
            "entity_title" => a.entity_title.cmp(&b.entity_title),
            _ => a.created_at.cmp(&b.created_at),
        };
        // Tie-break on id so ordering stays deterministic.
        ordering.then_with(|| a.id.cmp(&b.id))
    });
    if params.descending {
        items.reverse();
    }
}

#[async_trait]
impl ActivityRepository for MemoryActivityRepository {
    async fn insert(&self, activity: &Activity) -> Result<()> {
        if self.fail_writes {
            return Err(storage_failure());
        }
        self.records.lock().unwrap().push(activity.clone());
        Ok(())
    }

    async fn list(
        &self,
        owner_id: Uuid,
        req: &ListActivitiesRequest,
        params: &ListParams,
    ) -> Result<(Vec<Activity>, i64)> {
        let records = self.records.lock().unwrap();
        let search = req.search.as_deref().map(str::to_lowercase);
        let mut matches: Vec<Activity> = records
            .iter()
            .filter(|a| a.owner_id == owner_id)
            .filter(|a| {
                req.actions
                    .as_ref()
                    .map_or(true, |set| set.contains(&a.action))
            })
            .filter(|a| {
                req.entity_types
                    .as_ref()
                    .map_or(true, |set| set.contains(&a.entity_type))
            })
            .filter(|a| req.entity_id.map_or(true, |id| a.entity_id == id))
            .filter(|a| {
                req.tags
                    .as_ref()
                    .map_or(true, |tags| a.tags.iter().any(|t| tags.contains(t)))
            })
            .filter(|a| {
                search.as_deref().map_or(true, |needle| {
                    a.entity_title
                        .as_deref()
                        .map_or(false, |t| t.to_lowercase().contains(needle))
                })
            })
            .filter(|a| req.start_date.map_or(true, |d| a.created_at >= d))
            .filter(|a| req.end_date.map_or(true, |d| a.created_at <= d))
            .cloned()
            .collect();

        sort_activities(&mut matches, params);
        Ok(paginate(matches, params))
    }

    async fn recent(&self, owner_id: Uuid, limit: i64) -> Result<Vec<Activity>> {
        let records = self.records.lock().unwrap();
        let mut matches: Vec<Activity> = records
            .iter()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches.truncate(limit.max(0) as usize);
        Ok(matches)
    }

    async fn counts_by_entity_type(&self, owner_id: Uuid) -> Result<HashMap<EntityType, i64>> {
        let records = self.records.lock().unwrap();
        let mut counts = HashMap::new();
        for record in records.iter().filter(|a| a.owner_id == owner_id) {
            *counts.entry(record.entity_type).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn counts_by_action(&self, owner_id: Uuid) -> Result<HashMap<ActivityAction, i64>> {
        let records = self.records.lock().unwrap();
        let mut counts = HashMap::new();
        for record in records.iter().filter(|a| a.owner_id == owner_id) {
            *counts.entry(record.action).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn timeline(&self, owner_id: Uuid, since: DateTime<Utc>) -> Result<Vec<TimelinePoint>> {
        let records = self.records.lock().unwrap();
        let mut buckets: BTreeMap<chrono::NaiveDate, i64> = BTreeMap::new();
        for record in records
            .iter()
            .filter(|a| a.owner_id == owner_id && a.created_at >= since)
        {
            *buckets.entry(record.created_at.date_naive()).or_insert(0) += 1;
        }
        Ok(buckets
            .into_iter()
            .map(|(date, count)| TimelinePoint { date, count })
            .collect())
    }
}

// =============================================================================
// PREFERENCES
// =============================================================================

/// In-memory [`PreferenceRepository`].
#[derive(Default)]
pub struct MemoryPreferenceRepository {
    records: Mutex<HashMap<Uuid, NotificationPreference>>,
    fail_writes: bool,
}

impl MemoryPreferenceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }
}

#[async_trait]
impl PreferenceRepository for MemoryPreferenceRepository {
    async fn find(&self, owner_id: Uuid) -> Result<Option<NotificationPreference>> {
        Ok(self.records.lock().unwrap().get(&owner_id).cloned())
    }

    async fn insert(&self, pref: &NotificationPreference) -> Result<()> {
        if self.fail_writes {
            return Err(storage_failure());
        }
        self.records
            .lock()
            .unwrap()
            .insert(pref.owner_id, pref.clone());
        Ok(())
    }

    async fn save(&self, pref: &NotificationPreference) -> Result<()> {
        if self.fail_writes {
            return Err(storage_failure());
        }
        self.records
            .lock()
            .unwrap()
            .insert(pref.owner_id, pref.clone());
        Ok(())
    }
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// In-memory [`NotificationRepository`].
#[derive(Default)]
pub struct MemoryNotificationRepository {
    records: Mutex<Vec<Notification>>,
    fail_writes: bool,
}

impl MemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }
}

fn sort_notifications(items: &mut [Notification], params: &ListParams) {
    items.sort_by(|a, b| {
        let ordering = match params.sort_column {
            // Text columns sort lexicographically, matching the database.
            "kind" => a.kind.as_str().cmp(b.kind.as_str()),
            "priority" => a.priority.as_str().cmp(b.priority.as_str()),
            "is_read" => a.is_read.cmp(&b.is_read),
            _ => a.created_at.cmp(&b.created_at),
        };
        ordering.then_with(|| a.id.cmp(&b.id))
    });
    if params.descending {
        items.reverse();
    }
}

#[async_trait]
impl NotificationRepository for MemoryNotificationRepository {
    async fn insert(&self, notification: &Notification) -> Result<()> {
        if self.fail_writes {
            return Err(storage_failure());
        }
        self.records.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn find(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Notification>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.owner_id == owner_id && n.id == id)
            .cloned())
    }

    async fn list(
        &self,
        owner_id: Uuid,
        req: &ListNotificationsRequest,
        params: &ListParams,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Notification>, i64)> {
        let records = self.records.lock().unwrap();
        let search = req.search.as_deref().map(str::to_lowercase);
        let mut matches: Vec<Notification> = records
            .iter()
            .filter(|n| n.owner_id == owner_id && n.is_visible(now))
            .filter(|n| req.is_read.map_or(true, |read| n.is_read == read))
            .filter(|n| {
                req.types
                    .as_ref()
                    .map_or(true, |set| set.contains(&n.kind))
            })
            .filter(|n| {
                req.priorities
                    .as_ref()
                    .map_or(true, |set| set.contains(&n.priority))
            })
            .filter(|n| {
                req.related_entity_type
                    .map_or(true, |t| n.related_entity_type == Some(t))
            })
            .filter(|n| {
                req.related_entity_id
                    .map_or(true, |id| n.related_entity_id == Some(id))
            })
            .filter(|n| {
                search.as_deref().map_or(true, |needle| {
                    n.title.to_lowercase().contains(needle)
                        || n.message.to_lowercase().contains(needle)
                })
            })
            .filter(|n| req.start_date.map_or(true, |d| n.created_at >= d))
            .filter(|n| req.end_date.map_or(true, |d| n.created_at <= d))
            .cloned()
            .collect();

        sort_notifications(&mut matches, params);
        Ok(paginate(matches, params))
    }

    async fn unread_count(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<i64> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.owner_id == owner_id && !n.is_read && n.is_visible(now))
            .count() as i64)
    }

    async fn set_read(&self, owner_id: Uuid, ids: Option<&[Uuid]>, value: bool) -> Result<u64> {
        if self.fail_writes {
            return Err(storage_failure());
        }
        let mut records = self.records.lock().unwrap();
        let mut changed = 0;
        for record in records.iter_mut().filter(|n| {
            n.owner_id == owner_id && ids.map_or(true, |ids| ids.contains(&n.id))
        }) {
            if record.is_read != value {
                record.is_read = value;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<bool> {
        if self.fail_writes {
            return Err(storage_failure());
        }
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|n| !(n.owner_id == owner_id && n.id == id));
        Ok(records.len() < before)
    }

    async fn delete_all(&self, owner_id: Uuid) -> Result<u64> {
        if self.fail_writes {
            return Err(storage_failure());
        }
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|n| n.owner_id != owner_id);
        Ok((before - records.len()) as u64)
    }
}

// =============================================================================
// DASHBOARD SOURCE COLLECTIONS
// =============================================================================

/// In-memory [`ResourceCollection`].
#[derive(Default)]
pub struct MemoryResourceCollection {
    rows: Mutex<Vec<ResourceSummary>>,
}

impl MemoryResourceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, row: ResourceSummary) {
        self.rows.lock().unwrap().push(row);
    }
}

#[async_trait]
impl ResourceCollection for MemoryResourceCollection {
    async fn list(&self, owner_id: Uuid) -> Result<Vec<ResourceSummary>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn recent(&self, owner_id: Uuid, limit: i64) -> Result<Vec<ResourceSummary>> {
        let mut rows = self.list(owner_id).await?;
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn most_used(&self, owner_id: Uuid, limit: i64) -> Result<Vec<ResourceSummary>> {
        let mut rows = self.list(owner_id).await?;
        rows.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }
}

/// In-memory [`KnowledgeCollection`].
#[derive(Default)]
pub struct MemoryKnowledgeCollection {
    rows: Mutex<Vec<KnowledgeSummary>>,
}

impl MemoryKnowledgeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, row: KnowledgeSummary) {
        self.rows.lock().unwrap().push(row);
    }
}

#[async_trait]
impl KnowledgeCollection for MemoryKnowledgeCollection {
    async fn list(&self, owner_id: Uuid) -> Result<Vec<KnowledgeSummary>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn recent(&self, owner_id: Uuid, limit: i64) -> Result<Vec<KnowledgeSummary>> {
        let mut rows = self.list(owner_id).await?;
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn most_used(&self, owner_id: Uuid, limit: i64) -> Result<Vec<KnowledgeSummary>> {
        let mut rows = self.list(owner_id).await?;
        rows.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }
}

/// In-memory [`ProjectCollection`].
#[derive(Default)]
pub struct MemoryProjectCollection {
    rows: Mutex<Vec<ProjectSummary>>,
}

impl MemoryProjectCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, row: ProjectSummary) {
        self.rows.lock().unwrap().push(row);
    }
}

#[async_trait]
impl ProjectCollection for MemoryProjectCollection {
    async fn list(&self, owner_id: Uuid) -> Result<Vec<ProjectSummary>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn recent(&self, owner_id: Uuid, limit: i64) -> Result<Vec<ProjectSummary>> {
        let mut rows = self.list(owner_id).await?;
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }
}

/// In-memory [`TagCollection`].
#[derive(Default)]
pub struct MemoryTagCollection {
    rows: Mutex<Vec<TagSummary>>,
}

impl MemoryTagCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, row: TagSummary) {
        self.rows.lock().unwrap().push(row);
    }
}

#[async_trait]
impl TagCollection for MemoryTagCollection {
    async fn count(&self, owner_id: Uuid) -> Result<i64> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .count() as i64)
    }

    async fn top_by_usage(&self, owner_id: Uuid, limit: i64) -> Result<Vec<TagSummary>> {
        let mut rows: Vec<TagSummary> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }
}

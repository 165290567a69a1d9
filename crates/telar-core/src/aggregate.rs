//! Dashboard aggregation.
//!
//! Pull-based: every value here is computed on read from the owner's
//! domain collections and never persisted. Stat blocks are counted
//! client-side from full owner-scoped loads; a store-side aggregation is
//! acceptable as long as the counts come out identical.
//!
//! The recent-activity merge carries an explicit type tag per item. The
//! original inferred the type from the record's shape (presence of a
//! `content`, `url`, or `status` field), which misclassifies as soon as a
//! collection grows a similarly-named field; the tagged representation
//! produces the same classification for all existing data.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{
    KnowledgeSummary, KnowledgeType, ProjectStatus, ProjectSummary, ResourceSummary, ResourceType,
};
use crate::traits::{
    KnowledgeCollection, ProjectCollection, ResourceCollection, TagCollection, TimelinePoint,
};

/// Trailing window of the dashboard activity timeline, in days.
pub const DASHBOARD_TIMELINE_DAYS: i64 = 30;

/// Number of entries in the dashboard recent-activity merge.
pub const DASHBOARD_RECENT_LIMIT: usize = 10;

/// Number of tags in the popular-tags ranking.
pub const POPULAR_TAGS_LIMIT: i64 = 10;

/// Resource counts by type discriminant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStats {
    pub total: i64,
    pub documentation: i64,
    pub tutorial: i64,
    pub link: i64,
    pub file: i64,
    pub video: i64,
}

/// Knowledge item counts by type discriminant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeStats {
    pub total: i64,
    pub wiki: i64,
    pub note: i64,
    pub snippet: i64,
    pub command: i64,
    pub solution: i64,
}

/// Project counts by status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub total: i64,
    pub active: i64,
    pub completed: i64,
    pub archived: i64,
}

/// One entry of the popular-tags ranking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagCount {
    pub name: String,
    pub count: i64,
}

/// Collection a merged dashboard item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Resource,
    Knowledge,
    Project,
}

/// One entry of the recent-activity merge.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentItem {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub title: String,
    pub id: Uuid,
    pub date: DateTime<Utc>,
}

/// One entry of a per-collection recency or usage ranking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedItem {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_count: Option<i64>,
}

/// The full dashboard statistics payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub resources: ResourceStats,
    pub knowledge: KnowledgeStats,
    pub projects: ProjectStats,
    pub total_tags: i64,
    pub popular_tags: Vec<TagCount>,
    pub activity_timeline: Vec<TimelinePoint>,
    pub recent_activity: Vec<RecentItem>,
}

fn resource_stats(rows: &[ResourceSummary]) -> ResourceStats {
    let count = |t: ResourceType| rows.iter().filter(|r| r.resource_type == t).count() as i64;
    ResourceStats {
        total: rows.len() as i64,
        documentation: count(ResourceType::Documentation),
        tutorial: count(ResourceType::Tutorial),
        link: count(ResourceType::Link),
        file: count(ResourceType::File),
        video: count(ResourceType::Video),
    }
}

fn knowledge_stats(rows: &[KnowledgeSummary]) -> KnowledgeStats {
    let count = |t: KnowledgeType| rows.iter().filter(|r| r.knowledge_type == t).count() as i64;
    KnowledgeStats {
        total: rows.len() as i64,
        wiki: count(KnowledgeType::Wiki),
        note: count(KnowledgeType::Note),
        snippet: count(KnowledgeType::Snippet),
        command: count(KnowledgeType::Command),
        solution: count(KnowledgeType::Solution),
    }
}

fn project_stats(rows: &[ProjectSummary]) -> ProjectStats {
    let count = |s: ProjectStatus| rows.iter().filter(|r| r.status == s).count() as i64;
    ProjectStats {
        total: rows.len() as i64,
        active: count(ProjectStatus::Active),
        completed: count(ProjectStatus::Completed),
        archived: count(ProjectStatus::Archived),
    }
}

/// On-demand dashboard statistics over one owner's collections.
#[derive(Clone)]
pub struct Aggregator {
    resources: Arc<dyn ResourceCollection>,
    knowledge: Arc<dyn KnowledgeCollection>,
    projects: Arc<dyn ProjectCollection>,
    tags: Arc<dyn TagCollection>,
}

impl Aggregator {
    pub fn new(
        resources: Arc<dyn ResourceCollection>,
        knowledge: Arc<dyn KnowledgeCollection>,
        projects: Arc<dyn ProjectCollection>,
        tags: Arc<dyn TagCollection>,
    ) -> Self {
        Self {
            resources,
            knowledge,
            projects,
            tags,
        }
    }

    /// Compute the full dashboard payload for one owner.
    pub async fn dashboard_stats(&self, owner_id: Uuid) -> Result<DashboardStats> {
        let resources = self.resources.list(owner_id).await?;
        let knowledge = self.knowledge.list(owner_id).await?;
        let projects = self.projects.list(owner_id).await?;

        let total_tags = self.tags.count(owner_id).await?;
        let popular_tags = self
            .tags
            .top_by_usage(owner_id, POPULAR_TAGS_LIMIT)
            .await?
            .into_iter()
            .map(|tag| TagCount {
                name: tag.name,
                count: tag.usage_count,
            })
            .collect();

        let mut merged: Vec<RecentItem> = Vec::new();
        merged.extend(resources.iter().map(|r| RecentItem {
            kind: ItemKind::Resource,
            title: r.title.clone(),
            id: r.id,
            date: r.created_at,
        }));
        merged.extend(knowledge.iter().map(|k| RecentItem {
            kind: ItemKind::Knowledge,
            title: k.title.clone(),
            id: k.id,
            date: k.created_at,
        }));
        merged.extend(projects.iter().map(|p| RecentItem {
            kind: ItemKind::Project,
            title: p.name.clone(),
            id: p.id,
            date: p.created_at,
        }));

        let activity_timeline = timeline_over(&merged, Utc::now());

        let mut recent_activity = merged;
        recent_activity.sort_by(|a, b| b.date.cmp(&a.date));
        recent_activity.truncate(DASHBOARD_RECENT_LIMIT);

        debug!(
            subsystem = "aggregate",
            op = "dashboard_stats",
            owner_id = %owner_id,
            result_count = recent_activity.len(),
            "Computed dashboard statistics"
        );

        Ok(DashboardStats {
            resources: resource_stats(&resources),
            knowledge: knowledge_stats(&knowledge),
            projects: project_stats(&projects),
            total_tags,
            popular_tags,
            activity_timeline,
            recent_activity,
        })
    }

    /// Most recently created items of one collection, newest first.
    pub async fn recent_items(
        &self,
        owner_id: Uuid,
        kind: &str,
        limit: i64,
    ) -> Result<Vec<RankedItem>> {
        match kind {
            "resources" => Ok(self
                .resources
                .recent(owner_id, limit)
                .await?
                .into_iter()
                .map(ranked_resource)
                .collect()),
            "knowledge" => Ok(self
                .knowledge
                .recent(owner_id, limit)
                .await?
                .into_iter()
                .map(ranked_knowledge)
                .collect()),
            "projects" => Ok(self
                .projects
                .recent(owner_id, limit)
                .await?
                .into_iter()
                .map(ranked_project)
                .collect()),
            other => Err(Error::InvalidInput(format!("invalid item type: {}", other))),
        }
    }

    /// Items of one collection ranked by usage count. Projects carry no
    /// usage counter and are not a valid kind here.
    pub async fn most_used_items(
        &self,
        owner_id: Uuid,
        kind: &str,
        limit: i64,
    ) -> Result<Vec<RankedItem>> {
        match kind {
            "resources" => Ok(self
                .resources
                .most_used(owner_id, limit)
                .await?
                .into_iter()
                .map(ranked_resource)
                .collect()),
            "knowledge" => Ok(self
                .knowledge
                .most_used(owner_id, limit)
                .await?
                .into_iter()
                .map(ranked_knowledge)
                .collect()),
            other => Err(Error::InvalidInput(format!("invalid item type: {}", other))),
        }
    }
}

/// Calendar-day buckets over the trailing window, one entry per day
/// including zero-count days, ascending.
fn timeline_over(items: &[RecentItem], now: DateTime<Utc>) -> Vec<TimelinePoint> {
    let today = now.date_naive();
    (0..DASHBOARD_TIMELINE_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let count = items
                .iter()
                .filter(|item| item.date.date_naive() == date)
                .count() as i64;
            TimelinePoint { date, count }
        })
        .collect()
}

fn ranked_resource(r: ResourceSummary) -> RankedItem {
    RankedItem {
        kind: ItemKind::Resource,
        id: r.id,
        title: r.title,
        created_at: r.created_at,
        usage_count: Some(r.usage_count),
    }
}

fn ranked_knowledge(k: KnowledgeSummary) -> RankedItem {
    RankedItem {
        kind: ItemKind::Knowledge,
        id: k.id,
        title: k.title,
        created_at: k.created_at,
        usage_count: Some(k.usage_count),
    }
}

fn ranked_project(p: ProjectSummary) -> RankedItem {
    RankedItem {
        kind: ItemKind::Project,
        id: p.id,
        title: p.name,
        created_at: p.created_at,
        usage_count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{
        MemoryKnowledgeCollection, MemoryProjectCollection, MemoryResourceCollection,
        MemoryTagCollection,
    };
    use crate::models::TagSummary;

    struct Fixture {
        aggregator: Aggregator,
        resources: Arc<MemoryResourceCollection>,
        knowledge: Arc<MemoryKnowledgeCollection>,
        projects: Arc<MemoryProjectCollection>,
        tags: Arc<MemoryTagCollection>,
    }

    fn fixture() -> Fixture {
        let resources = Arc::new(MemoryResourceCollection::new());
        let knowledge = Arc::new(MemoryKnowledgeCollection::new());
        let projects = Arc::new(MemoryProjectCollection::new());
        let tags = Arc::new(MemoryTagCollection::new());
        Fixture {
            aggregator: Aggregator::new(
                resources.clone(),
                knowledge.clone(),
                projects.clone(),
                tags.clone(),
            ),
            resources,
            knowledge,
            projects,
            tags,
        }
    }

    fn resource(owner: Uuid, t: ResourceType, usage: i64, age_days: i64) -> ResourceSummary {
        ResourceSummary {
            id: Uuid::new_v4(),
            owner_id: owner,
            title: format!("resource-{}", usage),
            resource_type: t,
            url: Some("https://example.org".to_string()),
            usage_count: usage,
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    fn knowledge_item(owner: Uuid, t: KnowledgeType, age_days: i64) -> KnowledgeSummary {
        KnowledgeSummary {
            id: Uuid::new_v4(),
            owner_id: owner,
            title: "item".to_string(),
            knowledge_type: t,
            usage_count: 1,
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    fn project(owner: Uuid, status: ProjectStatus, age_days: i64) -> ProjectSummary {
        ProjectSummary {
            id: Uuid::new_v4(),
            owner_id: owner,
            name: "proyecto".to_string(),
            status,
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    #[tokio::test]
    async fn test_stat_blocks_count_by_discriminant() {
        let f = fixture();
        let owner = Uuid::new_v4();

        f.resources.push(resource(owner, ResourceType::Tutorial, 1, 0));
        f.resources.push(resource(owner, ResourceType::Tutorial, 2, 0));
        f.resources.push(resource(owner, ResourceType::Video, 3, 0));
        f.knowledge.push(knowledge_item(owner, KnowledgeType::Snippet, 0));
        f.projects.push(project(owner, ProjectStatus::Active, 0));
        f.projects.push(project(owner, ProjectStatus::Archived, 0));

        let stats = f.aggregator.dashboard_stats(owner).await.unwrap();
        assert_eq!(stats.resources.total, 3);
        assert_eq!(stats.resources.tutorial, 2);
        assert_eq!(stats.resources.video, 1);
        assert_eq!(stats.resources.documentation, 0);
        assert_eq!(stats.knowledge.total, 1);
        assert_eq!(stats.knowledge.snippet, 1);
        assert_eq!(stats.projects.active, 1);
        assert_eq!(stats.projects.archived, 1);
        assert_eq!(stats.projects.completed, 0);
    }

    #[tokio::test]
    async fn test_stats_are_owner_scoped() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();

        f.resources.push(resource(owner, ResourceType::Link, 1, 0));
        f.resources.push(resource(other, ResourceType::Link, 1, 0));

        let stats = f.aggregator.dashboard_stats(owner).await.unwrap();
        assert_eq!(stats.resources.total, 1);
    }

    #[tokio::test]
    async fn test_popular_tags_top_ten_by_usage() {
        let f = fixture();
        let owner = Uuid::new_v4();

        for i in 0..12 {
            f.tags.push(TagSummary {
                owner_id: owner,
                name: format!("tag-{}", i),
                usage_count: i,
            });
        }

        let stats = f.aggregator.dashboard_stats(owner).await.unwrap();
        assert_eq!(stats.total_tags, 12);
        assert_eq!(stats.popular_tags.len(), 10);
        assert_eq!(stats.popular_tags[0].name, "tag-11");
        assert_eq!(stats.popular_tags[0].count, 11);
        assert!(stats
            .popular_tags
            .windows(2)
            .all(|w| w[0].count >= w[1].count));
    }

    #[tokio::test]
    async fn test_timeline_has_thirty_days_ascending_with_zero_days() {
        let f = fixture();
        let owner = Uuid::new_v4();

        f.resources.push(resource(owner, ResourceType::Link, 1, 0));
        f.resources.push(resource(owner, ResourceType::Link, 2, 0));
        f.knowledge.push(knowledge_item(owner, KnowledgeType::Note, 3));
        // Outside the window, never counted.
        f.projects.push(project(owner, ProjectStatus::Active, 45));

        let stats = f.aggregator.dashboard_stats(owner).await.unwrap();
        let timeline = &stats.activity_timeline;
        assert_eq!(timeline.len(), 30);
        assert!(timeline.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(timeline.last().unwrap().count, 2);
        let total: i64 = timeline.iter().map(|p| p.count).sum();
        assert_eq!(total, 3);
        assert!(timeline.iter().any(|p| p.count == 0));
    }

    #[tokio::test]
    async fn test_recent_activity_merges_with_explicit_kinds() {
        let f = fixture();
        let owner = Uuid::new_v4();

        f.resources.push(resource(owner, ResourceType::Link, 1, 2));
        f.knowledge.push(knowledge_item(owner, KnowledgeType::Wiki, 1));
        f.projects.push(project(owner, ProjectStatus::Active, 0));

        let stats = f.aggregator.dashboard_stats(owner).await.unwrap();
        let recent = &stats.recent_activity;
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].kind, ItemKind::Project);
        assert_eq!(recent[1].kind, ItemKind::Knowledge);
        assert_eq!(recent[2].kind, ItemKind::Resource);
        assert!(recent.windows(2).all(|w| w[0].date >= w[1].date));
    }

    #[tokio::test]
    async fn test_recent_activity_caps_at_ten() {
        let f = fixture();
        let owner = Uuid::new_v4();
        for i in 0..15 {
            f.resources.push(resource(owner, ResourceType::Link, i, 0));
        }

        let stats = f.aggregator.dashboard_stats(owner).await.unwrap();
        assert_eq!(stats.recent_activity.len(), 10);
    }

    #[tokio::test]
    async fn test_recent_items_by_kind() {
        let f = fixture();
        let owner = Uuid::new_v4();
        f.resources.push(resource(owner, ResourceType::Link, 1, 1));
        f.resources.push(resource(owner, ResourceType::Link, 2, 0));

        let items = f.aggregator.recent_items(owner, "resources", 5).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, ItemKind::Resource);
        assert!(items[0].created_at > items[1].created_at);

        let err = f.aggregator.recent_items(owner, "widgets", 5).await;
        assert!(matches!(err, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_most_used_items_rejects_projects() {
        let f = fixture();
        let owner = Uuid::new_v4();

        f.resources.push(resource(owner, ResourceType::Link, 7, 0));
        f.resources.push(resource(owner, ResourceType::Link, 3, 0));

        let items = f
            .aggregator
            .most_used_items(owner, "resources", 5)
            .await
            .unwrap();
        assert_eq!(items[0].usage_count, Some(7));

        assert!(matches!(
            f.aggregator.most_used_items(owner, "projects", 5).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_ranked_item_serializes_type_tag() {
        let item = ranked_project(ProjectSummary {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "p".to_string(),
            status: ProjectStatus::Active,
            created_at: Utc::now(),
        });
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "project");
        assert!(value.get("usageCount").is_none());
    }
}

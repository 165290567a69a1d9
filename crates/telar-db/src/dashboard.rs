//! Dashboard source repositories.
//!
//! Owner-scoped reads over the domain collections the aggregator consumes:
//! resources, knowledge items, projects, and tags. The stat blocks are
//! counted client-side by the aggregator, so `list` loads full owner
//! scopes; the recency/usage rankings sort store-side.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use telar_core::{
    Error, KnowledgeCollection, KnowledgeSummary, ProjectCollection, ProjectSummary,
    ResourceCollection, ResourceSummary, Result, TagCollection, TagSummary,
};

/// PostgreSQL implementation of ResourceCollection.
pub struct PgResourceRepository {
    pool: Pool<Postgres>,
}

impl PgResourceRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn query(&self, owner_id: Uuid, order_limit: &str) -> Result<Vec<ResourceSummary>> {
        let sql = format!(
            "SELECT id, owner_id, title, resource_type, url, usage_count, created_at
             FROM resource
             WHERE owner_id = $1{}",
            order_limit
        );
        let rows = sqlx::query(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.iter()
            .map(|row| {
                let resource_type: String = row.get("resource_type");
                Ok(ResourceSummary {
                    id: row.get("id"),
                    owner_id: row.get("owner_id"),
                    title: row.get("title"),
                    resource_type: resource_type.parse().map_err(Error::Serialization)?,
                    url: row.get("url"),
                    usage_count: row.get("usage_count"),
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }
}

#[async_trait]
impl ResourceCollection for PgResourceRepository {
    async fn list(&self, owner_id: Uuid) -> Result<Vec<ResourceSummary>> {
        self.query(owner_id, "").await
    }

    async fn recent(&self, owner_id: Uuid, limit: i64) -> Result<Vec<ResourceSummary>> {
        self.query(
            owner_id,
            &format!(" ORDER BY created_at DESC LIMIT {}", limit),
        )
        .await
    }

    async fn most_used(&self, owner_id: Uuid, limit: i64) -> Result<Vec<ResourceSummary>> {
        self.query(
            owner_id,
            &format!(" ORDER BY usage_count DESC LIMIT {}", limit),
        )
        .await
    }
}

/// PostgreSQL implementation of KnowledgeCollection.
pub struct PgKnowledgeRepository {
    pool: Pool<Postgres>,
}

impl PgKnowledgeRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn query(&self, owner_id: Uuid, order_limit: &str) -> Result<Vec<KnowledgeSummary>> {
        let sql = format!(
            "SELECT id, owner_id, title, knowledge_type, usage_count, created_at
             FROM knowledge_item
             WHERE owner_id = $1{}",
            order_limit
        );
        let rows = sqlx::query(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.iter()
            .map(|row| {
                let knowledge_type: String = row.get("knowledge_type");
                Ok(KnowledgeSummary {
                    id: row.get("id"),
                    owner_id: row.get("owner_id"),
                    title: row.get("title"),
                    knowledge_type: knowledge_type.parse().map_err(Error::Serialization)?,
                    usage_count: row.get("usage_count"),
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }
}

#[async_trait]
impl KnowledgeCollection for PgKnowledgeRepository {
    async fn list(&self, owner_id: Uuid) -> Result<Vec<KnowledgeSummary>> {
        self.query(owner_id, "").await
    }

    async fn recent(&self, owner_id: Uuid, limit: i64) -> Result<Vec<KnowledgeSummary>> {
        self.query(
            owner_id,
            &format!(" ORDER BY created_at DESC LIMIT {}", limit),
        )
        .await
    }

    async fn most_used(&self, owner_id: Uuid, limit: i64) -> Result<Vec<KnowledgeSummary>> {
        self.query(
            owner_id,
            &format!(" ORDER BY usage_count DESC LIMIT {}", limit),
        )
        .await
    }
}

/// PostgreSQL implementation of ProjectCollection.
pub struct PgProjectRepository {
    pool: Pool<Postgres>,
}

impl PgProjectRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn query(&self, owner_id: Uuid, order_limit: &str) -> Result<Vec<ProjectSummary>> {
        let sql = format!(
            "SELECT id, owner_id, name, status, created_at
             FROM project
             WHERE owner_id = $1{}",
            order_limit
        );
        let rows = sqlx::query(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.iter()
            .map(|row| {
                let status: String = row.get("status");
                Ok(ProjectSummary {
                    id: row.get("id"),
                    owner_id: row.get("owner_id"),
                    name: row.get("name"),
                    status: status.parse().map_err(Error::Serialization)?,
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }
}

#[async_trait]
impl ProjectCollection for PgProjectRepository {
    async fn list(&self, owner_id: Uuid) -> Result<Vec<ProjectSummary>> {
        self.query(owner_id, "").await
    }

    async fn recent(&self, owner_id: Uuid, limit: i64) -> Result<Vec<ProjectSummary>> {
        self.query(
            owner_id,
            &format!(" ORDER BY created_at DESC LIMIT {}", limit),
        )
        .await
    }
}

/// PostgreSQL implementation of TagCollection.
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagCollection for PgTagRepository {
    async fn count(&self, owner_id: Uuid) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM tag WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)
    }

    async fn top_by_usage(&self, owner_id: Uuid, limit: i64) -> Result<Vec<TagSummary>> {
        let rows = sqlx::query(
            "SELECT owner_id, name, usage_count
             FROM tag
             WHERE owner_id = $1
             ORDER BY usage_count DESC
             LIMIT $2",
        )
        .bind(owner_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| TagSummary {
                owner_id: row.get("owner_id"),
                name: row.get("name"),
                usage_count: row.get("usage_count"),
            })
            .collect())
    }
}

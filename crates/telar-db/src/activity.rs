//! Activity log repository implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use telar_core::{
    Activity, ActivityAction, ActivityRepository, EntityType, Error, ListActivitiesRequest,
    ListParams, Result, TimelinePoint,
};

use crate::escape_like;

/// Bind the dynamic filter parameters for an activity query, in the same
/// order `push_filter_conditions` numbered them.
macro_rules! bind_activity_filters {
    ($q:expr, $owner:expr, $req:expr, $actions:expr, $entity_types:expr, $pattern:expr) => {{
        let mut q = $q.bind($owner);
        if let Some(actions) = $actions.as_ref() {
            q = q.bind(actions);
        }
        if let Some(entity_types) = $entity_types.as_ref() {
            q = q.bind(entity_types);
        }
        if let Some(entity_id) = $req.entity_id {
            q = q.bind(entity_id);
        }
        if let Some(tags) = $req.tags.as_ref() {
            q = q.bind(tags);
        }
        if let Some(pattern) = $pattern.as_ref() {
            q = q.bind(pattern);
        }
        if let Some(start) = $req.start_date {
            q = q.bind(start);
        }
        if let Some(end) = $req.end_date {
            q = q.bind(end);
        }
        q
    }};
}

/// PostgreSQL implementation of ActivityRepository.
pub struct PgActivityRepository {
    pool: Pool<Postgres>,
}

impl PgActivityRepository {
    /// Create a new PgActivityRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Append the WHERE conditions matching `bind_activity_filters`.
fn push_filter_conditions(
    sql: &mut String,
    req: &ListActivitiesRequest,
    has_actions: bool,
    has_entity_types: bool,
    has_pattern: bool,
) {
    let mut idx = 2;
    if has_actions {
        sql.push_str(&format!(" AND action = ANY(${})", idx));
        idx += 1;
    }
    if has_entity_types {
        sql.push_str(&format!(" AND entity_type = ANY(${})", idx));
        idx += 1;
    }
    if req.entity_id.is_some() {
        sql.push_str(&format!(" AND entity_id = ${}", idx));
        idx += 1;
    }
    if req.tags.is_some() {
        sql.push_str(&format!(" AND tags && ${}", idx));
        idx += 1;
    }
    if has_pattern {
        sql.push_str(&format!(" AND entity_title ILIKE ${}", idx));
        idx += 1;
    }
    if req.start_date.is_some() {
        sql.push_str(&format!(" AND created_at >= ${}", idx));
        idx += 1;
    }
    if req.end_date.is_some() {
        sql.push_str(&format!(" AND created_at <= ${}", idx));
    }
}

fn map_activity_row(row: &sqlx::postgres::PgRow) -> Result<Activity> {
    let action: String = row.get("action");
    let entity_type: String = row.get("entity_type");
    Ok(Activity {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        action: action.parse().map_err(Error::Serialization)?,
        entity_type: entity_type.parse().map_err(Error::Serialization)?,
        entity_id: row.get("entity_id"),
        details: row.get("details"),
        entity_title: row.get("entity_title"),
        tags: row.get("tags"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl ActivityRepository for PgActivityRepository {
    async fn insert(&self, activity: &Activity) -> Result<()> {
        sqlx::query(
            "INSERT INTO activity
                 (id, owner_id, action, entity_type, entity_id, details, entity_title, tags, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(activity.id)
        .bind(activity.owner_id)
        .bind(activity.action.as_str())
        .bind(activity.entity_type.as_str())
        .bind(activity.entity_id)
        .bind(&activity.details)
        .bind(&activity.entity_title)
        .bind(&activity.tags)
        .bind(activity.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn list(
        &self,
        owner_id: Uuid,
        req: &ListActivitiesRequest,
        params: &ListParams,
    ) -> Result<(Vec<Activity>, i64)> {
        let actions: Option<Vec<String>> = req
            .actions
            .as_ref()
            .map(|set| set.iter().map(|a| a.as_str().to_string()).collect());
        let entity_types: Option<Vec<String>> = req
            .entity_types
            .as_ref()
            .map(|set| set.iter().map(|t| t.as_str().to_string()).collect());
        let pattern = req
            .search
            .as_deref()
            .map(|s| format!("%{}%", escape_like(s)));

        let mut where_clause = String::from("WHERE owner_id = $1");
        push_filter_conditions(
            &mut where_clause,
            req,
            actions.is_some(),
            entity_types.is_some(),
            pattern.is_some(),
        );

        let count_sql = format!("SELECT COUNT(*) FROM activity {}", where_clause);
        let total: i64 = bind_activity_filters!(
            sqlx::query_scalar(&count_sql),
            owner_id,
            req,
            actions,
            entity_types,
            pattern
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let direction = if params.descending { "DESC" } else { "ASC" };
        let items_sql = format!(
            "SELECT id, owner_id, action, entity_type, entity_id, details, entity_title, tags, created_at
             FROM activity {}
             ORDER BY {} {} LIMIT {} OFFSET {}",
            where_clause, params.sort_column, direction, params.limit, params.skip
        );
        let rows = bind_activity_filters!(
            sqlx::query(&items_sql),
            owner_id,
            req,
            actions,
            entity_types,
            pattern
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let items = rows
            .iter()
            .map(map_activity_row)
            .collect::<Result<Vec<_>>>()?;
        Ok((items, total))
    }

    async fn recent(&self, owner_id: Uuid, limit: i64) -> Result<Vec<Activity>> {
        let rows = sqlx::query(
            "SELECT id, owner_id, action, entity_type, entity_id, details, entity_title, tags, created_at
             FROM activity
             WHERE owner_id = $1
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(owner_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(map_activity_row).collect()
    }

    async fn counts_by_entity_type(&self, owner_id: Uuid) -> Result<HashMap<EntityType, i64>> {
        let rows = sqlx::query(
            "SELECT entity_type, COUNT(*) AS count
             FROM activity
             WHERE owner_id = $1
             GROUP BY entity_type",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut counts = HashMap::new();
        for row in rows {
            let entity_type: String = row.get("entity_type");
            counts.insert(
                entity_type.parse().map_err(Error::Serialization)?,
                row.get::<i64, _>("count"),
            );
        }
        Ok(counts)
    }

    async fn counts_by_action(&self, owner_id: Uuid) -> Result<HashMap<ActivityAction, i64>> {
        let rows = sqlx::query(
            "SELECT action, COUNT(*) AS count
             FROM activity
             WHERE owner_id = $1
             GROUP BY action",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut counts = HashMap::new();
        for row in rows {
            let action: String = row.get("action");
            counts.insert(
                action.parse().map_err(Error::Serialization)?,
                row.get::<i64, _>("count"),
            );
        }
        Ok(counts)
    }

    async fn timeline(&self, owner_id: Uuid, since: DateTime<Utc>) -> Result<Vec<TimelinePoint>> {
        let rows = sqlx::query(
            "SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COUNT(*) AS count
             FROM activity
             WHERE owner_id = $1 AND created_at >= $2
             GROUP BY day
             ORDER BY day",
        )
        .bind(owner_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| TimelinePoint {
                date: row.get("day"),
                count: row.get("count"),
            })
            .collect())
    }
}

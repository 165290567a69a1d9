//! Notification repository implementation.
//!
//! Every read goes through the visibility predicate: a notification is
//! visible while `expires_at` is unset or in the future. Deletes are hard
//! deletes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use telar_core::{
    Error, ListNotificationsRequest, ListParams, Notification, NotificationRepository, Result,
};

use crate::escape_like;

/// Bind the dynamic filter parameters for a notification query, in the
/// same order `push_filter_conditions` numbered them.
macro_rules! bind_notification_filters {
    ($q:expr, $owner:expr, $now:expr, $req:expr, $types:expr, $priorities:expr, $pattern:expr) => {{
        let mut q = $q.bind($owner).bind($now);
        if let Some(is_read) = $req.is_read {
            q = q.bind(is_read);
        }
        if let Some(types) = $types.as_ref() {
            q = q.bind(types);
        }
        if let Some(priorities) = $priorities.as_ref() {
            q = q.bind(priorities);
        }
        if let Some(entity_type) = $req.related_entity_type {
            q = q.bind(entity_type.as_str());
        }
        if let Some(entity_id) = $req.related_entity_id {
            q = q.bind(entity_id);
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

/// PostgreSQL implementation of NotificationRepository.
pub struct PgNotificationRepository {
    pool: Pool<Postgres>,
}

impl PgNotificationRepository {
    /// Create a new PgNotificationRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "id, owner_id, title, message, kind, priority, is_read, \
     related_entity_type, related_entity_id, additional_data, expires_at, created_at";

/// Append the WHERE conditions matching `bind_notification_filters`.
/// $1 is the owner, $2 the visibility instant.
fn push_filter_conditions(
    sql: &mut String,
    req: &ListNotificationsRequest,
    has_types: bool,
    has_priorities: bool,
    has_pattern: bool,
) {
    let mut idx = 3;
    if req.is_read.is_some() {
        sql.push_str(&format!(" AND is_read = ${}", idx));
        idx += 1;
    }
    if has_types {
        sql.push_str(&format!(" AND kind = ANY(${})", idx));
        idx += 1;
    }
    if has_priorities {
        sql.push_str(&format!(" AND priority = ANY(${})", idx));
        idx += 1;
    }
    if req.related_entity_type.is_some() {
        sql.push_str(&format!(" AND related_entity_type = ${}", idx));
        idx += 1;
    }
    if req.related_entity_id.is_some() {
        sql.push_str(&format!(" AND related_entity_id = ${}", idx));
        idx += 1;
    }
    if has_pattern {
        sql.push_str(&format!(
            " AND (title ILIKE ${} OR message ILIKE ${})",
            idx, idx
        ));
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

fn map_notification_row(row: &sqlx::postgres::PgRow) -> Result<Notification> {
    let kind: String = row.get("kind");
    let priority: String = row.get("priority");
    let related_entity_type: Option<String> = row.get("related_entity_type");
    Ok(Notification {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        message: row.get("message"),
        kind: kind.parse().map_err(Error::Serialization)?,
        priority: priority.parse().map_err(Error::Serialization)?,
        is_read: row.get("is_read"),
        related_entity_type: related_entity_type
            .map(|t| t.parse().map_err(Error::Serialization))
            .transpose()?,
        related_entity_id: row.get("related_entity_id"),
        additional_data: row.get("additional_data"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn insert(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            "INSERT INTO notification
                 (id, owner_id, title, message, kind, priority, is_read,
                  related_entity_type, related_entity_id, additional_data, expires_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(notification.id)
        .bind(notification.owner_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.kind.as_str())
        .bind(notification.priority.as_str())
        .bind(notification.is_read)
        .bind(notification.related_entity_type.map(|t| t.as_str()))
        .bind(notification.related_entity_id)
        .bind(&notification.additional_data)
        .bind(notification.expires_at)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn find(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Notification>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM notification WHERE owner_id = $1 AND id = $2",
            SELECT_COLUMNS
        ))
        .bind(owner_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(map_notification_row).transpose()
    }

    async fn list(
        &self,
        owner_id: Uuid,
        req: &ListNotificationsRequest,
        params: &ListParams,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Notification>, i64)> {
        let types: Option<Vec<String>> = req
            .types
            .as_ref()
            .map(|set| set.iter().map(|t| t.as_str().to_string()).collect());
        let priorities: Option<Vec<String>> = req
            .priorities
            .as_ref()
            .map(|set| set.iter().map(|p| p.as_str().to_string()).collect());
        let pattern = req
            .search
            .as_deref()
            .map(|s| format!("%{}%", escape_like(s)));

        let mut where_clause =
            String::from("WHERE owner_id = $1 AND (expires_at IS NULL OR expires_at > $2)");
        push_filter_conditions(
            &mut where_clause,
            req,
            types.is_some(),
            priorities.is_some(),
            pattern.is_some(),
        );

        let count_sql = format!("SELECT COUNT(*) FROM notification {}", where_clause);
        let total: i64 = bind_notification_filters!(
            sqlx::query_scalar(&count_sql),
            owner_id,
            now,
            req,
            types,
            priorities,
            pattern
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let direction = if params.descending { "DESC" } else { "ASC" };
        let items_sql = format!(
            "SELECT {} FROM notification {} ORDER BY {} {} LIMIT {} OFFSET {}",
            SELECT_COLUMNS, where_clause, params.sort_column, direction, params.limit, params.skip
        );
        let rows = bind_notification_filters!(
            sqlx::query(&items_sql),
            owner_id,
            now,
            req,
            types,
            priorities,
            pattern
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let items = rows
            .iter()
            .map(map_notification_row)
            .collect::<Result<Vec<_>>>()?;
        Ok((items, total))
    }

    async fn unread_count(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM notification
             WHERE owner_id = $1
               AND is_read = FALSE
               AND (expires_at IS NULL OR expires_at > $2)",
        )
        .bind(owner_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)
    }

    async fn set_read(&self, owner_id: Uuid, ids: Option<&[Uuid]>, value: bool) -> Result<u64> {
        // `is_read <> $2` makes rows_affected count actual changes.
        let result = match ids {
            Some(ids) => {
                sqlx::query(
                    "UPDATE notification SET is_read = $2
                     WHERE owner_id = $1 AND is_read <> $2 AND id = ANY($3)",
                )
                .bind(owner_id)
                .bind(value)
                .bind(ids.to_vec())
                .execute(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "UPDATE notification SET is_read = $2
                     WHERE owner_id = $1 AND is_read <> $2",
                )
                .bind(owner_id)
                .bind(value)
                .execute(&self.pool)
                .await
            }
        }
        .map_err(Error::Database)?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM notification WHERE owner_id = $1 AND id = $2")
            .bind(owner_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, owner_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM notification WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}

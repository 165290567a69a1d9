//! Notification preference repository implementation.
//!
//! One row per owner (unique index); the channel and category maps are
//! stored as JSONB so partial merges done by the service round-trip
//! without schema changes.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use telar_core::{Error, NotificationPreference, PreferenceRepository, Result};

/// PostgreSQL implementation of PreferenceRepository.
pub struct PgPreferenceRepository {
    pool: Pool<Postgres>,
}

impl PgPreferenceRepository {
    /// Create a new PgPreferenceRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_preference_row(row: &sqlx::postgres::PgRow) -> Result<NotificationPreference> {
    let channels: JsonValue = row.get("channel_preferences");
    let categories: JsonValue = row.get("category_preferences");
    Ok(NotificationPreference {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        enabled: row.get("enabled"),
        channel_preferences: serde_json::from_value(channels)?,
        category_preferences: serde_json::from_value(categories)?,
        do_not_disturb: row.get("do_not_disturb"),
        do_not_disturb_start: row.get("do_not_disturb_start"),
        do_not_disturb_end: row.get("do_not_disturb_end"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl PreferenceRepository for PgPreferenceRepository {
    async fn find(&self, owner_id: Uuid) -> Result<Option<NotificationPreference>> {
        let row = sqlx::query(
            "SELECT id, owner_id, enabled, channel_preferences, category_preferences,
                    do_not_disturb, do_not_disturb_start, do_not_disturb_end, updated_at
             FROM notification_preference
             WHERE owner_id = $1",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(map_preference_row).transpose()
    }

    async fn insert(&self, pref: &NotificationPreference) -> Result<()> {
        // Concurrent first accesses race to create the defaults record; the
        // unique owner index plus DO NOTHING keeps exactly one row.
        sqlx::query(
            "INSERT INTO notification_preference
                 (id, owner_id, enabled, channel_preferences, category_preferences,
                  do_not_disturb, do_not_disturb_start, do_not_disturb_end, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (owner_id) DO NOTHING",
        )
        .bind(pref.id)
        .bind(pref.owner_id)
        .bind(pref.enabled)
        .bind(serde_json::to_value(&pref.channel_preferences)?)
        .bind(serde_json::to_value(&pref.category_preferences)?)
        .bind(pref.do_not_disturb)
        .bind(pref.do_not_disturb_start)
        .bind(pref.do_not_disturb_end)
        .bind(pref.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn save(&self, pref: &NotificationPreference) -> Result<()> {
        sqlx::query(
            "UPDATE notification_preference
             SET enabled = $2,
                 channel_preferences = $3,
                 category_preferences = $4,
                 do_not_disturb = $5,
                 do_not_disturb_start = $6,
                 do_not_disturb_end = $7,
                 updated_at = $8
             WHERE owner_id = $1",
        )
        .bind(pref.owner_id)
        .bind(pref.enabled)
        .bind(serde_json::to_value(&pref.channel_preferences)?)
        .bind(serde_json::to_value(&pref.category_preferences)?)
        .bind(pref.do_not_disturb)
        .bind(pref.do_not_disturb_start)
        .bind(pref.do_not_disturb_end)
        .bind(pref.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }
}

//! # telar-db
//!
//! PostgreSQL database layer for telar.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for the activity log, notifications,
//!   notification preferences, and the dashboard source collections
//! - A combined [`Database`] context that wires the core services
//!
//! ## Example
//!
//! ```rust,ignore
//! use telar_db::Database;
//! use telar_core::{ActivityAction, ActivityEvent, EntityType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/telar").await?;
//!     let recorder = db.recorder();
//!
//!     recorder
//!         .record(
//!             ActivityEvent::new(owner, ActivityAction::Create, EntityType::Resource, id)
//!                 .with_title("Go Concurrency"),
//!         )
//!         .await;
//!     Ok(())
//! }
//! ```

pub mod activity;
pub mod dashboard;
pub mod notifications;
pub mod pool;
pub mod preferences;

// Test fixtures for integration tests.
// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL.
pub mod test_fixtures;

use std::sync::Arc;

// Re-export core types
pub use telar_core::*;

// Re-export repository implementations
pub use activity::PgActivityRepository;
pub use dashboard::{
    PgKnowledgeRepository, PgProjectRepository, PgResourceRepository, PgTagRepository,
};
pub use notifications::PgNotificationRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use preferences::PgPreferenceRepository;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Activity log repository.
    pub activities: PgActivityRepository,
    /// Notification repository.
    pub notifications: PgNotificationRepository,
    /// Notification preference repository.
    pub preferences: PgPreferenceRepository,
    /// Resource collection reads for the aggregator.
    pub resources: PgResourceRepository,
    /// Knowledge item collection reads for the aggregator.
    pub knowledge: PgKnowledgeRepository,
    /// Project collection reads for the aggregator.
    pub projects: PgProjectRepository,
    /// Tag collection reads for the aggregator.
    pub tags: PgTagRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            activities: PgActivityRepository::new(pool.clone()),
            notifications: PgNotificationRepository::new(pool.clone()),
            preferences: PgPreferenceRepository::new(pool.clone()),
            resources: PgResourceRepository::new(pool.clone()),
            knowledge: PgKnowledgeRepository::new(pool.clone()),
            projects: PgProjectRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Preference service over this database.
    pub fn preference_service(&self) -> PreferenceService {
        PreferenceService::new(Arc::new(PgPreferenceRepository::new(self.pool.clone())))
    }

    /// Notification service (deriver + store) over this database.
    pub fn notification_service(&self) -> NotificationService {
        NotificationService::new(
            Arc::new(PgNotificationRepository::new(self.pool.clone())),
            self.preference_service(),
        )
    }

    /// The fully wired activity recorder: append-only log plus synchronous
    /// notification derivation.
    pub fn recorder(&self) -> ActivityRecorder {
        ActivityRecorder::new(
            Arc::new(PgActivityRepository::new(self.pool.clone())),
            self.notification_service(),
        )
    }

    /// Dashboard aggregator over this database.
    pub fn aggregator(&self) -> Aggregator {
        Aggregator::new(
            Arc::new(PgResourceRepository::new(self.pool.clone())),
            Arc::new(PgKnowledgeRepository::new(self.pool.clone())),
            Arc::new(PgProjectRepository::new(self.pool.clone())),
            Arc::new(PgTagRepository::new(self.pool.clone())),
        )
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("under_score"), "under\\_score");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }
}

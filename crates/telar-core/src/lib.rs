//! # telar-core
//!
//! Core types, traits, and the activity → notification pipeline for telar.
//!
//! This crate holds the decision logic of the system: the fail-open
//! activity recorder, the preference-gated notification deriver, the
//! preference store, and the dashboard aggregator. Persistence is reached
//! only through the repository traits in [`traits`]; `telar-db` provides
//! the PostgreSQL implementations and [`mock`] provides in-memory ones for
//! tests.

pub mod activity;
pub mod aggregate;
pub mod error;
pub mod events;
pub mod logging;
pub mod mock;
pub mod models;
pub mod notify;
pub mod pagination;
pub mod preferences;
pub mod temporal;
pub mod traits;

// Re-export commonly used types at crate root
pub use activity::ActivityRecorder;
pub use aggregate::{
    Aggregator, DashboardStats, ItemKind, KnowledgeStats, ProjectStats, RankedItem, RecentItem,
    ResourceStats, TagCount,
};
pub use error::{Error, Result};
pub use events::ActivityEvent;
pub use models::*;
pub use notify::{NotificationPage, NotificationService, NOTIFICATION_TTL_DAYS};
pub use pagination::{ListParams, Page, PageRequest, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
pub use preferences::PreferenceService;
pub use temporal::parse_timestamp;
pub use traits::*;

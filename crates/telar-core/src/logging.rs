//! Structured logging field name constants for telar.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, operation completions |
//! | DEBUG | Decision points, intermediate values |
//! | TRACE | Per-item iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "activity", "notifications", "preferences", "aggregate", "db"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "recorder", "deriver", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "record", "derive", "mark_read", "dashboard_stats"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Owner UUID whose data is being operated on.
pub const OWNER_ID: &str = "owner_id";

/// Activity UUID being recorded.
pub const ACTIVITY_ID: &str = "activity_id";

/// Notification UUID being created or mutated.
pub const NOTIFICATION_ID: &str = "notification_id";

/// Entity type an activity or notification refers to.
pub const ENTITY_TYPE: &str = "entity_type";

/// Action recorded on an entity.
pub const ACTION: &str = "action";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a query.
pub const RESULT_COUNT: &str = "result_count";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

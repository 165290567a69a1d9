//! Timestamp parsing helpers.
//!
//! Wire timestamps are ISO-8601 strings; everything internal is
//! `DateTime<Utc>`.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// Parse an ISO-8601 timestamp into UTC.
///
/// Accepts any RFC 3339 offset and normalizes to UTC. Rejects anything
/// else as invalid input.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidInput(format!("invalid timestamp {:?}: {}", value, e)))
}

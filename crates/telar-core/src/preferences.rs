//! Notification preference store.
//!
//! Exactly one preference record exists per owner, created lazily with
//! defaults on first access. Updates are partial: map-valued fields merge
//! per key, scalars overwrite, and the do-not-disturb window bounds only
//! take effect when the same update turns the flag on. There is no delete
//! operation; a record persists for the life of its owner.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::models::NotificationPreference;
use crate::temporal::parse_timestamp;
use crate::traits::{PreferenceRepository, UpdatePreferencesRequest};

/// Service for reading and updating per-owner notification preferences.
#[derive(Clone)]
pub struct PreferenceService {
    repo: Arc<dyn PreferenceRepository>,
}

impl PreferenceService {
    pub fn new(repo: Arc<dyn PreferenceRepository>) -> Self {
        Self { repo }
    }

    /// Fetch the owner's preference record, creating the defaults record
    /// if none exists yet.
    pub async fn get_or_create(&self, owner_id: Uuid) -> Result<NotificationPreference> {
        if let Some(pref) = self.repo.find(owner_id).await? {
            return Ok(pref);
        }

        let pref = NotificationPreference::defaults(owner_id);
        self.repo.insert(&pref).await?;
        debug!(
            subsystem = "preferences",
            op = "get_or_create",
            owner_id = %owner_id,
            "Created default preference record"
        );
        Ok(pref)
    }

    /// Apply a partial update and return the merged record.
    pub async fn update(
        &self,
        owner_id: Uuid,
        req: UpdatePreferencesRequest,
    ) -> Result<NotificationPreference> {
        let mut pref = self.get_or_create(owner_id).await?;

        if let Some(enabled) = req.enabled {
            pref.enabled = enabled;
        }

        if let Some(channels) = req.channel_preferences {
            pref.channel_preferences.extend(channels);
        }

        if let Some(categories) = req.category_preferences {
            pref.category_preferences.extend(categories);
        }

        if let Some(do_not_disturb) = req.do_not_disturb {
            pref.do_not_disturb = do_not_disturb;

            if do_not_disturb {
                if let Some(start) = req.do_not_disturb_start.as_deref() {
                    pref.do_not_disturb_start = Some(parse_timestamp(start)?);
                }
                if let Some(end) = req.do_not_disturb_end.as_deref() {
                    pref.do_not_disturb_end = Some(parse_timestamp(end)?);
                }
            }
        }

        pref.updated_at = Utc::now();
        self.repo.save(&pref).await?;
        debug!(
            subsystem = "preferences",
            op = "update",
            owner_id = %owner_id,
            enabled = pref.enabled,
            do_not_disturb = pref.do_not_disturb,
            "Updated notification preferences"
        );
        Ok(pref)
    }
}

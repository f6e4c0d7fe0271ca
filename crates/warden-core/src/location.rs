//! Locations, spaces, and persisted sun times

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A physical site belonging to an organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    /// Internal database id
    pub id: i64,

    /// Owning organization
    pub organization_id: String,

    /// Display name
    pub name: String,

    /// IANA timezone name (e.g. "America/New_York")
    pub timezone: String,
}

/// A logical area within a location that groups devices (e.g. a room)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
    /// Internal database id
    pub id: i64,

    /// Owning organization
    pub organization_id: String,

    /// Location this space belongs to
    pub location_id: i64,

    /// Display name
    pub name: String,
}

/// Persisted sunrise/sunset times for a location
///
/// Refreshed out-of-band by an external job. Solar schedules refuse records
/// older than [`crate::SUN_TIMES_MAX_AGE_DAYS`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SunTimes {
    /// Location these times apply to
    pub location_id: i64,

    /// Today's sunrise, UTC
    pub sunrise_utc: DateTime<Utc>,

    /// Today's sunset, UTC
    pub sunset_utc: DateTime<Utc>,

    /// When the record was last refreshed
    pub updated_at: DateTime<Utc>,
}

impl SunTimes {
    /// Whether the record is too old to drive solar schedules
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.updated_at > chrono::Duration::days(crate::SUN_TIMES_MAX_AGE_DAYS)
    }
}

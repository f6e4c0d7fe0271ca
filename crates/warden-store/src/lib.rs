//! Relational datastore for Warden
//!
//! A single [`Store`] handle wraps the SQLite connection and exposes the
//! org-scoped repositories the pipeline reads and writes: events, devices,
//! alarm zones, audit log, automations, the execution ledger, and the
//! location/space/connector context tables.
//!
//! All writes are per-row; the one exception is the zone-state transition,
//! which commits the state change and its audit entry in a single
//! transaction (see [`Store::transition_zone_state`]).

mod automations;
mod context;
mod devices;
mod events;
mod ledger;
mod schema;
mod zones;

pub use automations::StoredAutomation;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("duplicate event: {0}")]
    DuplicateEvent(Uuid),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("corrupt row in {table}: {detail}")]
    CorruptRow { table: &'static str, detail: String },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// The datastore handle
///
/// One per process, shared via `Arc`. The connection is serialized behind a
/// mutex; SQLite's WAL mode keeps readers cheap.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "Opened store");
        Self::from_connection(conn)
    }

    /// Open an in-memory store (tests)
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        // WAL keeps readers cheap under the single-writer mutex
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(schema::SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection, recovering from a poisoned mutex
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) mod map {
    //! Row-mapping helpers shared by the repository modules

    use super::StoreError;
    use chrono::{DateTime, Utc};

    /// Parse an RFC3339 TEXT column
    pub fn timestamp(
        table: &'static str,
        value: String,
    ) -> Result<DateTime<Utc>, StoreError> {
        DateTime::parse_from_rfc3339(&value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::CorruptRow {
                table,
                detail: format!("bad timestamp '{value}': {e}"),
            })
    }

    /// Parse a TEXT column through FromStr (enums)
    pub fn parsed<T>(table: &'static str, value: &str) -> Result<T, StoreError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        value.parse().map_err(|e| StoreError::CorruptRow {
            table,
            detail: format!("bad value '{value}': {e}"),
        })
    }

    /// Parse a JSON TEXT column
    pub fn json(table: &'static str, value: &str) -> Result<serde_json::Value, StoreError> {
        serde_json::from_str(value).map_err(|e| StoreError::CorruptRow {
            table,
            detail: format!("bad json: {e}"),
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Seed helpers used across repository tests

    use super::Store;
    use warden_core::{ArmedState, ConnectorCategory, TriggerBehavior};

    pub const ORG: &str = "org-test";

    /// Seed an organization with one connector, location, space, zone, and
    /// device wired together. Returns (location_id, space_id, zone_id,
    /// device_id).
    pub fn seed_basic(store: &Store) -> (i64, i64, i64, i64) {
        store.create_organization(ORG, "Test Org").unwrap();
        store
            .create_connector(ORG, "conn-1", "Test Hub", ConnectorCategory::SensorHub, true)
            .unwrap();
        let location_id = store
            .create_location(ORG, "HQ", "America/New_York")
            .unwrap();
        let space_id = store.create_space(ORG, location_id, "Lobby").unwrap();
        let zone_id = store
            .create_zone(ORG, location_id, "Perimeter", TriggerBehavior::Standard)
            .unwrap();
        let device_id = store
            .create_device(
                ORG,
                "conn-1",
                "sensor-1",
                "Front Door",
                "contact_sensor",
                Some(space_id),
                Some(zone_id),
            )
            .unwrap();
        store.set_zone_state(zone_id, ArmedState::Disarmed).unwrap();
        (location_id, space_id, zone_id, device_id)
    }
}

//! Organization, connector, location, space, and sun-times repositories
//!
//! These tables are administered externally; the pipeline only reads them,
//! but the write methods below serve provisioning and tests.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use warden_core::{Connector, ConnectorCategory, Location, Space, SunTimes};

use crate::{map, Store, StoreResult};

fn connector_from_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String, String, bool)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

impl Store {
    /// Create an organization
    pub fn create_organization(&self, id: &str, name: &str) -> StoreResult<()> {
        self.conn().execute(
            "INSERT INTO organizations (id, name) VALUES (?1, ?2)",
            params![id, name],
        )?;
        Ok(())
    }

    /// Create a connector
    pub fn create_connector(
        &self,
        organization_id: &str,
        id: &str,
        name: &str,
        category: ConnectorCategory,
        enabled: bool,
    ) -> StoreResult<()> {
        self.conn().execute(
            "INSERT INTO connectors (id, organization_id, name, category, enabled)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, organization_id, name, category.as_str(), enabled],
        )?;
        Ok(())
    }

    /// Load a connector by id
    pub fn find_connector(&self, id: &str) -> StoreResult<Option<Connector>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, organization_id, name, category, enabled FROM connectors WHERE id = ?1",
            params![id],
            connector_from_row,
        )
        .optional()?
        .map(|(id, organization_id, name, category, enabled)| {
            Ok(Connector {
                id,
                organization_id,
                name,
                category: map::parsed("connectors", &category)?,
                enabled,
            })
        })
        .transpose()
    }

    /// Create a location, returning its id
    pub fn create_location(
        &self,
        organization_id: &str,
        name: &str,
        timezone: &str,
    ) -> StoreResult<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO locations (organization_id, name, timezone) VALUES (?1, ?2, ?3)",
            params![organization_id, name, timezone],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Load a location by id
    pub fn find_location(&self, id: i64) -> StoreResult<Option<Location>> {
        let conn = self.conn();
        Ok(conn
            .query_row(
                "SELECT id, organization_id, name, timezone FROM locations WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Location {
                        id: row.get(0)?,
                        organization_id: row.get(1)?,
                        name: row.get(2)?,
                        timezone: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    /// Create a space, returning its id
    pub fn create_space(
        &self,
        organization_id: &str,
        location_id: i64,
        name: &str,
    ) -> StoreResult<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO spaces (organization_id, location_id, name) VALUES (?1, ?2, ?3)",
            params![organization_id, location_id, name],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Load a space by id
    pub fn find_space(&self, id: i64) -> StoreResult<Option<Space>> {
        let conn = self.conn();
        Ok(conn
            .query_row(
                "SELECT id, organization_id, location_id, name FROM spaces WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Space {
                        id: row.get(0)?,
                        organization_id: row.get(1)?,
                        location_id: row.get(2)?,
                        name: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    /// Upsert the sun-times record for a location
    pub fn set_sun_times(
        &self,
        location_id: i64,
        sunrise_utc: DateTime<Utc>,
        sunset_utc: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.conn().execute(
            "INSERT INTO sun_times (location_id, sunrise_utc, sunset_utc, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(location_id) DO UPDATE SET
                sunrise_utc = excluded.sunrise_utc,
                sunset_utc = excluded.sunset_utc,
                updated_at = excluded.updated_at",
            params![
                location_id,
                sunrise_utc.to_rfc3339(),
                sunset_utc.to_rfc3339(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Load the sun-times record for a location
    pub fn find_sun_times(&self, location_id: i64) -> StoreResult<Option<SunTimes>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT location_id, sunrise_utc, sunset_utc, updated_at
             FROM sun_times WHERE location_id = ?1",
            params![location_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?
        .map(|(location_id, sunrise, sunset, updated)| {
            Ok(SunTimes {
                location_id,
                sunrise_utc: map::timestamp("sun_times", sunrise)?,
                sunset_utc: map::timestamp("sun_times", sunset)?,
                updated_at: map::timestamp("sun_times", updated)?,
            })
        })
        .transpose()
    }
}

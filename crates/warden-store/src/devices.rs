//! Device repository
//!
//! Devices are provisioned externally; the pipeline looks them up by
//! (connector, external id) and applies partial state/battery updates from
//! event payloads.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;
use warden_core::Device;

use crate::{map, Store, StoreResult};

fn device_from_row(row: &Row<'_>) -> rusqlite::Result<(Device, String)> {
    let updated_at: String = row.get(11)?;
    Ok((
        Device {
            id: row.get(0)?,
            organization_id: row.get(1)?,
            connector_id: row.get(2)?,
            external_id: row.get(3)?,
            name: row.get(4)?,
            device_type: row.get(5)?,
            subtype: row.get(6)?,
            status: row.get(7)?,
            battery_percentage: row.get::<_, Option<i64>>(8)?.map(|v| v as u8),
            space_id: row.get(9)?,
            alarm_zone_id: row.get(10)?,
            updated_at: Utc::now(),
        },
        updated_at,
    ))
}

const DEVICE_COLUMNS: &str = "id, organization_id, connector_id, external_id, name, device_type,
                              subtype, status, battery_percentage, space_id, alarm_zone_id, updated_at";

impl Store {
    /// Create a device, returning its id
    #[allow(clippy::too_many_arguments)]
    pub fn create_device(
        &self,
        organization_id: &str,
        connector_id: &str,
        external_id: &str,
        name: &str,
        device_type: &str,
        space_id: Option<i64>,
        alarm_zone_id: Option<i64>,
    ) -> StoreResult<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO devices (organization_id, connector_id, external_id, name, device_type,
                                  space_id, alarm_zone_id, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                organization_id,
                connector_id,
                external_id,
                name,
                device_type,
                space_id,
                alarm_zone_id,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Look up a device by connector and external id
    pub fn find_device(
        &self,
        connector_id: &str,
        external_id: &str,
    ) -> StoreResult<Option<Device>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {DEVICE_COLUMNS} FROM devices
                 WHERE connector_id = ?1 AND external_id = ?2"
            ),
            params![connector_id, external_id],
            device_from_row,
        )
        .optional()?
        .map(|(mut device, updated_at)| {
            device.updated_at = map::timestamp("devices", updated_at)?;
            Ok(device)
        })
        .transpose()
    }

    /// Load a device by internal id
    pub fn get_device(&self, id: i64) -> StoreResult<Option<Device>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE id = ?1"),
            params![id],
            device_from_row,
        )
        .optional()?
        .map(|(mut device, updated_at)| {
            device.updated_at = map::timestamp("devices", updated_at)?;
            Ok(device)
        })
        .transpose()
    }

    /// Apply a partial state update from an event payload
    ///
    /// Only fields present in the payload are touched; absent fields keep
    /// their stored values (last-write-wins, no concurrency check).
    pub fn update_device_state(
        &self,
        device_id: i64,
        status: Option<&str>,
        battery_percentage: Option<u8>,
    ) -> StoreResult<()> {
        if status.is_none() && battery_percentage.is_none() {
            return Ok(());
        }

        self.conn().execute(
            "UPDATE devices SET
                status = COALESCE(?1, status),
                battery_percentage = COALESCE(?2, battery_percentage),
                updated_at = ?3
             WHERE id = ?4",
            params![
                status,
                battery_percentage.map(|v| v as i64),
                Utc::now().to_rfc3339(),
                device_id,
            ],
        )?;
        debug!(device_id, ?status, ?battery_percentage, "Updated device state");
        Ok(())
    }

    /// Cameras placed in a space
    pub fn cameras_in_space(&self, space_id: i64) -> StoreResult<Vec<Device>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices
             WHERE space_id = ?1 AND device_type = 'camera'"
        ))?;
        let rows = stmt.query_map(params![space_id], device_from_row)?;

        let mut cameras = Vec::new();
        for row in rows {
            let (mut device, updated_at) = row?;
            device.updated_at = map::timestamp("devices", updated_at)?;
            cameras.push(device);
        }
        Ok(cameras)
    }

    /// Camera devices associated with a device: the device itself when it is
    /// a camera, otherwise the cameras sharing its space
    pub fn cameras_for_device(&self, device: &Device) -> StoreResult<Vec<Device>> {
        if device.is_camera() {
            return Ok(vec![device.clone()]);
        }
        match device.space_id {
            Some(space_id) => self.cameras_in_space(space_id),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{seed_basic, ORG};
    use crate::Store;

    #[test]
    fn test_find_device_by_key() {
        let store = Store::open_in_memory().unwrap();
        let (_, _, zone_id, device_id) = seed_basic(&store);

        let device = store.find_device("conn-1", "sensor-1").unwrap().unwrap();
        assert_eq!(device.id, device_id);
        assert_eq!(device.alarm_zone_id, Some(zone_id));
        assert!(store.find_device("conn-1", "missing").unwrap().is_none());
    }

    #[test]
    fn test_partial_update_preserves_absent_fields() {
        let store = Store::open_in_memory().unwrap();
        let (.., device_id) = seed_basic(&store);

        store
            .update_device_state(device_id, Some("open"), Some(90))
            .unwrap();

        // Battery-only update must not clobber status
        store.update_device_state(device_id, None, Some(85)).unwrap();

        let device = store.get_device(device_id).unwrap().unwrap();
        assert_eq!(device.status.as_deref(), Some("open"));
        assert_eq!(device.battery_percentage, Some(85));
    }

    #[test]
    fn test_cameras_for_device_via_space() {
        let store = Store::open_in_memory().unwrap();
        let (_, space_id, _, device_id) = seed_basic(&store);

        let cam_id = store
            .create_device(ORG, "conn-1", "cam-1", "Lobby Cam", "camera", Some(space_id), None)
            .unwrap();

        let device = store.get_device(device_id).unwrap().unwrap();
        let cameras = store.cameras_for_device(&device).unwrap();
        assert_eq!(cameras.len(), 1);
        assert_eq!(cameras[0].id, cam_id);

        // A camera resolves to itself
        let camera = store.get_device(cam_id).unwrap().unwrap();
        let cameras = store.cameras_for_device(&camera).unwrap();
        assert_eq!(cameras.len(), 1);
        assert_eq!(cameras[0].id, cam_id);
    }
}

//! Event persistence
//!
//! Events are immutable and inserted exactly once; the UNIQUE constraint on
//! event_uuid rejects re-ingestion of the same event.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tracing::debug;
use uuid::Uuid;
use warden_core::StandardizedEvent;

use crate::{map, Store, StoreError, StoreResult};

impl Store {
    /// Insert an event row, returning its internal id
    ///
    /// A second insert with the same event UUID fails with
    /// [`StoreError::DuplicateEvent`].
    pub fn insert_event(&self, event: &StandardizedEvent) -> StoreResult<i64> {
        let conn = self.conn();
        let payload = serde_json::to_string(&event.payload)
            .map_err(|e| StoreError::CorruptRow {
                table: "events",
                detail: format!("unserializable payload: {e}"),
            })?;
        let original = event.original_event.to_string();

        let result = conn.execute(
            "INSERT INTO events (event_uuid, connector_id, device_external_id, timestamp,
                                 category, event_type, subtype, payload, original_event, ingested_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                event.event_id.to_string(),
                event.connector_id,
                event.device_id,
                event.timestamp.to_rfc3339(),
                event.category,
                event.event_type,
                event.subtype,
                payload,
                original,
                Utc::now().to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                debug!(event_id = %event.event_id, row_id = id, "Inserted event");
                Ok(id)
            }
            // Only a uniqueness violation means a duplicate; FK failures
            // (unknown connector) surface as plain storage errors
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(StoreError::DuplicateEvent(event.event_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load an event by UUID
    pub fn find_event(&self, event_id: Uuid) -> StoreResult<Option<StandardizedEvent>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT event_uuid, connector_id, device_external_id, timestamp,
                    category, event_type, subtype, payload, original_event
             FROM events WHERE event_uuid = ?1",
            params![event_id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                ))
            },
        )
        .optional()?
        .map(
            |(uuid, connector_id, device_id, ts, category, event_type, subtype, payload, original)| {
                Ok(StandardizedEvent {
                    event_id: uuid.parse().map_err(|e| StoreError::CorruptRow {
                        table: "events",
                        detail: format!("bad uuid '{uuid}': {e}"),
                    })?,
                    timestamp: map::timestamp("events", ts)?,
                    connector_id,
                    device_id,
                    category,
                    event_type,
                    subtype,
                    payload: serde_json::from_str(&payload).map_err(|e| {
                        StoreError::CorruptRow {
                            table: "events",
                            detail: format!("bad payload json: {e}"),
                        }
                    })?,
                    original_event: map::json("events", &original)?,
                })
            },
        )
        .transpose()
    }

    /// Count events ingested for a connector (diagnostics)
    pub fn count_events_for_connector(&self, connector_id: &str) -> StoreResult<u64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM events WHERE connector_id = ?1",
            params![connector_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::seed_basic;
    use crate::{Store, StoreError};
    use warden_core::{EventPayload, StandardizedEvent};

    fn sample_event() -> StandardizedEvent {
        StandardizedEvent::new("conn-1", "sensor-1", "device_state", "door_opened")
            .with_payload(EventPayload::with_display_state("open"))
            .with_original(serde_json::json!({"vendor": "acme", "code": 17}))
    }

    #[test]
    fn test_insert_and_find_event() {
        let store = Store::open_in_memory().unwrap();
        seed_basic(&store);

        let event = sample_event();
        let row_id = store.insert_event(&event).unwrap();
        assert!(row_id > 0);

        let loaded = store.find_event(event.event_id).unwrap().unwrap();
        assert_eq!(loaded.event_type, "door_opened");
        assert_eq!(loaded.payload.display_state.as_deref(), Some("open"));
        assert_eq!(loaded.original_event["code"], 17);
    }

    #[test]
    fn test_duplicate_event_uuid_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        seed_basic(&store);

        let event = sample_event();
        store.insert_event(&event).unwrap();

        match store.insert_event(&event) {
            Err(StoreError::DuplicateEvent(id)) => assert_eq!(id, event.event_id),
            other => panic!("expected duplicate error, got {other:?}"),
        }

        assert_eq!(store.count_events_for_connector("conn-1").unwrap(), 1);
    }
}

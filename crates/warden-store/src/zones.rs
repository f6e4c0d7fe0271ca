//! Alarm zone repository
//!
//! Zone armed-state transitions commit the state change and its audit
//! entry in one transaction; every TRIGGERED row has a traceable cause.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;
use warden_core::{AlarmZone, AuditLogEntry, TriggerBehavior, TriggerOverride};

use crate::{map, Store, StoreError, StoreResult};

fn zone_from_row(row: &Row<'_>) -> rusqlite::Result<(i64, String, i64, String, String, String, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn build_zone(
    (id, organization_id, location_id, name, armed_state, trigger_behavior, updated_at): (
        i64,
        String,
        i64,
        String,
        String,
        String,
        String,
    ),
) -> StoreResult<AlarmZone> {
    Ok(AlarmZone {
        id,
        organization_id,
        location_id,
        name,
        armed_state: map::parsed("alarm_zones", &armed_state)?,
        trigger_behavior: map::parsed("alarm_zones", &trigger_behavior)?,
        updated_at: map::timestamp("alarm_zones", updated_at)?,
    })
}

const ZONE_COLUMNS: &str =
    "id, organization_id, location_id, name, armed_state, trigger_behavior, updated_at";

impl Store {
    /// Create a zone, returning its id
    pub fn create_zone(
        &self,
        organization_id: &str,
        location_id: i64,
        name: &str,
        trigger_behavior: TriggerBehavior,
    ) -> StoreResult<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO alarm_zones (organization_id, location_id, name, armed_state,
                                      trigger_behavior, updated_at)
             VALUES (?1, ?2, ?3, 'DISARMED', ?4, ?5)",
            params![
                organization_id,
                location_id,
                name,
                trigger_behavior.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Load a zone by id
    pub fn find_zone(&self, id: i64) -> StoreResult<Option<AlarmZone>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {ZONE_COLUMNS} FROM alarm_zones WHERE id = ?1"),
            params![id],
            zone_from_row,
        )
        .optional()?
        .map(build_zone)
        .transpose()
    }

    /// All zones in a location
    pub fn zones_for_location(&self, location_id: i64) -> StoreResult<Vec<AlarmZone>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ZONE_COLUMNS} FROM alarm_zones WHERE location_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![location_id], zone_from_row)?;
        rows.map(|row| build_zone(row?)).collect()
    }

    /// All zones in an organization
    pub fn zones_for_organization(&self, organization_id: &str) -> StoreResult<Vec<AlarmZone>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ZONE_COLUMNS} FROM alarm_zones WHERE organization_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![organization_id], zone_from_row)?;
        rows.map(|row| build_zone(row?)).collect()
    }

    /// Set a zone's armed state without auditing (seed/test use)
    pub fn set_zone_state(&self, zone_id: i64, state: warden_core::ArmedState) -> StoreResult<()> {
        self.conn().execute(
            "UPDATE alarm_zones SET armed_state = ?1, updated_at = ?2 WHERE id = ?3",
            params![state.as_str(), Utc::now().to_rfc3339(), zone_id],
        )?;
        Ok(())
    }

    /// Upsert a per-event-type trigger override
    pub fn set_trigger_override(
        &self,
        zone_id: i64,
        event_type: &str,
        should_trigger: bool,
    ) -> StoreResult<()> {
        self.conn().execute(
            "INSERT INTO trigger_overrides (zone_id, event_type, should_trigger)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(zone_id, event_type) DO UPDATE SET
                should_trigger = excluded.should_trigger",
            params![zone_id, event_type, should_trigger],
        )?;
        Ok(())
    }

    /// Look up the override for an exact event type
    pub fn find_trigger_override(
        &self,
        zone_id: i64,
        event_type: &str,
    ) -> StoreResult<Option<TriggerOverride>> {
        let conn = self.conn();
        Ok(conn
            .query_row(
                "SELECT zone_id, event_type, should_trigger FROM trigger_overrides
                 WHERE zone_id = ?1 AND event_type = ?2",
                params![zone_id, event_type],
                |row| {
                    Ok(TriggerOverride {
                        zone_id: row.get(0)?,
                        event_type: row.get(1)?,
                        should_trigger: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    /// Transition a zone's armed state and write the audit entry atomically
    ///
    /// The update is guarded on the entry's `previous_state`: if the zone
    /// moved concurrently, nothing is written and `NotFound` is returned so
    /// the caller can log and move on.
    pub fn transition_zone_state(&self, entry: &AuditLogEntry) -> StoreResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE alarm_zones SET armed_state = ?1, updated_at = ?2
             WHERE id = ?3 AND armed_state = ?4",
            params![
                entry.new_state.as_str(),
                entry.created_at.to_rfc3339(),
                entry.zone_id,
                entry.previous_state.as_str(),
            ],
        )?;

        if updated == 0 {
            return Err(StoreError::NotFound {
                entity: "alarm zone in expected state",
                key: format!("{} ({})", entry.zone_id, entry.previous_state),
            });
        }

        tx.execute(
            "INSERT INTO audit_log (id, organization_id, zone_id, action, previous_state,
                                    new_state, reason, trigger_event_uuid, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.id,
                entry.organization_id,
                entry.zone_id,
                entry.action.as_str(),
                entry.previous_state.as_str(),
                entry.new_state.as_str(),
                entry.reason,
                entry.trigger_event_id.map(|id| id.to_string()),
                entry.created_at.to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        debug!(
            zone_id = entry.zone_id,
            from = %entry.previous_state,
            to = %entry.new_state,
            reason = %entry.reason,
            "Zone state transition committed"
        );
        Ok(())
    }

    /// Audit entries for a zone, newest first
    pub fn audit_entries_for_zone(&self, zone_id: i64) -> StoreResult<Vec<AuditLogEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, organization_id, zone_id, action, previous_state, new_state,
                    reason, trigger_event_uuid, created_at
             FROM audit_log WHERE zone_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![zone_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, Option<String>>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;

        rows.map(|row| {
            let (id, organization_id, zone_id, action, prev, new, reason, event_uuid, created_at) =
                row?;
            let action = match action.as_str() {
                "arm" => warden_core::AuditAction::Arm,
                "disarm" => warden_core::AuditAction::Disarm,
                "trigger" => warden_core::AuditAction::Trigger,
                other => {
                    return Err(StoreError::CorruptRow {
                        table: "audit_log",
                        detail: format!("bad action '{other}'"),
                    })
                }
            };
            Ok(AuditLogEntry {
                id,
                organization_id,
                zone_id,
                action,
                previous_state: map::parsed("audit_log", &prev)?,
                new_state: map::parsed("audit_log", &new)?,
                reason,
                trigger_event_id: event_uuid
                    .map(|s| {
                        s.parse().map_err(|e| StoreError::CorruptRow {
                            table: "audit_log",
                            detail: format!("bad uuid '{s}': {e}"),
                        })
                    })
                    .transpose()?,
                created_at: map::timestamp("audit_log", created_at)?,
            })
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{seed_basic, ORG};
    use crate::{Store, StoreError};
    use warden_core::{ArmedState, AuditAction, AuditLogEntry};

    #[test]
    fn test_transition_writes_audit_atomically() {
        let store = Store::open_in_memory().unwrap();
        let (_, _, zone_id, _) = seed_basic(&store);
        store.set_zone_state(zone_id, ArmedState::Armed).unwrap();

        let entry = AuditLogEntry::new(
            ORG,
            zone_id,
            AuditAction::Trigger,
            ArmedState::Armed,
            ArmedState::Triggered,
            "alarm_event_trigger",
        );
        store.transition_zone_state(&entry).unwrap();

        let zone = store.find_zone(zone_id).unwrap().unwrap();
        assert_eq!(zone.armed_state, ArmedState::Triggered);

        let audit = store.audit_entries_for_zone(zone_id).unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].reason, "alarm_event_trigger");
        assert_eq!(audit[0].previous_state, ArmedState::Armed);
        assert_eq!(audit[0].new_state, ArmedState::Triggered);
    }

    #[test]
    fn test_transition_guard_on_previous_state() {
        let store = Store::open_in_memory().unwrap();
        let (_, _, zone_id, _) = seed_basic(&store);
        // Zone is DISARMED; a transition claiming ARMED must not apply
        let entry = AuditLogEntry::new(
            ORG,
            zone_id,
            AuditAction::Trigger,
            ArmedState::Armed,
            ArmedState::Triggered,
            "alarm_event_trigger",
        );

        assert!(matches!(
            store.transition_zone_state(&entry),
            Err(StoreError::NotFound { .. })
        ));

        let zone = store.find_zone(zone_id).unwrap().unwrap();
        assert_eq!(zone.armed_state, ArmedState::Disarmed);
        assert!(store.audit_entries_for_zone(zone_id).unwrap().is_empty());
    }

    #[test]
    fn test_trigger_override_lookup() {
        let store = Store::open_in_memory().unwrap();
        let (_, _, zone_id, _) = seed_basic(&store);

        assert!(store
            .find_trigger_override(zone_id, "door_opened")
            .unwrap()
            .is_none());

        store
            .set_trigger_override(zone_id, "door_opened", false)
            .unwrap();
        let or = store
            .find_trigger_override(zone_id, "door_opened")
            .unwrap()
            .unwrap();
        assert!(!or.should_trigger);

        // Upsert flips the flag in place
        store
            .set_trigger_override(zone_id, "door_opened", true)
            .unwrap();
        let or = store
            .find_trigger_override(zone_id, "door_opened")
            .unwrap()
            .unwrap();
        assert!(or.should_trigger);
    }

    #[test]
    fn test_zone_scoping_queries() {
        let store = Store::open_in_memory().unwrap();
        let (location_id, _, zone_id, _) = seed_basic(&store);
        let second = store
            .create_zone(ORG, location_id, "Interior", Default::default())
            .unwrap();

        let by_location = store.zones_for_location(location_id).unwrap();
        assert_eq!(
            by_location.iter().map(|z| z.id).collect::<Vec<_>>(),
            vec![zone_id, second]
        );

        let by_org = store.zones_for_organization(ORG).unwrap();
        assert_eq!(by_org.len(), 2);
    }
}

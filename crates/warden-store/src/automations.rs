//! Automation repository
//!
//! Automations are authored by the admin surface; the core reads them as
//! opaque rows whose `config_json` is parsed by the automation crate.

use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{map, Store, StoreResult};

/// A stored automation row
///
/// `config_json` holds the trigger and action list; parsing it belongs to
/// the automation engine, so a malformed config disables one automation
/// rather than poisoning the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAutomation {
    /// Internal database id
    pub id: i64,

    /// Owning organization
    pub organization_id: String,

    /// Display name
    pub name: String,

    /// Whether the automation participates in evaluation
    pub enabled: bool,

    /// Optional location scope
    pub location_id: Option<i64>,

    /// Raw configuration (one trigger + ordered actions)
    pub config_json: serde_json::Value,
}

fn automation_from_row(
    row: &Row<'_>,
) -> rusqlite::Result<(i64, String, String, bool, Option<i64>, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn build_automation(
    (id, organization_id, name, enabled, location_id, config): (
        i64,
        String,
        String,
        bool,
        Option<i64>,
        String,
    ),
) -> StoreResult<StoredAutomation> {
    Ok(StoredAutomation {
        id,
        organization_id,
        name,
        enabled,
        location_id,
        config_json: map::json("automations", &config)?,
    })
}

const AUTOMATION_COLUMNS: &str = "id, organization_id, name, enabled, location_id, config_json";

impl Store {
    /// Create an automation, returning its id
    pub fn create_automation(
        &self,
        organization_id: &str,
        name: &str,
        enabled: bool,
        location_id: Option<i64>,
        config_json: &serde_json::Value,
    ) -> StoreResult<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO automations (organization_id, name, enabled, location_id, config_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                organization_id,
                name,
                enabled,
                location_id,
                config_json.to_string(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Load one automation
    pub fn find_automation(&self, id: i64) -> StoreResult<Option<StoredAutomation>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {AUTOMATION_COLUMNS} FROM automations WHERE id = ?1"),
            params![id],
            automation_from_row,
        )
        .optional()?
        .map(build_automation)
        .transpose()
    }

    /// Enabled automations for one organization
    pub fn enabled_automations(&self, organization_id: &str) -> StoreResult<Vec<StoredAutomation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {AUTOMATION_COLUMNS} FROM automations
             WHERE organization_id = ?1 AND enabled = 1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![organization_id], automation_from_row)?;
        rows.map(|row| build_automation(row?)).collect()
    }

    /// Enabled automations across all organizations (scheduler tick)
    pub fn all_enabled_automations(&self) -> StoreResult<Vec<StoredAutomation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {AUTOMATION_COLUMNS} FROM automations WHERE enabled = 1 ORDER BY id"
        ))?;
        let rows = stmt.query_map([], automation_from_row)?;
        rows.map(|row| build_automation(row?)).collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{seed_basic, ORG};
    use crate::Store;
    use serde_json::json;

    #[test]
    fn test_enabled_filtering() {
        let store = Store::open_in_memory().unwrap();
        seed_basic(&store);

        let config = json!({"trigger": {"kind": "event", "rule": {"all": []}}, "actions": []});
        let enabled_id = store
            .create_automation(ORG, "On", true, None, &config)
            .unwrap();
        store
            .create_automation(ORG, "Off", false, None, &config)
            .unwrap();

        let enabled = store.enabled_automations(ORG).unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id, enabled_id);
        assert_eq!(enabled[0].config_json["trigger"]["kind"], "event");
    }

    #[test]
    fn test_org_scoping() {
        let store = Store::open_in_memory().unwrap();
        seed_basic(&store);
        store.create_organization("org-other", "Other").unwrap();

        let config = json!({"actions": []});
        store
            .create_automation("org-other", "Foreign", true, None, &config)
            .unwrap();

        assert!(store.enabled_automations(ORG).unwrap().is_empty());
        assert_eq!(store.all_enabled_automations().unwrap().len(), 1);
    }
}

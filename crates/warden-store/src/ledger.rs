//! Execution ledger repository
//!
//! Rows are written before work is dispatched and finalized after it
//! settles, so no execution is silently lost even if the process dies
//! mid-action.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;
use warden_core::{
    ActionExecutionRecord, ActionStatus, ExecutionRecord, ExecutionStatus, TriggerKind,
};

use crate::{map, Store, StoreError, StoreResult};

impl Store {
    /// Create an execution row in `running` state with the declared action
    /// total, returning its id
    pub fn create_execution(
        &self,
        organization_id: &str,
        automation_id: i64,
        trigger_kind: TriggerKind,
        trigger_timestamp: DateTime<Utc>,
        trigger_event_id: Option<Uuid>,
        total_actions: u32,
    ) -> StoreResult<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO automation_executions
                (organization_id, automation_id, trigger_kind, trigger_timestamp,
                 trigger_event_uuid, status, total_actions, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'running', ?6, ?7)",
            params![
                organization_id,
                automation_id,
                trigger_kind.as_str(),
                trigger_timestamp.to_rfc3339(),
                trigger_event_id.map(|id| id.to_string()),
                total_actions,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Finalize an execution after all actions settle
    pub fn finalize_execution(
        &self,
        execution_id: i64,
        status: ExecutionStatus,
        successful_actions: u32,
        failed_actions: u32,
        duration_ms: u64,
    ) -> StoreResult<()> {
        self.conn().execute(
            "UPDATE automation_executions SET
                status = ?1, successful_actions = ?2, failed_actions = ?3, duration_ms = ?4
             WHERE id = ?5",
            params![
                status.as_str(),
                successful_actions,
                failed_actions,
                duration_ms as i64,
                execution_id,
            ],
        )?;
        Ok(())
    }

    /// Create an action row in `running` state immediately before dispatch
    pub fn create_action_execution(
        &self,
        execution_id: i64,
        action_index: u32,
        action_type: &str,
        action_params: &serde_json::Value,
    ) -> StoreResult<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO automation_action_executions
                (execution_id, action_index, action_type, action_params, status, started_at)
             VALUES (?1, ?2, ?3, ?4, 'running', ?5)",
            params![
                execution_id,
                action_index,
                action_type,
                action_params.to_string(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Settle an action row
    pub fn finalize_action_execution(
        &self,
        action_execution_id: i64,
        status: ActionStatus,
        error_message: Option<&str>,
    ) -> StoreResult<()> {
        self.conn().execute(
            "UPDATE automation_action_executions SET
                status = ?1, error_message = ?2, finished_at = ?3
             WHERE id = ?4",
            params![
                status.as_str(),
                error_message,
                Utc::now().to_rfc3339(),
                action_execution_id,
            ],
        )?;
        Ok(())
    }

    /// Load an execution row
    pub fn get_execution(&self, id: i64) -> StoreResult<Option<ExecutionRecord>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, organization_id, automation_id, trigger_kind, trigger_timestamp,
                    trigger_event_uuid, status, total_actions, successful_actions,
                    failed_actions, duration_ms, started_at
             FROM automation_executions WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, i64>(7)?,
                    row.get::<_, i64>(8)?,
                    row.get::<_, i64>(9)?,
                    row.get::<_, Option<i64>>(10)?,
                    row.get::<_, String>(11)?,
                ))
            },
        )
        .optional()?
        .map(
            |(id, org, automation_id, kind, trigger_ts, event_uuid, status, total, ok, failed, duration, started)| {
                Ok(ExecutionRecord {
                    id,
                    organization_id: org,
                    automation_id,
                    trigger_kind: map::parsed("automation_executions", &kind)?,
                    trigger_timestamp: map::timestamp("automation_executions", trigger_ts)?,
                    trigger_event_id: event_uuid
                        .map(|s| {
                            s.parse().map_err(|e| StoreError::CorruptRow {
                                table: "automation_executions",
                                detail: format!("bad uuid '{s}': {e}"),
                            })
                        })
                        .transpose()?,
                    status: map::parsed("automation_executions", &status)?,
                    total_actions: total as u32,
                    successful_actions: ok as u32,
                    failed_actions: failed as u32,
                    duration_ms: duration.map(|d| d as u64),
                    started_at: map::timestamp("automation_executions", started)?,
                })
            },
        )
        .transpose()
    }

    /// Action rows for an execution, in declared order
    pub fn action_executions(&self, execution_id: i64) -> StoreResult<Vec<ActionExecutionRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, execution_id, action_index, action_type, action_params,
                    status, error_message, started_at, finished_at
             FROM automation_action_executions
             WHERE execution_id = ?1 ORDER BY action_index",
        )?;
        let rows = stmt.query_map(params![execution_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, Option<String>>(8)?,
            ))
        })?;

        rows.map(|row| {
            let (id, execution_id, index, action_type, params, status, error, started, finished) =
                row?;
            Ok(ActionExecutionRecord {
                id,
                execution_id,
                action_index: index as u32,
                action_type,
                action_params: map::json("automation_action_executions", &params)?,
                status: map::parsed("automation_action_executions", &status)?,
                error_message: error,
                started_at: map::timestamp("automation_action_executions", started)?,
                finished_at: finished
                    .map(|ts| map::timestamp("automation_action_executions", ts))
                    .transpose()?,
            })
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_basic, ORG};
    use serde_json::json;

    fn seed_automation(store: &Store) -> i64 {
        store
            .create_automation(ORG, "Test", true, None, &json!({"actions": []}))
            .unwrap()
    }

    #[test]
    fn test_execution_lifecycle() {
        let store = Store::open_in_memory().unwrap();
        seed_basic(&store);
        let automation_id = seed_automation(&store);

        let execution_id = store
            .create_execution(ORG, automation_id, TriggerKind::Event, Utc::now(), None, 3)
            .unwrap();

        let record = store.get_execution(execution_id).unwrap().unwrap();
        assert_eq!(record.status, ExecutionStatus::Running);
        assert_eq!(record.total_actions, 3);

        store
            .finalize_execution(execution_id, ExecutionStatus::PartialFailure, 2, 1, 420)
            .unwrap();

        let record = store.get_execution(execution_id).unwrap().unwrap();
        assert_eq!(record.status, ExecutionStatus::PartialFailure);
        assert_eq!(record.successful_actions, 2);
        assert_eq!(record.failed_actions, 1);
        assert_eq!(record.duration_ms, Some(420));
    }

    #[test]
    fn test_action_rows_settle_in_order() {
        let store = Store::open_in_memory().unwrap();
        seed_basic(&store);
        let automation_id = seed_automation(&store);
        let execution_id = store
            .create_execution(ORG, automation_id, TriggerKind::Schedule, Utc::now(), None, 2)
            .unwrap();

        let first = store
            .create_action_execution(execution_id, 0, "arm_zone", &json!({"zoneIds": [1]}))
            .unwrap();
        let second = store
            .create_action_execution(execution_id, 1, "send_http_request", &json!({"url": "x"}))
            .unwrap();

        store
            .finalize_action_execution(first, ActionStatus::Success, None)
            .unwrap();
        store
            .finalize_action_execution(second, ActionStatus::Failure, Some("connect timeout"))
            .unwrap();

        let actions = store.action_executions(execution_id).unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].status, ActionStatus::Success);
        assert!(actions[0].finished_at.is_some());
        assert_eq!(actions[1].status, ActionStatus::Failure);
        assert_eq!(actions[1].error_message.as_deref(), Some("connect timeout"));
        // Declared template is stored, not the resolved params
        assert_eq!(actions[1].action_params["url"], "x");
    }
}

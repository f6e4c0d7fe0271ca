//! Execution ledger
//!
//! Thin orchestration over the store's execution tables. The parent row is
//! created with the declared action total before anything runs; each
//! action row is created in `running` state immediately before dispatch
//! and settled immediately after, so a crash mid-run still leaves an
//! accurate trail.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;
use uuid::Uuid;
use warden_core::{ActionStatus, ExecutionStatus, TriggerKind};
use warden_store::{Store, StoreResult};

/// Ledger façade over the store
pub struct ExecutionLedger {
    store: Arc<Store>,
}

impl ExecutionLedger {
    /// Create a ledger over the store
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Open an execution with its declared action total
    #[allow(clippy::too_many_arguments)]
    pub fn begin(
        &self,
        organization_id: &str,
        automation_id: i64,
        trigger_kind: TriggerKind,
        trigger_timestamp: DateTime<Utc>,
        trigger_event_id: Option<Uuid>,
        total_actions: u32,
    ) -> StoreResult<ExecutionHandle> {
        let execution_id = self.store.create_execution(
            organization_id,
            automation_id,
            trigger_kind,
            trigger_timestamp,
            trigger_event_id,
            total_actions,
        )?;
        Ok(ExecutionHandle {
            store: self.store.clone(),
            execution_id,
            started: Instant::now(),
            successful: 0,
            failed: 0,
        })
    }
}

/// One open execution
///
/// Tracks settled counts and finalizes the parent row once all actions
/// resolve.
pub struct ExecutionHandle {
    store: Arc<Store>,
    execution_id: i64,
    started: Instant,
    successful: u32,
    failed: u32,
}

impl ExecutionHandle {
    /// Ledger row id of the execution
    pub fn execution_id(&self) -> i64 {
        self.execution_id
    }

    /// Record an action as dispatched
    pub fn begin_action(
        &self,
        action_index: u32,
        action_type: &str,
        action_params: &serde_json::Value,
    ) -> StoreResult<i64> {
        self.store.create_action_execution(
            self.execution_id,
            action_index,
            action_type,
            action_params,
        )
    }

    /// Settle an action as succeeded
    pub fn action_succeeded(&mut self, action_execution_id: i64) {
        self.successful += 1;
        if let Err(e) =
            self.store
                .finalize_action_execution(action_execution_id, ActionStatus::Success, None)
        {
            warn!(action_execution_id, error = %e, "Failed settling action row");
        }
    }

    /// Settle an action as failed
    pub fn action_failed(&mut self, action_execution_id: i64, error_message: &str) {
        self.failed += 1;
        if let Err(e) = self.store.finalize_action_execution(
            action_execution_id,
            ActionStatus::Failure,
            Some(error_message),
        ) {
            warn!(action_execution_id, error = %e, "Failed settling action row");
        }
    }

    /// Finalize the parent execution; returns the final status
    pub fn finalize(self) -> StoreResult<ExecutionStatus> {
        let status = ExecutionStatus::from_counts(self.successful, self.failed);
        let duration_ms = self.started.elapsed().as_millis() as u64;
        self.store.finalize_execution(
            self.execution_id,
            status,
            self.successful,
            self.failed,
            duration_ms,
        )?;
        Ok(status)
    }
}

//! Applies a sync plan against the destination store
//!
//! Operations run one at a time in plan order. A failed write is recorded and
//! the executor moves on to the next operation; it never aborts midway and
//! never re-reads the stores afterwards.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;
use rbac_model::{Scope, SyncDirection};
use rbac_store::StoreAdapter;
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use super::bounded;
use super::plan::{ChangeOperation, SyncPlan};
use crate::{Error, Result};

/// Lifecycle of one sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Plan computed, nothing written (dry runs stop here)
    Planned,
    Executing,
    /// Every operation was attempted and every one succeeded
    Completed,
    /// Some operations succeeded and some failed
    PartiallyFailed,
    /// Every attempted operation failed
    Failed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncState::Planned => "planned",
            SyncState::Executing => "executing",
            SyncState::Completed => "completed",
            SyncState::PartiallyFailed => "partially_failed",
            SyncState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Outcome of a sync or dry run.
///
/// `success` is derived from `changes_failed` and cannot be set on its own.
/// A result with failures must be reported as such.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    sync_id: Uuid,
    scope: Scope,
    direction: SyncDirection,
    state: SyncState,
    dry_run: bool,
    success: bool,
    changes_applied: usize,
    changes_failed: usize,
    errors: Vec<String>,
    details: Vec<String>,
    planned: Vec<ChangeOperation>,
}

impl SyncResult {
    fn start(plan: &SyncPlan, dry_run: bool) -> Self {
        Self {
            sync_id: Uuid::new_v4(),
            scope: plan.scope.clone(),
            direction: plan.direction,
            state: if dry_run {
                SyncState::Planned
            } else {
                SyncState::Executing
            },
            dry_run,
            success: true,
            changes_applied: 0,
            changes_failed: 0,
            errors: Vec::new(),
            details: Vec::new(),
            planned: Vec::new(),
        }
    }

    /// Result of a dry run: nothing applied, every operation enumerated
    pub fn dry_run(plan: &SyncPlan) -> Self {
        let mut result = Self::start(plan, true);
        result.planned = plan.operations.clone();
        result.details = plan.operations.iter().map(ToString::to_string).collect();
        if plan.has_changes() {
            result
                .details
                .push(format!("Dry run: {} changes would be made", plan.len()));
        } else {
            result.details.push("No changes needed".to_string());
        }
        result
    }

    fn record_success(&mut self, op: &ChangeOperation) {
        self.changes_applied += 1;
        self.details.push(op.to_string());
    }

    fn record_failure(&mut self, op: &ChangeOperation, err: &Error) {
        self.changes_failed += 1;
        self.errors
            .push(format!("Failed to {} {}: {}", op.kind(), op.role(), err));
    }

    fn finish(mut self) -> Self {
        self.success = self.changes_failed == 0;
        self.state = match (self.changes_applied, self.changes_failed) {
            (_, 0) => SyncState::Completed,
            (0, _) => SyncState::Failed,
            _ => SyncState::PartiallyFailed,
        };
        if self.changes_applied == 0 && self.changes_failed == 0 {
            self.details.push("No changes needed".to_string());
        }
        self
    }

    pub fn sync_id(&self) -> Uuid {
        self.sync_id
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn direction(&self) -> SyncDirection {
        self.direction
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// True iff no operation failed
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn changes_applied(&self) -> usize {
        self.changes_applied
    }

    pub fn changes_failed(&self) -> usize {
        self.changes_failed
    }

    /// One `Failed to <op> <role>: <cause>` line per failed operation
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// One line per applied (or, for dry runs, would-be-applied) operation
    pub fn details(&self) -> &[String] {
        &self.details
    }

    /// Operations a dry run would apply; empty for real syncs
    pub fn planned(&self) -> &[ChangeOperation] {
        &self.planned
    }
}

/// Bounded exponential backoff around each write.
///
/// `max_attempts` counts the first try, so `1` disables retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Single attempt, no retry
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(2_000),
        }
    }

    fn schedule(&self) -> backoff::ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(self.max_backoff)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Writes plans to one destination store
#[derive(Clone)]
pub struct SyncExecutor {
    destination: Arc<dyn StoreAdapter>,
    write_timeout: Duration,
    retry: RetryPolicy,
}

impl SyncExecutor {
    pub fn new(destination: Arc<dyn StoreAdapter>, write_timeout: Duration) -> Self {
        Self {
            destination,
            write_timeout,
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Apply every operation of `plan` to the destination.
    ///
    /// Write failures never abort the run; they are counted and listed in the
    /// returned [`SyncResult`].
    ///
    /// # Errors
    ///
    /// [`Error::PlanMismatch`] when the plan was built for another scope or
    /// direction, [`Error::StoreSideMismatch`] when the destination store
    /// fronts the wrong side. Both are raised before any write.
    pub async fn execute(
        &self,
        plan: &SyncPlan,
        scope: &Scope,
        direction: SyncDirection,
    ) -> Result<SyncResult> {
        if &plan.scope != scope || plan.direction != direction {
            return Err(Error::PlanMismatch {
                plan_scope: plan.scope.clone(),
                plan_direction: plan.direction.to_string(),
                scope: scope.clone(),
                direction: direction.to_string(),
            });
        }
        let side = self.destination.side();
        if side != direction.destination() {
            return Err(Error::StoreSideMismatch {
                expected: direction.destination(),
                actual: side,
            });
        }

        let mut result = SyncResult::start(plan, false);
        let span = tracing::info_span!(
            "rbac_sync",
            sync_id = %result.sync_id,
            scope = %scope,
            direction = %direction,
        );

        let result = async move {
            tracing::info!(operations = plan.len(), "applying RBAC sync plan");

            for op in &plan.operations {
                match self.apply_with_retry(scope, op).await {
                    Ok(()) => {
                        tracing::debug!(op = op.kind(), role = op.role(), "applied");
                        result.record_success(op);
                    }
                    Err(e) => {
                        tracing::warn!(op = op.kind(), role = op.role(), error = %e, "operation failed");
                        result.record_failure(op, &e);
                    }
                }
            }

            let result = result.finish();
            tracing::info!(
                applied = result.changes_applied,
                failed = result.changes_failed,
                state = %result.state,
                "RBAC sync finished"
            );
            result
        }
        .instrument(span)
        .await;

        Ok(result)
    }

    async fn apply_with_retry(&self, scope: &Scope, op: &ChangeOperation) -> Result<()> {
        let mut schedule = self.retry.schedule();
        let mut attempt = 1;
        loop {
            match self.apply(scope, op).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.retry.max_attempts => {
                    let delay = schedule.next_backoff().unwrap_or(self.retry.max_backoff);
                    tracing::debug!(
                        role = op.role(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying write"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn apply(&self, scope: &Scope, op: &ChangeOperation) -> Result<()> {
        let store = self.destination.as_ref();
        match op {
            ChangeOperation::Add { role, actions } | ChangeOperation::Update { role, actions } => {
                bounded::grant(store, scope, role, actions, self.write_timeout).await
            }
            ChangeOperation::Remove { role } => {
                bounded::revoke(store, scope, role, self.write_timeout).await
            }
        }
    }
}

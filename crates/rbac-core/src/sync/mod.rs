//! Diff, plan and apply for one `(tenant, namespace)` scope
//!
//! This module provides:
//! - **diff**: Read both stores and partition every role
//! - **planner**: Turn a diff and a direction into ordered change operations
//! - **executor**: Apply a plan to the destination, isolating per-role failures
//! - **engine**: The `ReconcileEngine` facade callers talk to

mod bounded;
mod diff;
mod engine;
mod executor;
mod plan;
mod planner;

pub use diff::{ActionDelta, DiffEngine, Partition, PermissionDiff, compute_diff};
pub use engine::{ReconcileEngine, SyncOptions};
pub use executor::{RetryPolicy, SyncExecutor, SyncResult, SyncState};
pub use plan::{ChangeOperation, SyncPlan};
pub use planner::{PlannerOptions, ReconcileStrategy, SyncPlanner};

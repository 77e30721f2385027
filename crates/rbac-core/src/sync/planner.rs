//! Turns a diff and a direction into a sync plan
//!
//! Planning is pure: it reads only the diff and never touches a store, so a
//! preview can be requested any number of times.

use std::collections::BTreeSet;
use std::fmt;

use chrono::Utc;
use rbac_model::{ActionSet, Side, SyncDirection};
use serde::{Deserialize, Serialize};

use super::diff::PermissionDiff;
use super::plan::{ChangeOperation, SyncPlan};

/// Reconciliation policy for the destination side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileStrategy {
    /// Destination is made identical to the source, including removals
    #[default]
    Mirror,
    /// Destination keeps what it has; source actions are added on top
    Merge,
}

impl fmt::Display for ReconcileStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileStrategy::Mirror => write!(f, "mirror"),
            ReconcileStrategy::Merge => write!(f, "merge"),
        }
    }
}

/// Planner settings
#[derive(Debug, Clone, Default)]
pub struct PlannerOptions {
    pub strategy: ReconcileStrategy,
    /// Roles whose removal deserves an explicit warning
    pub superuser_roles: BTreeSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SyncPlanner {
    options: PlannerOptions,
}

impl SyncPlanner {
    pub fn new(options: PlannerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PlannerOptions {
        &self.options
    }

    /// Build the plan that makes the destination of `direction` match its source.
    ///
    /// Removals come first, then additions, then updates; each group is
    /// ordered by role name.
    pub fn plan(&self, diff: &PermissionDiff, direction: SyncDirection) -> SyncPlan {
        let source = direction.source();
        let destination = direction.destination();

        let mut removals = Vec::new();
        let mut changes = Vec::new();
        let mut warnings = Vec::new();

        if self.options.strategy == ReconcileStrategy::Mirror {
            for role in diff.only_in(destination).keys() {
                removals.push(ChangeOperation::remove(role.as_str()));
                warnings.push(format!(
                    "Role '{}' exists only in {} and will be removed",
                    role,
                    side_label(destination)
                ));
                if self.options.superuser_roles.contains(role) {
                    warnings.push(format!(
                        "Role '{}' is a superuser role and will be left with no actions on {}",
                        role,
                        side_label(destination)
                    ));
                }
            }
        }

        for (role, actions) in diff.only_in(source) {
            changes.push(ChangeOperation::add(role.as_str(), actions.clone()));
        }

        for (role, delta) in &diff.different {
            let target = match self.options.strategy {
                ReconcileStrategy::Mirror => delta.side(source).clone(),
                ReconcileStrategy::Merge => {
                    let merged = delta.side(destination).union(delta.side(source));
                    if &merged == delta.side(destination) {
                        continue;
                    }
                    merged
                }
            };
            changes.push(ChangeOperation::update(role.as_str(), target));
        }

        for op in &changes {
            if let Some(actions) = op.actions() {
                warnings.extend(unsupported_warnings(op.role(), actions, destination));
            }
        }
        for side in [source, destination] {
            for found in diff.unrecognized(side) {
                warnings.push(format!(
                    "Role '{}' on {} carries unrecognized action '{}'",
                    found.role,
                    side_label(side),
                    found.action
                ));
            }
        }

        let mut operations = removals;
        operations.extend(changes);

        tracing::debug!(
            scope = %diff.scope,
            direction = %direction,
            strategy = %self.options.strategy,
            operations = operations.len(),
            warnings = warnings.len(),
            "planned RBAC sync"
        );

        SyncPlan {
            scope: diff.scope.clone(),
            direction,
            strategy: self.options.strategy,
            operations,
            warnings,
            generated_at: Utc::now(),
        }
    }
}

fn side_label(side: Side) -> &'static str {
    match side {
        Side::Console => "Console",
        Side::Pulsar => "Pulsar",
    }
}

/// Known actions the destination has no way to store
fn unsupported_warnings(role: &str, actions: &ActionSet, destination: Side) -> Vec<String> {
    actions
        .iter()
        .filter(|a| a.is_known() && !destination.supports(a))
        .map(|a| {
            format!(
                "Action '{}' for role '{}' is not supported by {} and may be rejected",
                a,
                role,
                side_label(destination)
            )
        })
        .collect()
}

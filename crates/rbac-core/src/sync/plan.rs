//! Change operations and sync plans

use std::fmt;

use chrono::{DateTime, Utc};
use rbac_model::{ActionSet, Scope, SyncDirection};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::planner::ReconcileStrategy;

/// Prefix of plan fingerprints
const FINGERPRINT_PREFIX: &str = "sha256:";

/// One atomic change against the destination side
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ChangeOperation {
    /// Destination lacks the role; grant it the source's actions
    Add { role: String, actions: ActionSet },
    /// Destination has a role the source does not; revoke it
    Remove { role: String },
    /// Destination's actions are overwritten wholesale
    Update { role: String, actions: ActionSet },
}

impl ChangeOperation {
    pub fn add(role: impl Into<String>, actions: ActionSet) -> Self {
        Self::Add {
            role: role.into(),
            actions,
        }
    }

    pub fn remove(role: impl Into<String>) -> Self {
        Self::Remove { role: role.into() }
    }

    pub fn update(role: impl Into<String>, actions: ActionSet) -> Self {
        Self::Update {
            role: role.into(),
            actions,
        }
    }

    pub fn role(&self) -> &str {
        match self {
            Self::Add { role, .. } | Self::Remove { role } | Self::Update { role, .. } => role,
        }
    }

    /// `add`, `remove` or `update`
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Remove { .. } => "remove",
            Self::Update { .. } => "update",
        }
    }

    /// Actions the destination ends up with, `None` for removals
    pub fn actions(&self) -> Option<&ActionSet> {
        match self {
            Self::Add { actions, .. } | Self::Update { actions, .. } => Some(actions),
            Self::Remove { .. } => None,
        }
    }

    pub fn is_remove(&self) -> bool {
        matches!(self, Self::Remove { .. })
    }
}

impl fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add { role, actions } => write!(f, "Add {}: {}", role, actions),
            Self::Remove { role } => write!(f, "Remove {}", role),
            Self::Update { role, actions } => write!(f, "Update {}: {}", role, actions),
        }
    }
}

/// Ordered operations a sync would perform, plus advisory warnings.
///
/// A plan is built fresh for every preview or sync call and never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPlan {
    pub scope: Scope,
    pub direction: SyncDirection,
    pub strategy: ReconcileStrategy,
    pub operations: Vec<ChangeOperation>,
    /// Non-blocking notes for the operator
    pub warnings: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    scope: String,
    direction: SyncDirection,
    strategy: ReconcileStrategy,
    operations: &'a [ChangeOperation],
}

impl SyncPlan {
    pub fn has_changes(&self) -> bool {
        !self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Canonical `sha256:<hex>` digest of what the plan would do.
    ///
    /// Covers scope, direction, strategy and operations; warnings and the
    /// generation time are excluded, so two previews of unchanged state share
    /// a fingerprint.
    pub fn fingerprint(&self) -> String {
        let input = FingerprintInput {
            scope: self.scope.key(),
            direction: self.direction,
            strategy: self.strategy,
            operations: &self.operations,
        };
        // Serializing plain structs, strings and sets cannot fail
        let canonical = serde_json::to_vec(&input).unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        format!("{}{:x}", FINGERPRINT_PREFIX, hasher.finalize())
    }
}

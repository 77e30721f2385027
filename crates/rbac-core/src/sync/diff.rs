//! Diff between the console and broker permission sets of one scope

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rbac_model::{
    ActionSet, NormalizeOptions, PermissionSet, Scope, Side, UnrecognizedAction, equals_actions,
};
use rbac_store::StoreAdapter;
use serde::{Deserialize, Serialize};

use super::bounded;
use crate::{Error, Result};

/// Action sets of a role that exists on both sides but differs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDelta {
    pub console: ActionSet,
    pub pulsar: ActionSet,
}

impl ActionDelta {
    pub fn side(&self, side: Side) -> &ActionSet {
        match side {
            Side::Console => &self.console,
            Side::Pulsar => &self.pulsar,
        }
    }
}

/// Which partition of a diff a role landed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    OnlyInConsole,
    OnlyInPulsar,
    Different,
    Same,
}

/// Structured difference between the two sides of one scope.
///
/// Every role present on either side appears in exactly one of the four
/// partitions. The totals count each side's roles independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDiff {
    pub scope: Scope,
    pub only_in_console: BTreeMap<String, ActionSet>,
    pub only_in_pulsar: BTreeMap<String, ActionSet>,
    pub different: BTreeMap<String, ActionDelta>,
    pub same: BTreeMap<String, ActionSet>,
    pub total_console: usize,
    pub total_pulsar: usize,
    /// Unrecognized actions seen on the console side
    #[serde(default)]
    pub unrecognized_console: Vec<UnrecognizedAction>,
    /// Unrecognized actions seen on the broker side
    #[serde(default)]
    pub unrecognized_pulsar: Vec<UnrecognizedAction>,
}

impl PermissionDiff {
    /// Roles present only on `side`
    pub fn only_in(&self, side: Side) -> &BTreeMap<String, ActionSet> {
        match side {
            Side::Console => &self.only_in_console,
            Side::Pulsar => &self.only_in_pulsar,
        }
    }

    pub fn unrecognized(&self, side: Side) -> &[UnrecognizedAction] {
        match side {
            Side::Console => &self.unrecognized_console,
            Side::Pulsar => &self.unrecognized_pulsar,
        }
    }

    /// True when both sides hold identical permissions
    pub fn is_in_sync(&self) -> bool {
        self.only_in_console.is_empty() && self.only_in_pulsar.is_empty() && self.different.is_empty()
    }

    /// Size of the union of both sides' roles
    pub fn role_count(&self) -> usize {
        self.only_in_console.len() + self.only_in_pulsar.len() + self.different.len() + self.same.len()
    }

    pub fn partition_of(&self, role: &str) -> Option<Partition> {
        if self.only_in_console.contains_key(role) {
            Some(Partition::OnlyInConsole)
        } else if self.only_in_pulsar.contains_key(role) {
            Some(Partition::OnlyInPulsar)
        } else if self.different.contains_key(role) {
            Some(Partition::Different)
        } else if self.same.contains_key(role) {
            Some(Partition::Same)
        } else {
            None
        }
    }
}

/// Classify every role of two normalized permission sets.
///
/// Both sets must belong to the same scope; the console set's scope is used.
pub fn compute_diff(console: &PermissionSet, pulsar: &PermissionSet) -> PermissionDiff {
    debug_assert_eq!(console.scope(), pulsar.scope(), "diffing across scopes");

    let mut only_in_console = BTreeMap::new();
    let mut only_in_pulsar = BTreeMap::new();
    let mut different = BTreeMap::new();
    let mut same = BTreeMap::new();

    for (role, console_actions) in console.iter() {
        match pulsar.get(role) {
            None => {
                only_in_console.insert(role.to_string(), console_actions.clone());
            }
            Some(pulsar_actions) if equals_actions(console_actions, pulsar_actions) => {
                same.insert(role.to_string(), console_actions.clone());
            }
            Some(pulsar_actions) => {
                different.insert(
                    role.to_string(),
                    ActionDelta {
                        console: console_actions.clone(),
                        pulsar: pulsar_actions.clone(),
                    },
                );
            }
        }
    }

    for (role, pulsar_actions) in pulsar.iter() {
        if !console.contains_role(role) {
            only_in_pulsar.insert(role.to_string(), pulsar_actions.clone());
        }
    }

    PermissionDiff {
        scope: console.scope().clone(),
        only_in_console,
        only_in_pulsar,
        different,
        same,
        total_console: console.len(),
        total_pulsar: pulsar.len(),
        unrecognized_console: console.unrecognized(),
        unrecognized_pulsar: pulsar.unrecognized(),
    }
}

/// Reads both stores and diffs them.
///
/// Both reads run concurrently; the diff is only built once both succeed.
#[derive(Clone)]
pub struct DiffEngine {
    console: Arc<dyn StoreAdapter>,
    pulsar: Arc<dyn StoreAdapter>,
    read_timeout: Duration,
    normalize: NormalizeOptions,
}

impl DiffEngine {
    pub fn new(
        console: Arc<dyn StoreAdapter>,
        pulsar: Arc<dyn StoreAdapter>,
        read_timeout: Duration,
        normalize: NormalizeOptions,
    ) -> Self {
        Self {
            console,
            pulsar,
            read_timeout,
            normalize,
        }
    }

    /// Fetch and normalize both sides of `scope`
    ///
    /// # Errors
    ///
    /// [`Error::StoreUnavailable`] if either read fails or times out,
    /// [`Error::MalformedPermission`] if either side's data is malformed.
    pub async fn fetch_both(&self, scope: &Scope) -> Result<(PermissionSet, PermissionSet)> {
        let (console_raw, pulsar_raw) = tokio::try_join!(
            bounded::fetch(self.console.as_ref(), scope, self.read_timeout),
            bounded::fetch(self.pulsar.as_ref(), scope, self.read_timeout),
        )?;

        let console = PermissionSet::normalize(scope.clone(), &console_raw, self.normalize)
            .map_err(|source| Error::MalformedPermission {
                side: Side::Console,
                source,
            })?;
        let pulsar = PermissionSet::normalize(scope.clone(), &pulsar_raw, self.normalize)
            .map_err(|source| Error::MalformedPermission {
                side: Side::Pulsar,
                source,
            })?;

        Ok((console, pulsar))
    }

    /// Compute the diff for `scope`. Has no side effects.
    pub async fn compute_diff(&self, scope: &Scope) -> Result<PermissionDiff> {
        let (console, pulsar) = self.fetch_both(scope).await?;
        let diff = compute_diff(&console, &pulsar);

        tracing::info!(
            scope = %scope,
            only_in_console = diff.only_in_console.len(),
            only_in_pulsar = diff.only_in_pulsar.len(),
            different = diff.different.len(),
            same = diff.same.len(),
            "computed RBAC diff"
        );

        Ok(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbac_model::RawPermissions;

    fn set(raw: RawPermissions) -> PermissionSet {
        let scope = Scope::new("public", "default").unwrap();
        PermissionSet::normalize(scope, &raw, NormalizeOptions::default()).unwrap()
    }

    #[test]
    fn test_spec_scenario_diff() {
        let console = set(RawPermissions::new().with("editor", ["produce", "consume"]));
        let pulsar = set(
            RawPermissions::new()
                .with("editor", ["produce"])
                .with("legacy", ["consume"]),
        );

        let diff = compute_diff(&console, &pulsar);

        assert!(diff.only_in_console.is_empty());
        assert_eq!(diff.only_in_pulsar.len(), 1);
        assert_eq!(diff.only_in_pulsar["legacy"].to_strings(), vec!["consume"]);
        assert_eq!(diff.different["editor"].console.to_strings(), vec!["produce", "consume"]);
        assert_eq!(diff.different["editor"].pulsar.to_strings(), vec!["produce"]);
        assert!(diff.same.is_empty());
        assert_eq!(diff.total_console, 1);
        assert_eq!(diff.total_pulsar, 2);
    }

    #[test]
    fn test_same_ignores_action_order() {
        let console = set(RawPermissions::new().with("reader", ["consume", "produce"]));
        let pulsar = set(RawPermissions::new().with("reader", ["produce", "consume", "consume"]));
        let diff = compute_diff(&console, &pulsar);
        assert!(diff.is_in_sync());
        assert_eq!(diff.partition_of("reader"), Some(Partition::Same));
    }

    #[test]
    fn test_empty_role_counts_as_absent() {
        let console = set(RawPermissions::new().with("ghost", Vec::<String>::new()));
        let pulsar = set(RawPermissions::new().with("ghost", ["consume"]));
        let diff = compute_diff(&console, &pulsar);
        assert_eq!(diff.partition_of("ghost"), Some(Partition::OnlyInPulsar));
        assert_eq!(diff.total_console, 0);
    }

    #[test]
    fn test_diff_serializes_with_partition_names() {
        let console = set(RawPermissions::new().with("a", ["produce"]));
        let pulsar = set(RawPermissions::new());
        let json = serde_json::to_value(compute_diff(&console, &pulsar)).unwrap();
        assert_eq!(json["only_in_console"]["a"][0], "produce");
        assert_eq!(json["total_pulsar"], 0);
    }
}

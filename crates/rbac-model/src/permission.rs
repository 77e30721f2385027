//! Canonical role → actions mapping for one side of one scope

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{Action, ActionSet, Error, Result, Scope};

/// A role entry exactly as a store reported it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    pub role: String,
    pub actions: Vec<String>,
}

/// Unnormalized permission data fetched from a store.
///
/// May contain empty action lists, duplicate actions and unknown tags; it is
/// only meaningful after [`PermissionSet::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPermissions(Vec<RawEntry>);

impl RawPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<I, S>(&mut self, role: impl Into<String>, actions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.push(RawEntry {
            role: role.into(),
            actions: actions.into_iter().map(Into::into).collect(),
        });
    }

    /// Builder form of [`push`](Self::push)
    pub fn with<I, S>(mut self, role: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(role, actions);
        self
    }

    pub fn entries(&self) -> &[RawEntry] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<BTreeMap<String, Vec<String>>> for RawPermissions {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        Self(
            map.into_iter()
                .map(|(role, actions)| RawEntry { role, actions })
                .collect(),
        )
    }
}

/// Knobs for [`PermissionSet::normalize`]
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    /// Reject actions outside the known universe instead of flagging them
    pub reject_unknown_actions: bool,
}

/// An action outside the known universe, found on a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnrecognizedAction {
    pub role: String,
    pub action: String,
}

/// Normalized permissions of one side for one scope.
///
/// Invariants: at most one entry per role, no entry with an empty action set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    scope: Scope,
    entries: BTreeMap<String, ActionSet>,
}

impl PermissionSet {
    /// Create an empty permission set for a scope
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            entries: BTreeMap::new(),
        }
    }

    /// Normalize raw store data into a permission set.
    ///
    /// Roles with no actions are dropped and duplicate actions collapse.
    /// Unknown actions are kept and reported by [`unrecognized`](Self::unrecognized)
    /// unless `options.reject_unknown_actions` is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedPermission`] if a role name is empty, an
    /// action tag is empty, the same role appears twice, or (strict mode) an
    /// action is not recognized.
    pub fn normalize(scope: Scope, raw: &RawPermissions, options: NormalizeOptions) -> Result<Self> {
        let mut entries = BTreeMap::new();
        let mut seen = HashSet::new();

        for entry in raw.entries() {
            if entry.role.is_empty() {
                return Err(Error::malformed("", "role name must not be empty"));
            }
            if !seen.insert(entry.role.as_str()) {
                return Err(Error::malformed(
                    &entry.role,
                    "role appears more than once in the same scope",
                ));
            }

            let mut actions = ActionSet::new();
            for tag in &entry.actions {
                if tag.is_empty() {
                    return Err(Error::malformed(&entry.role, "action tag must not be empty"));
                }
                let action = Action::parse(tag);
                if options.reject_unknown_actions && !action.is_known() {
                    return Err(Error::malformed(
                        &entry.role,
                        format!("unrecognized action '{}'", tag),
                    ));
                }
                actions.insert(action);
            }

            if !actions.is_empty() {
                entries.insert(entry.role.clone(), actions);
            }
        }

        Ok(Self { scope, entries })
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Set a role's actions; an empty set removes the role
    pub fn insert(&mut self, role: impl Into<String>, actions: ActionSet) {
        let role = role.into();
        if actions.is_empty() {
            self.entries.remove(&role);
        } else {
            self.entries.insert(role, actions);
        }
    }

    pub fn remove(&mut self, role: &str) -> Option<ActionSet> {
        self.entries.remove(role)
    }

    pub fn get(&self, role: &str) -> Option<&ActionSet> {
        self.entries.get(role)
    }

    pub fn contains_role(&self, role: &str) -> bool {
        self.entries.contains_key(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ActionSet)> {
        self.entries.iter().map(|(role, actions)| (role.as_str(), actions))
    }

    /// Number of roles
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every action outside the known universe, per role
    pub fn unrecognized(&self) -> Vec<UnrecognizedAction> {
        self.entries
            .iter()
            .flat_map(|(role, actions)| {
                actions.unrecognized().map(move |action| UnrecognizedAction {
                    role: role.clone(),
                    action: action.to_string(),
                })
            })
            .collect()
    }

    /// Convert back to the raw store shape
    pub fn to_raw(&self) -> RawPermissions {
        self.entries
            .iter()
            .map(|(role, actions)| (role.clone(), actions.to_strings()))
            .collect::<BTreeMap<_, _>>()
            .into()
    }
}

//! Permission actions and action sets

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single capability tag grantable to a role.
///
/// The known universe is the console's permission action enum. Anything else
/// is kept verbatim as [`Action::Other`] so callers can report it instead of
/// losing it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    Produce,
    Consume,
    Functions,
    Sources,
    Sinks,
    Packages,
    Admin,
    Read,
    Write,
    /// Action tag outside the known universe
    Other(String),
}

/// Every recognized action, in canonical order.
pub const KNOWN_ACTIONS: [Action; 9] = [
    Action::Produce,
    Action::Consume,
    Action::Functions,
    Action::Sources,
    Action::Sinks,
    Action::Packages,
    Action::Admin,
    Action::Read,
    Action::Write,
];

impl Action {
    /// Parse an action tag. Matching is case-sensitive.
    pub fn parse(tag: &str) -> Self {
        match tag {
            "produce" => Self::Produce,
            "consume" => Self::Consume,
            "functions" => Self::Functions,
            "sources" => Self::Sources,
            "sinks" => Self::Sinks,
            "packages" => Self::Packages,
            "admin" => Self::Admin,
            "read" => Self::Read,
            "write" => Self::Write,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Produce => "produce",
            Self::Consume => "consume",
            Self::Functions => "functions",
            Self::Sources => "sources",
            Self::Sinks => "sinks",
            Self::Packages => "packages",
            Self::Admin => "admin",
            Self::Read => "read",
            Self::Write => "write",
            Self::Other(tag) => tag,
        }
    }

    /// True if the action belongs to the known universe
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Action {
    fn from(tag: String) -> Self {
        Self::parse(&tag)
    }
}

impl From<&str> for Action {
    fn from(tag: &str) -> Self {
        Self::parse(tag)
    }
}

impl From<&Action> for Action {
    fn from(action: &Action) -> Self {
        action.clone()
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        match action {
            Action::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

/// Unordered, duplicate-free set of actions held by one role.
///
/// Backed by a `BTreeSet` so iteration and serialization are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionSet(BTreeSet<Action>);

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, action: impl Into<Action>) -> bool {
        self.0.insert(action.into())
    }

    pub fn contains(&self, action: &Action) -> bool {
        self.0.contains(action)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.0.iter()
    }

    /// Actions outside the known universe
    pub fn unrecognized(&self) -> impl Iterator<Item = &Action> {
        self.0.iter().filter(|a| !a.is_known())
    }

    pub fn union(&self, other: &ActionSet) -> ActionSet {
        Self(self.0.union(&other.0).cloned().collect())
    }

    pub fn is_subset(&self, other: &ActionSet) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Action tags as plain strings, in canonical order
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|a| a.as_str().to_string()).collect()
    }
}

impl<A: Into<Action>> FromIterator<A> for ActionSet {
    fn from_iter<I: IntoIterator<Item = A>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a ActionSet {
    type Item = &'a Action;
    type IntoIter = std::collections::btree_set::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.to_strings().join(", "))
    }
}

/// Compare two action collections as sets.
///
/// Ordering and duplicates are ignored; the result is true iff both sides
/// contain exactly the same actions.
pub fn equals_actions<A, B, T, U>(a: A, b: B) -> bool
where
    A: IntoIterator<Item = T>,
    B: IntoIterator<Item = U>,
    T: Into<Action>,
    U: Into<Action>,
{
    let left: ActionSet = a.into_iter().collect();
    let right: ActionSet = b.into_iter().collect();
    left == right
}

//! The two systems of record and the sync direction between them

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Action;

/// One of the two permission stores being reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Console role/permission database
    Console,
    /// Broker-side namespace ACLs
    Pulsar,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Console => Side::Pulsar,
            Side::Pulsar => Side::Console,
        }
    }

    /// Whether this side can store the given action.
    ///
    /// The broker only knows the namespace-level ACL actions; the console
    /// accepts its whole action enum.
    pub fn supports(self, action: &Action) -> bool {
        match self {
            Side::Console => action.is_known(),
            Side::Pulsar => matches!(
                action,
                Action::Produce
                    | Action::Consume
                    | Action::Functions
                    | Action::Packages
                    | Action::Sinks
                    | Action::Sources
            ),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Console => write!(f, "console"),
            Side::Pulsar => write!(f, "pulsar"),
        }
    }
}

/// Which side is the source of truth for a sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    ConsoleToPulsar,
    PulsarToConsole,
}

impl SyncDirection {
    pub fn source(self) -> Side {
        match self {
            SyncDirection::ConsoleToPulsar => Side::Console,
            SyncDirection::PulsarToConsole => Side::Pulsar,
        }
    }

    /// The side being overwritten; always the one not named as source
    pub fn destination(self) -> Side {
        self.source().other()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyncDirection::ConsoleToPulsar => "console_to_pulsar",
            SyncDirection::PulsarToConsole => "pulsar_to_console",
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "console_to_pulsar" => Ok(SyncDirection::ConsoleToPulsar),
            "pulsar_to_console" => Ok(SyncDirection::PulsarToConsole),
            other => Err(format!(
                "unknown sync direction '{}' (expected console_to_pulsar or pulsar_to_console)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_is_never_source() {
        for direction in [SyncDirection::ConsoleToPulsar, SyncDirection::PulsarToConsole] {
            assert_ne!(direction.source(), direction.destination());
        }
        assert_eq!(SyncDirection::ConsoleToPulsar.destination(), Side::Pulsar);
        assert_eq!(SyncDirection::PulsarToConsole.destination(), Side::Console);
    }

    #[test]
    fn test_pulsar_rejects_console_only_actions() {
        assert!(Side::Pulsar.supports(&Action::Consume));
        assert!(!Side::Pulsar.supports(&Action::Admin));
        assert!(Side::Console.supports(&Action::Admin));
        assert!(!Side::Console.supports(&Action::Other("x".into())));
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(
            "pulsar_to_console".parse::<SyncDirection>().unwrap(),
            SyncDirection::PulsarToConsole
        );
        assert!("sideways".parse::<SyncDirection>().is_err());
    }
}

//! Reconciler configuration parsed from TOML
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! [sync]
//! mode = "sync_to_pulsar"
//! strategy = "mirror"
//! superuser_roles = ["superuser"]
//! reject_unknown_actions = false
//!
//! [timeouts]
//! read_ms = 5000
//! write_ms = 5000
//!
//! [retry]
//! max_attempts = 1
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use rbac_model::{NormalizeOptions, SyncDirection};
use serde::{Deserialize, Serialize};

use crate::sync::{PlannerOptions, ReconcileStrategy, RetryPolicy};
use crate::{Error, Result};

/// How an environment relates its console RBAC to the broker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Permissions live only in the console; sync needs an explicit direction
    #[default]
    ConsoleOnly,
    /// Console is authoritative and is written to the broker
    SyncToPulsar,
    /// Broker is authoritative and is read into the console
    ReadFromPulsar,
}

impl SyncMode {
    /// Direction implied by the mode, if any
    pub fn default_direction(self) -> Option<SyncDirection> {
        match self {
            SyncMode::ConsoleOnly => None,
            SyncMode::SyncToPulsar => Some(SyncDirection::ConsoleToPulsar),
            SyncMode::ReadFromPulsar => Some(SyncDirection::PulsarToConsole),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::ConsoleOnly => write!(f, "console_only"),
            SyncMode::SyncToPulsar => write!(f, "sync_to_pulsar"),
            SyncMode::ReadFromPulsar => write!(f, "read_from_pulsar"),
        }
    }
}

fn default_superuser_roles() -> Vec<String> {
    vec!["superuser".to_string()]
}

/// `[sync]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSection {
    #[serde(default)]
    pub mode: SyncMode,

    #[serde(default)]
    pub strategy: ReconcileStrategy,

    /// Roles whose removal is called out in plan warnings
    #[serde(default = "default_superuser_roles")]
    pub superuser_roles: Vec<String>,

    /// Treat unrecognized actions as malformed data instead of warnings
    #[serde(default)]
    pub reject_unknown_actions: bool,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            mode: SyncMode::default(),
            strategy: ReconcileStrategy::default(),
            superuser_roles: default_superuser_roles(),
            reject_unknown_actions: false,
        }
    }
}

fn default_timeout_ms() -> u64 {
    5_000
}

/// `[timeouts]` section; bounds every individual store call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutSection {
    #[serde(default = "default_timeout_ms")]
    pub read_ms: u64,

    #[serde(default = "default_timeout_ms")]
    pub write_ms: u64,
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            read_ms: default_timeout_ms(),
            write_ms: default_timeout_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    1
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    2_000
}

/// `[retry]` section for sync writes. One attempt means no retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Full reconciler configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub sync: SyncSection,

    #[serde(default)]
    pub timeouts: TimeoutSection,

    #[serde(default)]
    pub retry: RetrySection,
}

impl SyncConfig {
    /// Parse and validate a configuration from TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let config: SyncConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigNotFound`] if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Reject values that would make every store call fail immediately
    pub fn validate(&self) -> Result<()> {
        if self.timeouts.read_ms == 0 || self.timeouts.write_ms == 0 {
            return Err(Error::InvalidConfig {
                message: "timeouts must be greater than zero".to_string(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::InvalidConfig {
                message: "retry.max_attempts must be at least 1".to_string(),
            });
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(Error::InvalidConfig {
                message: "retry.initial_backoff_ms exceeds retry.max_backoff_ms".to_string(),
            });
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.read_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.write_ms)
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            reject_unknown_actions: self.sync.reject_unknown_actions,
        }
    }

    pub fn planner_options(&self) -> PlannerOptions {
        PlannerOptions {
            strategy: self.sync.strategy,
            superuser_roles: self.sync.superuser_roles.iter().cloned().collect::<BTreeSet<_>>(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SyncConfig::parse("").unwrap();
        assert_eq!(config.sync.mode, SyncMode::ConsoleOnly);
        assert_eq!(config.sync.strategy, ReconcileStrategy::Mirror);
        assert_eq!(config.sync.superuser_roles, vec!["superuser"]);
        assert_eq!(config.read_timeout(), Duration::from_secs(5));
        assert_eq!(config.retry.max_attempts, 1);
    }

    #[test]
    fn test_parse_full_config() {
        let config = SyncConfig::parse(
            r#"
[sync]
mode = "read_from_pulsar"
strategy = "merge"
superuser_roles = ["root", "ops-admin"]
reject_unknown_actions = true

[timeouts]
read_ms = 250
write_ms = 750

[retry]
max_attempts = 3
initial_backoff_ms = 10
max_backoff_ms = 40
"#,
        )
        .unwrap();

        assert_eq!(config.sync.mode, SyncMode::ReadFromPulsar);
        assert_eq!(config.sync.mode.default_direction(), Some(SyncDirection::PulsarToConsole));
        assert_eq!(config.sync.strategy, ReconcileStrategy::Merge);
        assert!(config.normalize_options().reject_unknown_actions);
        assert_eq!(config.write_timeout(), Duration::from_millis(750));
        assert_eq!(config.retry_policy().max_attempts, 3);
        assert!(config.planner_options().superuser_roles.contains("ops-admin"));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = SyncConfig::parse("[retry]\nmax_attempts = 0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(SyncConfig::parse("[sync]\nmode = \"bidirectional\"\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = SyncConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }
}

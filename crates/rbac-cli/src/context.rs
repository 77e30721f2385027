//! Configuration discovery and engine wiring
//!
//! The config file is looked up in this order:
//! 1. `--config` / `RBAC_SYNC_CONFIG`
//! 2. `rbac-sync.toml` in the working directory
//! 3. `<config_dir>/rbac-sync/config.toml` via `dirs::config_dir()`
//!
//! On top of the engine settings it names the two store documents:
//!
//! ```toml
//! [stores.console]
//! path = "console.toml"
//!
//! [stores.pulsar]
//! path = "pulsar.json"
//! ```
//!
//! Relative store paths are resolved against the config file's directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rbac_core::{ReconcileEngine, SyncConfig};
use rbac_model::Side;
use rbac_store::FileStore;
use serde::Deserialize;

use crate::error::{CliError, Result};

/// File name looked up in the working directory
pub const LOCAL_CONFIG: &str = "rbac-sync.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct StoreEntry {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoresSection {
    pub console: StoreEntry,
    pub pulsar: StoreEntry,
}

/// Engine settings plus store locations
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    #[serde(flatten)]
    pub engine: SyncConfig,

    pub stores: StoresSection,
}

impl CliConfig {
    pub fn parse(content: &str) -> Result<Self> {
        let config: CliConfig = toml::from_str(content)?;
        config.engine.validate()?;
        Ok(config)
    }
}

/// A loaded config file
#[derive(Debug, Clone)]
pub struct Context {
    pub config_path: PathBuf,
    pub config: CliConfig,
}

impl Context {
    /// Find and load the configuration
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => discover().ok_or_else(|| {
                CliError::user(format!(
                    "No configuration found. Create {} or pass --config.",
                    LOCAL_CONFIG
                ))
            })?,
        };
        if !config_path.exists() {
            return Err(rbac_core::Error::ConfigNotFound { path: config_path }.into());
        }

        tracing::debug!(path = %config_path.display(), "loading configuration");
        let content = std::fs::read_to_string(&config_path)?;
        let config = CliConfig::parse(&content)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Resolve a store path against the config file's directory
    pub fn store_path(&self, side: Side) -> PathBuf {
        let entry = match side {
            Side::Console => &self.config.stores.console,
            Side::Pulsar => &self.config.stores.pulsar,
        };
        if entry.path.is_absolute() {
            return entry.path.clone();
        }
        self.config_path
            .parent()
            .map(|dir| dir.join(&entry.path))
            .unwrap_or_else(|| entry.path.clone())
    }

    /// Engine over the two file stores named in the config
    pub fn engine(&self) -> Result<ReconcileEngine> {
        let console = FileStore::open(Side::Console, self.store_path(Side::Console))?;
        let pulsar = FileStore::open(Side::Pulsar, self.store_path(Side::Pulsar))?;
        let engine = ReconcileEngine::new(
            Arc::new(console),
            Arc::new(pulsar),
            self.config.engine.clone(),
        )?;
        Ok(engine)
    }
}

fn discover() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|d| d.join("rbac-sync").join("config.toml"))
        .filter(|p| p.exists())
}

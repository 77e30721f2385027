//! Reconciliation engine for console RBAC and broker namespace ACLs
//!
//! This crate sits above the model and store crates and implements:
//!
//! - **Diff**: concurrent read of both sides and a four-way role partition
//! - **Preview**: a pure planner producing ordered `Add`/`Remove`/`Update` operations
//! - **Apply**: sequential execution with per-role failure isolation and optional retry
//! - **Configuration**: sync mode, reconcile strategy, timeouts and retry from TOML
//!
//! # Architecture
//!
//! ```text
//!                  CLI / host application
//!                           |
//!                      rbac-core
//!                           |
//!               +-----------+-----------+
//!               |                       |
//!          rbac-store              rbac-model
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rbac_core::{ReconcileEngine, SyncConfig, SyncOptions};
//! use rbac_model::{Scope, Side, SyncDirection};
//! use rbac_store::MemoryStore;
//!
//! # async fn run() -> rbac_core::Result<()> {
//! let engine = ReconcileEngine::new(
//!     Arc::new(MemoryStore::new(Side::Console)),
//!     Arc::new(MemoryStore::new(Side::Pulsar)),
//!     SyncConfig::default(),
//! )?;
//! let scope = Scope::new("public", "default")?;
//!
//! let preview = engine.get_sync_preview(&scope, SyncDirection::ConsoleToPulsar).await?;
//! let result = engine
//!     .apply_sync(&scope, SyncDirection::ConsoleToPulsar, SyncOptions::expecting(preview.fingerprint()))
//!     .await?;
//! println!("applied {}, failed {}", result.changes_applied(), result.changes_failed());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod sync;

pub use config::{RetrySection, SyncConfig, SyncMode, SyncSection, TimeoutSection};
pub use error::{Error, Result};
pub use sync::{
    ActionDelta, ChangeOperation, DiffEngine, Partition, PermissionDiff, PlannerOptions,
    ReconcileEngine, ReconcileStrategy, RetryPolicy, SyncExecutor, SyncOptions, SyncPlan,
    SyncPlanner, SyncResult, SyncState, compute_diff,
};

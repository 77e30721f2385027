//! Shared test fixtures for the rbac-reconciler workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`fixtures`]: permission builders and seeded store pairs
//! - [`faulty`]: [`FaultyStore`], a store wrapper that fails or stalls on demand
//! - [`files`]: [`TestFiles`], file-backed stores plus a config in a temp dir

pub mod faulty;
pub mod files;
pub mod fixtures;

pub use faulty::FaultyStore;
pub use files::TestFiles;
pub use fixtures::{actions, permission_set, raw, scenario_stores, scope, seeded_stores};

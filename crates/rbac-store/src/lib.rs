//! Permission store adapters for the RBAC reconciler
//!
//! The reconciler never talks to a console database or a broker directly; it
//! goes through [`StoreAdapter`], a small read/write capability per side.
//! Two adapters ship with the crate:
//!
//! - [`MemoryStore`]: in-process state, used for embedding and tests
//! - [`FileStore`]: one TOML/JSON/YAML document on disk, locked on write

pub mod adapter;
pub mod error;
pub mod file;
pub mod memory;

pub use adapter::StoreAdapter;
pub use error::{Error, Result};
pub use file::{DocumentFormat, FileStore};
pub use memory::MemoryStore;

//! Command implementations for rbac-sync

pub mod apply;
pub mod diff;
pub mod preview;

pub use apply::{ApplyArgs, run_apply};
pub use diff::run_diff;
pub use preview::run_preview;

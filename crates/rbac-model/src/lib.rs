//! Canonical permission model for the RBAC reconciler
//!
//! Both systems of record (the console's role store and the broker's
//! namespace ACLs) are mapped onto the same types here:
//!
//! - [`Scope`]: the `(tenant, namespace)` every operation is bound to
//! - [`Action`] / [`ActionSet`]: capability tags and unordered sets of them
//! - [`PermissionSet`]: normalized role → actions mapping for one side
//! - [`Side`] / [`SyncDirection`]: which store is source and which destination

pub mod action;
pub mod error;
pub mod permission;
pub mod scope;
pub mod side;

pub use action::{Action, ActionSet, KNOWN_ACTIONS, equals_actions};
pub use error::{Error, Result};
pub use permission::{NormalizeOptions, PermissionSet, RawEntry, RawPermissions, UnrecognizedAction};
pub use scope::Scope;
pub use side::{Side, SyncDirection};

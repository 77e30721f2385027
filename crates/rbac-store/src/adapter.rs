//! StoreAdapter trait

use std::sync::Arc;

use async_trait::async_trait;
use rbac_model::{ActionSet, RawPermissions, Scope, Side};

use crate::Result;

/// Read/write capability over one system of record.
///
/// Implementations must honor these rules:
/// - `fetch` is all-or-nothing. On failure it returns
///   [`Error::Unavailable`](crate::Error::Unavailable) and no partial data.
/// - `grant` replaces the role's action set on the scope and is idempotent.
/// - `revoke` removes every action of the role on the scope and succeeds
///   silently when the role has none.
/// - Write failures are [`Error::Write`](crate::Error::Write) naming the role.
///   Adapters never retry on their own.
///
/// Timeouts are applied by the caller around each call.
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Which system of record this adapter fronts
    fn side(&self) -> Side;

    /// Read every role's actions on `scope`, as stored
    async fn fetch(&self, scope: &Scope) -> Result<RawPermissions>;

    /// Set `role`'s actions on `scope` to exactly `actions`
    async fn grant(&self, scope: &Scope, role: &str, actions: &ActionSet) -> Result<()>;

    /// Remove all of `role`'s actions on `scope`
    async fn revoke(&self, scope: &Scope, role: &str) -> Result<()>;
}

#[async_trait]
impl<T: StoreAdapter + ?Sized> StoreAdapter for Arc<T> {
    fn side(&self) -> Side {
        (**self).side()
    }

    async fn fetch(&self, scope: &Scope) -> Result<RawPermissions> {
        (**self).fetch(scope).await
    }

    async fn grant(&self, scope: &Scope, role: &str, actions: &ActionSet) -> Result<()> {
        (**self).grant(scope, role, actions).await
    }

    async fn revoke(&self, scope: &Scope, role: &str) -> Result<()> {
        (**self).revoke(scope, role).await
    }
}

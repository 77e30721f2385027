//! Store calls bounded by a timeout
//!
//! A read that fails or times out becomes [`Error::StoreUnavailable`]; a write
//! that fails or times out becomes [`Error::StoreWrite`]. Nothing is left
//! pending past the deadline.

use std::time::Duration;

use rbac_model::{ActionSet, RawPermissions, Scope};
use rbac_store::StoreAdapter;
use tokio::time::timeout;

use crate::{Error, Result};

pub(crate) async fn fetch(
    store: &dyn StoreAdapter,
    scope: &Scope,
    limit: Duration,
) -> Result<RawPermissions> {
    let side = store.side();
    match timeout(limit, store.fetch(scope)).await {
        Ok(Ok(raw)) => Ok(raw),
        Ok(Err(e)) => Err(Error::from_read(side, e)),
        Err(_) => Err(Error::StoreUnavailable {
            side,
            message: format!("read timed out after {}ms", limit.as_millis()),
        }),
    }
}

pub(crate) async fn grant(
    store: &dyn StoreAdapter,
    scope: &Scope,
    role: &str,
    actions: &ActionSet,
    limit: Duration,
) -> Result<()> {
    let side = store.side();
    match timeout(limit, store.grant(scope, role, actions)).await {
        Ok(result) => result.map_err(|e| Error::from_write(side, role, e)),
        Err(_) => Err(timed_out(side, role, limit)),
    }
}

pub(crate) async fn revoke(
    store: &dyn StoreAdapter,
    scope: &Scope,
    role: &str,
    limit: Duration,
) -> Result<()> {
    let side = store.side();
    match timeout(limit, store.revoke(scope, role)).await {
        Ok(result) => result.map_err(|e| Error::from_write(side, role, e)),
        Err(_) => Err(timed_out(side, role, limit)),
    }
}

fn timed_out(side: rbac_model::Side, role: &str, limit: Duration) -> Error {
    Error::StoreWrite {
        side,
        role: role.to_string(),
        message: format!("write timed out after {}ms", limit.as_millis()),
    }
}

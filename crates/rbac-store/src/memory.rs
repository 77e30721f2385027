//! In-process permission store

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use rbac_model::{ActionSet, RawPermissions, Scope, Side};

use crate::{Error, Result, StoreAdapter};

type ScopeTable = BTreeMap<String, Vec<String>>;

/// Permission store held in memory, one per side.
///
/// With action enforcement on (the default) a grant containing an action the
/// side cannot represent is rejected as a write error, the way the broker
/// rejects ACL actions it does not know.
#[derive(Debug)]
pub struct MemoryStore {
    side: Side,
    enforce_actions: bool,
    scopes: RwLock<HashMap<Scope, ScopeTable>>,
}

impl MemoryStore {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            enforce_actions: true,
            scopes: RwLock::new(HashMap::new()),
        }
    }

    /// A store that accepts any action tag
    pub fn permissive(side: Side) -> Self {
        Self {
            enforce_actions: false,
            ..Self::new(side)
        }
    }

    /// Replace the contents of `scope` with `raw`, bypassing validation.
    ///
    /// Intended for seeding; stores whatever the raw data says, including
    /// empty or duplicate entries (later entries win).
    pub fn seed(&self, scope: &Scope, raw: &RawPermissions) -> Result<()> {
        let mut scopes = self
            .scopes
            .write()
            .map_err(|_| Error::unavailable(self.side, "memory store lock poisoned"))?;
        let table = raw
            .entries()
            .iter()
            .map(|e| (e.role.clone(), e.actions.clone()))
            .collect();
        scopes.insert(scope.clone(), table);
        Ok(())
    }

    /// Current contents of `scope`
    pub fn snapshot(&self, scope: &Scope) -> Result<RawPermissions> {
        let scopes = self
            .scopes
            .read()
            .map_err(|_| Error::unavailable(self.side, "memory store lock poisoned"))?;
        Ok(scopes.get(scope).cloned().unwrap_or_default().into())
    }

    fn check_actions(&self, role: &str, actions: &ActionSet) -> Result<()> {
        if !self.enforce_actions {
            return Ok(());
        }
        let rejected: Vec<String> = actions
            .iter()
            .filter(|a| !self.side.supports(a))
            .map(|a| a.to_string())
            .collect();
        if rejected.is_empty() {
            Ok(())
        } else {
            Err(Error::write(
                self.side,
                role,
                format!("unsupported actions: {}", rejected.join(", ")),
            ))
        }
    }
}

#[async_trait]
impl StoreAdapter for MemoryStore {
    fn side(&self) -> Side {
        self.side
    }

    async fn fetch(&self, scope: &Scope) -> Result<RawPermissions> {
        self.snapshot(scope)
    }

    async fn grant(&self, scope: &Scope, role: &str, actions: &ActionSet) -> Result<()> {
        self.check_actions(role, actions)?;
        let mut scopes = self
            .scopes
            .write()
            .map_err(|_| Error::write(self.side, role, "memory store lock poisoned"))?;
        let table = scopes.entry(scope.clone()).or_default();
        if actions.is_empty() {
            table.remove(role);
        } else {
            table.insert(role.to_string(), actions.to_strings());
        }
        tracing::trace!(store = %self.side, scope = %scope, role, "granted");
        Ok(())
    }

    async fn revoke(&self, scope: &Scope, role: &str) -> Result<()> {
        let mut scopes = self
            .scopes
            .write()
            .map_err(|_| Error::write(self.side, role, "memory store lock poisoned"))?;
        if let Some(table) = scopes.get_mut(scope) {
            table.remove(role);
        }
        tracing::trace!(store = %self.side, scope = %scope, role, "revoked");
        Ok(())
    }
}

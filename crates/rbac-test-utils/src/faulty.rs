//! [`FaultyStore`]: wraps a real store and injects failures or delays

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rbac_model::{ActionSet, RawPermissions, Scope, Side};
use rbac_store::{Error, Result, StoreAdapter};

/// How many more writes for a role should fail; `None` means always
type FailureBudget = Option<usize>;

/// Store wrapper for exercising failure paths.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use rbac_model::Side;
/// use rbac_store::MemoryStore;
/// use rbac_test_utils::FaultyStore;
///
/// let store = FaultyStore::new(Arc::new(MemoryStore::new(Side::Pulsar)))
///     .fail_writes_for("legacy")
///     .fail_writes_for_times("editor", 1);
/// ```
pub struct FaultyStore<S> {
    inner: S,
    fail_fetch: bool,
    failing_roles: Mutex<HashMap<String, FailureBudget>>,
    delay: Option<Duration>,
    writes: AtomicUsize,
}

impl<S: StoreAdapter> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_fetch: false,
            failing_roles: Mutex::new(HashMap::new()),
            delay: None,
            writes: AtomicUsize::new(0),
        }
    }

    /// Every fetch fails as unavailable
    pub fn fail_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    /// Every grant or revoke of `role` fails
    pub fn fail_writes_for(self, role: &str) -> Self {
        self.set_budget(role, None);
        self
    }

    /// The first `times` writes of `role` fail, later ones pass through
    pub fn fail_writes_for_times(self, role: &str, times: usize) -> Self {
        self.set_budget(role, Some(times));
        self
    }

    /// Sleep before every call, to trip caller timeouts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Write attempts seen so far, failed ones included
    pub fn write_attempts(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn set_budget(&self, role: &str, budget: FailureBudget) {
        let mut roles = self.failing_roles.lock().expect("failure table poisoned");
        roles.insert(role.to_string(), budget);
    }

    async fn before_call(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_write(&self, role: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut roles = self.failing_roles.lock().expect("failure table poisoned");
        let fail = match roles.get_mut(role) {
            None => false,
            Some(None) => true,
            Some(Some(0)) => false,
            Some(Some(remaining)) => {
                *remaining -= 1;
                true
            }
        };
        if fail {
            Err(Error::write(self.inner.side(), role, "injected failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl<S: StoreAdapter> StoreAdapter for FaultyStore<S> {
    fn side(&self) -> Side {
        self.inner.side()
    }

    async fn fetch(&self, scope: &Scope) -> Result<RawPermissions> {
        self.before_call().await;
        if self.fail_fetch {
            return Err(Error::unavailable(self.inner.side(), "injected outage"));
        }
        self.inner.fetch(scope).await
    }

    async fn grant(&self, scope: &Scope, role: &str, actions: &ActionSet) -> Result<()> {
        self.before_call().await;
        self.check_write(role)?;
        self.inner.grant(scope, role, actions).await
    }

    async fn revoke(&self, scope: &Scope, role: &str) -> Result<()> {
        self.before_call().await;
        self.check_write(role)?;
        self.inner.revoke(scope, role).await
    }
}

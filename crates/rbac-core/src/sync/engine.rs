//! ReconcileEngine: the caller-facing diff / preview / apply surface
//!
//! Every call re-reads both stores. Nothing computed by one call (diff, plan)
//! is reused by the next.

use std::sync::Arc;

use rbac_model::{Scope, Side, SyncDirection};
use rbac_store::StoreAdapter;

use super::diff::{DiffEngine, PermissionDiff};
use super::executor::{SyncExecutor, SyncResult};
use super::plan::SyncPlan;
use super::planner::SyncPlanner;
use crate::config::{SyncConfig, SyncMode};
use crate::{Error, Result};

/// Options for [`ReconcileEngine::apply_sync`]
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Plan and report, but write nothing
    pub dry_run: bool,
    /// Fingerprint of the preview the operator approved. When set, the sync
    /// is refused if the fresh plan no longer matches it.
    pub expected_fingerprint: Option<String>,
}

impl SyncOptions {
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    pub fn expecting(fingerprint: impl Into<String>) -> Self {
        Self {
            dry_run: false,
            expected_fingerprint: Some(fingerprint.into()),
        }
    }
}

/// Reconciles one console store with one broker store
pub struct ReconcileEngine {
    console: Arc<dyn StoreAdapter>,
    pulsar: Arc<dyn StoreAdapter>,
    config: SyncConfig,
    diff: DiffEngine,
    planner: SyncPlanner,
}

impl ReconcileEngine {
    /// Create an engine over a console store and a broker store
    ///
    /// # Errors
    ///
    /// [`Error::StoreSideMismatch`] if a store is wired to the wrong side,
    /// [`Error::InvalidConfig`] if `config` fails validation.
    pub fn new(
        console: Arc<dyn StoreAdapter>,
        pulsar: Arc<dyn StoreAdapter>,
        config: SyncConfig,
    ) -> Result<Self> {
        for (store, expected) in [(&console, Side::Console), (&pulsar, Side::Pulsar)] {
            if store.side() != expected {
                return Err(Error::StoreSideMismatch {
                    expected,
                    actual: store.side(),
                });
            }
        }
        config.validate()?;

        let diff = DiffEngine::new(
            console.clone(),
            pulsar.clone(),
            config.read_timeout(),
            config.normalize_options(),
        );
        let planner = SyncPlanner::new(config.planner_options());

        Ok(Self {
            console,
            pulsar,
            config,
            diff,
            planner,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn mode(&self) -> SyncMode {
        self.config.sync.mode
    }

    /// Direction implied by the configured sync mode
    ///
    /// # Errors
    ///
    /// [`Error::SyncDisabled`] when the mode is `console_only`.
    pub fn default_direction(&self) -> Result<SyncDirection> {
        self.mode().default_direction().ok_or(Error::SyncDisabled)
    }

    /// Use `direction` if given, else the mode's default
    pub fn resolve_direction(&self, direction: Option<SyncDirection>) -> Result<SyncDirection> {
        match direction {
            Some(direction) => Ok(direction),
            None => self.default_direction(),
        }
    }

    /// Read-only diff of both sides of `scope`
    pub async fn get_diff(&self, scope: &Scope) -> Result<PermissionDiff> {
        self.diff.compute_diff(scope).await
    }

    /// Read-only preview: the plan a sync in `direction` would execute now
    pub async fn get_sync_preview(&self, scope: &Scope, direction: SyncDirection) -> Result<SyncPlan> {
        let diff = self.diff.compute_diff(scope).await?;
        Ok(self.planner.plan(&diff, direction))
    }

    /// Diff, plan and (unless dry-running) execute against the destination.
    ///
    /// # Errors
    ///
    /// Read-side failures ([`Error::StoreUnavailable`],
    /// [`Error::MalformedPermission`]) and [`Error::StalePlan`] are returned
    /// before anything is written. Individual write failures are reported in
    /// the [`SyncResult`], not here.
    pub async fn apply_sync(
        &self,
        scope: &Scope,
        direction: SyncDirection,
        options: SyncOptions,
    ) -> Result<SyncResult> {
        let plan = self.get_sync_preview(scope, direction).await?;

        if let Some(expected) = &options.expected_fingerprint {
            let actual = plan.fingerprint();
            if &actual != expected {
                tracing::warn!(scope = %scope, %expected, %actual, "refusing stale sync plan");
                return Err(Error::StalePlan {
                    scope: scope.clone(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        for warning in &plan.warnings {
            tracing::warn!(scope = %scope, "{}", warning);
        }

        if options.dry_run {
            tracing::info!(
                scope = %scope,
                direction = %direction,
                operations = plan.len(),
                "dry run, no changes written"
            );
            return Ok(SyncResult::dry_run(&plan));
        }

        self.executor(direction)
            .execute(&plan, scope, direction)
            .await
    }

    fn executor(&self, direction: SyncDirection) -> SyncExecutor {
        let destination = match direction.destination() {
            Side::Console => self.console.clone(),
            Side::Pulsar => self.pulsar.clone(),
        };
        SyncExecutor::new(destination, self.config.write_timeout()).with_retry(self.config.retry_policy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbac_model::RawPermissions;
    use rbac_store::MemoryStore;

    fn scope() -> Scope {
        Scope::new("public", "default").unwrap()
    }

    fn setup(mode: SyncMode) -> (ReconcileEngine, Arc<MemoryStore>, Arc<MemoryStore>) {
        let console = Arc::new(MemoryStore::new(Side::Console));
        let pulsar = Arc::new(MemoryStore::new(Side::Pulsar));
        console
            .seed(&scope(), &RawPermissions::new().with("editor", ["produce", "consume"]))
            .unwrap();
        pulsar
            .seed(
                &scope(),
                &RawPermissions::new()
                    .with("editor", ["produce"])
                    .with("legacy", ["consume"]),
            )
            .unwrap();

        let mut config = SyncConfig::default();
        config.sync.mode = mode;
        let engine = ReconcileEngine::new(console.clone(), pulsar.clone(), config).unwrap();
        (engine, console, pulsar)
    }

    #[test]
    fn test_swapped_stores_rejected() {
        let console = Arc::new(MemoryStore::new(Side::Console));
        let pulsar = Arc::new(MemoryStore::new(Side::Pulsar));
        let err = ReconcileEngine::new(pulsar, console, SyncConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::StoreSideMismatch { .. }));
    }

    #[test]
    fn test_default_direction_follows_mode() {
        let (engine, _, _) = setup(SyncMode::ConsoleOnly);
        assert!(matches!(engine.default_direction(), Err(Error::SyncDisabled)));
        assert_eq!(
            engine.resolve_direction(Some(SyncDirection::PulsarToConsole)).unwrap(),
            SyncDirection::PulsarToConsole
        );

        let (engine, _, _) = setup(SyncMode::SyncToPulsar);
        assert_eq!(engine.default_direction().unwrap(), SyncDirection::ConsoleToPulsar);
    }

    #[tokio::test]
    async fn test_apply_then_diff_is_in_sync() {
        let (engine, _, _) = setup(SyncMode::SyncToPulsar);
        let result = engine
            .apply_sync(&scope(), SyncDirection::ConsoleToPulsar, SyncOptions::default())
            .await
            .unwrap();
        assert!(result.success());
        assert_eq!(result.changes_applied(), 2);

        let diff = engine.get_diff(&scope()).await.unwrap();
        assert!(diff.is_in_sync());
        assert_eq!(diff.same.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_fingerprint_blocks_writes() {
        let (engine, _, pulsar) = setup(SyncMode::SyncToPulsar);
        let before = pulsar.snapshot(&scope()).unwrap();

        let err = engine
            .apply_sync(
                &scope(),
                SyncDirection::ConsoleToPulsar,
                SyncOptions::expecting("sha256:0000"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::StalePlan { .. }));
        assert_eq!(pulsar.snapshot(&scope()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_matching_fingerprint_applies() {
        let (engine, _, _) = setup(SyncMode::SyncToPulsar);
        let preview = engine
            .get_sync_preview(&scope(), SyncDirection::ConsoleToPulsar)
            .await
            .unwrap();

        let result = engine
            .apply_sync(
                &scope(),
                SyncDirection::ConsoleToPulsar,
                SyncOptions::expecting(preview.fingerprint()),
            )
            .await
            .unwrap();
        assert_eq!(result.changes_applied(), preview.len());
    }
}

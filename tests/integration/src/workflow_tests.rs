//! Operator workflows: preview, confirm, apply, inspect

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rbac_core::{Error, ReconcileEngine, SyncConfig, SyncMode, SyncOptions, SyncState};
use rbac_model::{ActionSet, RawPermissions, SyncDirection};
use rbac_store::StoreAdapter;
use rbac_test_utils::{FaultyStore, scenario_stores, scope, seeded_stores};

fn sync_to_pulsar() -> SyncConfig {
    let mut config = SyncConfig::default();
    config.sync.mode = SyncMode::SyncToPulsar;
    config
}

#[tokio::test]
async fn test_preview_then_apply_with_fingerprint() {
    let (console, pulsar) = scenario_stores();
    let engine = ReconcileEngine::new(console, pulsar.clone(), sync_to_pulsar()).unwrap();
    let direction = engine.default_direction().unwrap();

    let preview = engine.get_sync_preview(&scope(), direction).await.unwrap();
    let result = engine
        .apply_sync(&scope(), direction, SyncOptions::expecting(preview.fingerprint()))
        .await
        .unwrap();

    assert_eq!(result.changes_applied(), preview.len());
    assert!(engine.get_diff(&scope()).await.unwrap().is_in_sync());
}

#[tokio::test]
async fn test_state_change_after_preview_is_refused() {
    let (console, pulsar) = scenario_stores();
    let engine = ReconcileEngine::new(console, pulsar.clone(), sync_to_pulsar()).unwrap();

    let preview = engine
        .get_sync_preview(&scope(), SyncDirection::ConsoleToPulsar)
        .await
        .unwrap();

    // Someone grants a new role on the broker in between
    let actions: ActionSet = ["produce"].into_iter().collect();
    pulsar.grant(&scope(), "intruder", &actions).await.unwrap();

    let err = engine
        .apply_sync(
            &scope(),
            SyncDirection::ConsoleToPulsar,
            SyncOptions::expecting(preview.fingerprint()),
        )
        .await
        .unwrap_err();

    match err {
        Error::StalePlan { expected, actual, .. } => {
            assert_eq!(expected, preview.fingerprint());
            assert_ne!(expected, actual);
        }
        other => panic!("expected StalePlan, got {other:?}"),
    }
    assert_eq!(pulsar.snapshot(&scope()).unwrap().len(), 3);
}

#[tokio::test]
async fn test_partial_failure_then_resync_converges() {
    let (console, pulsar) = seeded_stores(
        &[
            ("alpha", &["produce"]),
            ("bravo", &["consume"]),
            ("charlie", &["sinks"]),
        ],
        &[],
    );
    let flaky = Arc::new(FaultyStore::new(pulsar.clone()).fail_writes_for_times("bravo", 1));
    let engine = ReconcileEngine::new(console, flaky, sync_to_pulsar()).unwrap();

    let first = engine
        .apply_sync(&scope(), SyncDirection::ConsoleToPulsar, SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(first.state(), SyncState::PartiallyFailed);
    assert_eq!(first.changes_applied(), 2);
    assert_eq!(first.changes_failed(), 1);
    assert!(first.errors()[0].contains("bravo"));

    // Only the failed role is left to do
    let preview = engine
        .get_sync_preview(&scope(), SyncDirection::ConsoleToPulsar)
        .await
        .unwrap();
    assert_eq!(preview.len(), 1);
    assert_eq!(preview.operations[0].role(), "bravo");

    let second = engine
        .apply_sync(&scope(), SyncDirection::ConsoleToPulsar, SyncOptions::default())
        .await
        .unwrap();
    assert!(second.success());
    assert_eq!(
        pulsar.snapshot(&scope()).unwrap(),
        RawPermissions::new()
            .with("alpha", ["produce"])
            .with("bravo", ["consume"])
            .with("charlie", ["sinks"])
    );
}

#[tokio::test]
async fn test_slow_broker_reported_not_hung() {
    let (console, pulsar) = scenario_stores();
    let slow = Arc::new(FaultyStore::new(pulsar).with_delay(Duration::from_secs(5)));
    let config = SyncConfig::parse("[timeouts]\nread_ms = 50\n").unwrap();
    let engine = ReconcileEngine::new(console, slow, config).unwrap();

    let started = std::time::Instant::now();
    let err = engine.get_diff(&scope()).await.unwrap_err();

    assert!(matches!(err, Error::StoreUnavailable { .. }));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_result_serializes_for_callers() {
    let (console, pulsar) = scenario_stores();
    let engine = ReconcileEngine::new(console, pulsar, sync_to_pulsar()).unwrap();

    let result = engine
        .apply_sync(&scope(), SyncDirection::ConsoleToPulsar, SyncOptions::default())
        .await
        .unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["changes_applied"], 2);
    assert_eq!(json["changes_failed"], 0);
    assert_eq!(json["errors"], serde_json::json!([]));
    assert_eq!(json["state"], "completed");
}

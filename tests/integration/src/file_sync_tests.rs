//! Reconciliation between file-backed stores in different formats

use std::fs;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use rbac_core::{Error, ReconcileEngine, SyncConfig, SyncOptions};
use rbac_model::{RawPermissions, Scope, Side, SyncDirection};
use rbac_store::{FileStore, StoreAdapter};
use rstest::rstest;
use tempfile::TempDir;

fn engine(console: &FileStore, pulsar: &FileStore) -> ReconcileEngine {
    ReconcileEngine::new(
        Arc::new(console.clone()),
        Arc::new(pulsar.clone()),
        SyncConfig::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_toml_console_to_json_broker() {
    let dir = TempDir::new().unwrap();
    let console_path = dir.path().join("console.toml");
    let pulsar_path = dir.path().join("pulsar.json");
    fs::write(
        &console_path,
        "[\"public/default\"]\neditor = [\"consume\", \"produce\"]\nreader = [\"consume\"]\n",
    )
    .unwrap();
    fs::write(
        &pulsar_path,
        r#"{"public/default": {"editor": ["produce"], "legacy": ["consume"]}}"#,
    )
    .unwrap();

    let console = FileStore::open(Side::Console, &console_path).unwrap();
    let pulsar = FileStore::open(Side::Pulsar, &pulsar_path).unwrap();
    let engine = engine(&console, &pulsar);
    let scope = Scope::new("public", "default").unwrap();

    let result = engine
        .apply_sync(&scope, SyncDirection::ConsoleToPulsar, SyncOptions::default())
        .await
        .unwrap();
    assert!(result.success());
    assert_eq!(result.changes_applied(), 3);

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&pulsar_path).unwrap()).unwrap();
    assert_eq!(
        written,
        serde_json::json!({
            "public/default": {
                "editor": ["produce", "consume"],
                "reader": ["consume"]
            }
        })
    );
    assert!(engine.get_diff(&scope).await.unwrap().is_in_sync());
}

#[tokio::test]
async fn test_yaml_broker_into_missing_console_file() {
    let dir = TempDir::new().unwrap();
    let pulsar_path = dir.path().join("pulsar.yaml");
    fs::write(
        &pulsar_path,
        "public/default:\n  ops:\n    - functions\n    - sinks\n",
    )
    .unwrap();

    let console = FileStore::open(Side::Console, dir.path().join("console.toml")).unwrap();
    let pulsar = FileStore::open(Side::Pulsar, &pulsar_path).unwrap();
    let scope = Scope::new("public", "default").unwrap();

    let result = engine(&console, &pulsar)
        .apply_sync(&scope, SyncDirection::PulsarToConsole, SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(result.changes_applied(), 1);
    assert_eq!(
        console.fetch(&scope).await.unwrap(),
        RawPermissions::new().with("ops", ["functions", "sinks"])
    );
}

#[tokio::test]
async fn test_sync_touches_only_its_scope() {
    let dir = TempDir::new().unwrap();
    let console_path = dir.path().join("console.toml");
    let pulsar_path = dir.path().join("pulsar.toml");
    fs::write(&console_path, "[\"acme/orders\"]\nbilling = [\"consume\"]\n").unwrap();
    fs::write(
        &pulsar_path,
        "[\"acme/orders\"]\nstale = [\"produce\"]\n\n[\"acme/payments\"]\nstale = [\"produce\"]\n",
    )
    .unwrap();

    let console = FileStore::open(Side::Console, &console_path).unwrap();
    let pulsar = FileStore::open(Side::Pulsar, &pulsar_path).unwrap();
    let orders = Scope::new("acme", "orders").unwrap();
    let payments = Scope::new("acme", "payments").unwrap();

    engine(&console, &pulsar)
        .apply_sync(&orders, SyncDirection::ConsoleToPulsar, SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(
        pulsar.fetch(&orders).await.unwrap(),
        RawPermissions::new().with("billing", ["consume"])
    );
    assert_eq!(
        pulsar.fetch(&payments).await.unwrap(),
        RawPermissions::new().with("stale", ["produce"])
    );
}

#[tokio::test]
async fn test_dry_run_leaves_file_bytes_unchanged() {
    let dir = TempDir::new().unwrap();
    let console_path = dir.path().join("console.toml");
    let pulsar_path = dir.path().join("pulsar.toml");
    fs::write(&console_path, "[\"public/default\"]\na = [\"produce\"]\n").unwrap();
    let original = "# hand edited\n[\"public/default\"]\nb = [\"consume\"]\n";
    fs::write(&pulsar_path, original).unwrap();

    let console = FileStore::open(Side::Console, &console_path).unwrap();
    let pulsar = FileStore::open(Side::Pulsar, &pulsar_path).unwrap();
    let scope = Scope::new("public", "default").unwrap();

    let result = engine(&console, &pulsar)
        .apply_sync(&scope, SyncDirection::ConsoleToPulsar, SyncOptions::dry_run())
        .await
        .unwrap();

    assert_eq!(result.planned().len(), 2);
    assert_eq!(fs::read_to_string(&pulsar_path).unwrap(), original);
}

#[rstest]
#[case(
    "console.json",
    r#"{"public/default": {"editor": ["produce"], "editor": ["consume"]}}"#
)]
#[case(
    "console.yaml",
    "public/default:\n  editor: [produce]\n  editor: [consume]\n"
)]
#[case(
    "console.toml",
    "[\"public/default\"]\neditor = [\"produce\"]\neditor = [\"consume\"]\n"
)]
#[tokio::test]
async fn test_duplicate_role_in_document_is_malformed(#[case] file_name: &str, #[case] content: &str) {
    let dir = TempDir::new().unwrap();
    let console_path = dir.path().join(file_name);
    fs::write(&console_path, content).unwrap();

    let console = FileStore::open(Side::Console, &console_path).unwrap();
    let pulsar = FileStore::open(Side::Pulsar, dir.path().join("pulsar.json")).unwrap();
    let engine = engine(&console, &pulsar);
    let scope = Scope::new("public", "default").unwrap();

    let err = engine.get_diff(&scope).await.unwrap_err();
    assert!(
        matches!(err, Error::MalformedPermission { side: Side::Console, .. }),
        "got {err:?}"
    );
    assert!(!err.is_retryable());

    let err = engine
        .apply_sync(&scope, SyncDirection::ConsoleToPulsar, SyncOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MalformedPermission { .. }));
    assert!(!dir.path().join("pulsar.json").exists());
}

//! Permission builders and seeded in-memory store pairs

use std::sync::Arc;

use rbac_model::{ActionSet, NormalizeOptions, PermissionSet, RawPermissions, Scope, Side};
use rbac_store::MemoryStore;

/// The `public/default` scope used throughout the test suites
pub fn scope() -> Scope {
    Scope::new("public", "default").expect("fixture scope is valid")
}

pub fn actions(tags: &[&str]) -> ActionSet {
    tags.iter().copied().collect()
}

/// Raw permissions from `(role, actions)` pairs, kept in the given order
pub fn raw(entries: &[(&str, &[&str])]) -> RawPermissions {
    entries
        .iter()
        .fold(RawPermissions::new(), |acc, (role, tags)| acc.with(*role, tags.iter().copied()))
}

/// Normalized permission set on [`scope`]
pub fn permission_set(entries: &[(&str, &[&str])]) -> PermissionSet {
    PermissionSet::normalize(scope(), &raw(entries), NormalizeOptions::default())
        .expect("fixture permissions are well formed")
}

/// Console and broker memory stores seeded on [`scope`]
pub fn seeded_stores(
    console: &[(&str, &[&str])],
    pulsar: &[(&str, &[&str])],
) -> (Arc<MemoryStore>, Arc<MemoryStore>) {
    let console_store = Arc::new(MemoryStore::new(Side::Console));
    let pulsar_store = Arc::new(MemoryStore::new(Side::Pulsar));
    console_store
        .seed(&scope(), &raw(console))
        .expect("seeding console store");
    pulsar_store
        .seed(&scope(), &raw(pulsar))
        .expect("seeding pulsar store");
    (console_store, pulsar_store)
}

/// Console `{editor: [produce, consume]}`, broker `{editor: [produce], legacy: [consume]}`
pub fn scenario_stores() -> (Arc<MemoryStore>, Arc<MemoryStore>) {
    seeded_stores(
        &[("editor", &["produce", "consume"])],
        &[("editor", &["produce"]), ("legacy", &["consume"])],
    )
}

//! Permission store persisted in a single TOML, JSON or YAML document
//!
//! The document maps `"tenant/namespace"` keys to a table of role → actions:
//!
//! ```toml
//! ["public/default"]
//! editor = ["produce", "consume"]
//! legacy = ["consume"]
//! ```
//!
//! Writes hold an exclusive advisory lock on a sidecar `.lock` file for the
//! whole read-modify-write and replace the document with an atomic rename.
//!
//! Role tables are read in document order, so a role listed twice under one
//! scope reaches normalization as two entries instead of silently keeping the
//! last one.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use fs2::FileExt;
use rbac_model::{ActionSet, RawPermissions, Scope, Side};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result, StoreAdapter};

type Document = BTreeMap<String, RoleTable>;

/// One scope's role → actions table, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RoleTable(Vec<(String, Vec<String>)>);

impl RoleTable {
    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replace every entry for `role` with a single one
    fn set(&mut self, role: &str, actions: Vec<String>) {
        self.remove(role);
        self.0.push((role.to_string(), actions));
        self.0.sort_by(|a, b| a.0.cmp(&b.0));
    }

    fn remove(&mut self, role: &str) {
        self.0.retain(|(r, _)| r != role);
    }

    fn to_raw(&self) -> RawPermissions {
        let mut raw = RawPermissions::new();
        for (role, actions) in &self.0 {
            raw.push(role.clone(), actions.iter().cloned());
        }
        raw
    }
}

impl Serialize for RoleTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(role, actions)| (role, actions)))
    }
}

impl<'de> Deserialize<'de> for RoleTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RoleTableVisitor;

        impl<'de> Visitor<'de> for RoleTableVisitor {
            type Value = RoleTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table of role names to action lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<RoleTable, A::Error> {
                let mut entries = Vec::new();
                while let Some(entry) = map.next_entry::<String, Vec<String>>()? {
                    entries.push(entry);
                }
                Ok(RoleTable(entries))
            }
        }

        deserializer.deserialize_map(RoleTableVisitor)
    }
}

/// Raised when the awaiting caller drops a write future, e.g. on timeout.
///
/// The blocking task checks it right before the rename, so an abandoned
/// write does not land after its caller already reported it as failed.
#[derive(Debug, Clone, Default)]
struct Abandoned(Arc<AtomicBool>);

impl Abandoned {
    fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Sets the flag when dropped; lives in the caller's future
struct AbandonOnDrop(Abandoned);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        (self.0).0.store(true, Ordering::Release);
    }
}

/// Serialization format of a permissions document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Toml,
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(Error::UnsupportedFormat { extension }),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        }
    }

    fn parse(self, path: &Path, content: &str) -> Result<Document> {
        let parsed = match self {
            Self::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| Error::DocumentParse {
            path: path.to_path_buf(),
            format: self.name().into(),
            message,
        })
    }

    fn render(self, path: &Path, document: &Document) -> Result<String> {
        let rendered = match self {
            Self::Toml => toml::to_string_pretty(document).map_err(|e| e.to_string()),
            Self::Json => serde_json::to_string_pretty(document).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::to_string(document).map_err(|e| e.to_string()),
        };
        rendered.map_err(|message| Error::DocumentSerialize {
            path: path.to_path_buf(),
            format: self.name().into(),
            message,
        })
    }
}

/// File-backed permission store for one side
///
/// A write whose caller stops waiting (a timeout around `grant`/`revoke`)
/// is discarded before the document is replaced. The rename itself cannot
/// be interrupted, so a write racing its deadline by less than one rename
/// may still land.
#[derive(Debug, Clone)]
pub struct FileStore {
    side: Side,
    path: PathBuf,
    format: DocumentFormat,
}

impl FileStore {
    /// Open a store at `path`. The file need not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] if the extension is not one of
    /// `toml`, `json`, `yaml` or `yml`.
    pub fn open(side: Side, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = DocumentFormat::from_path(&path)?;
        Ok(Self { side, path, format })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn load_document(&self) -> Result<Document> {
        if !self.path.exists() {
            return Ok(Document::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| Error::io(&self.path, e))?;
        if content.trim().is_empty() {
            return Ok(Document::new());
        }
        self.format.parse(&self.path, &content)
    }

    fn save_document(&self, document: &Document, abandoned: &Abandoned) -> Result<()> {
        let content = self.format.render(&self.path, document)?;
        write_replace(&self.path, content.as_bytes(), abandoned)
    }

    fn lock(&self) -> Result<File> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| Error::io(&lock_path, e))?;
        file.lock_exclusive()
            .map_err(|_| Error::LockFailed { path: lock_path })?;
        Ok(file)
    }

    /// Read-modify-write one scope's table under the store lock
    fn modify_scope<F>(&self, scope: &Scope, abandoned: &Abandoned, edit: F) -> Result<()>
    where
        F: FnOnce(&mut RoleTable),
    {
        let lock = self.lock()?;
        let mut document = self.load_document()?;
        let key = scope.key();

        let mut table = document.remove(&key).unwrap_or_default();
        edit(&mut table);
        if !table.is_empty() {
            document.insert(key, table);
        }

        let saved = self.save_document(&document, abandoned);
        // Unlock errors are not actionable once the rename is done
        let _ = FileExt::unlock(&lock);
        saved
    }

    fn fetch_blocking(&self, scope: &Scope) -> Result<RawPermissions> {
        let document = self.load_document()?;
        Ok(document
            .get(&scope.key())
            .map(RoleTable::to_raw)
            .unwrap_or_default())
    }

    fn grant_blocking(
        &self,
        scope: &Scope,
        role: &str,
        actions: &ActionSet,
        abandoned: &Abandoned,
    ) -> Result<()> {
        self.modify_scope(scope, abandoned, |table| {
            if actions.is_empty() {
                table.remove(role);
            } else {
                table.set(role, actions.to_strings());
            }
        })
    }

    fn revoke_blocking(&self, scope: &Scope, role: &str, abandoned: &Abandoned) -> Result<()> {
        self.modify_scope(scope, abandoned, |table| table.remove(role))
    }
}

/// Write `content` to a temp file next to `path`, fsync, then rename over it.
fn write_replace(path: &Path, content: &[u8], abandoned: &Abandoned) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;
    drop(temp_file);

    if abandoned.is_set() {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::Abandoned {
            path: path.to_path_buf(),
        });
    }

    fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))?;
    Ok(())
}

#[async_trait]
impl StoreAdapter for FileStore {
    fn side(&self) -> Side {
        self.side
    }

    async fn fetch(&self, scope: &Scope) -> Result<RawPermissions> {
        let store = self.clone();
        let scope = scope.clone();
        tokio::task::spawn_blocking(move || store.fetch_blocking(&scope))
            .await
            .map_err(|e| Error::unavailable(self.side, e))?
            .map_err(|e| match e {
                Error::Unavailable { .. } | Error::DocumentParse { .. } => e,
                other => Error::unavailable(self.side, other),
            })
    }

    async fn grant(&self, scope: &Scope, role: &str, actions: &ActionSet) -> Result<()> {
        let store = self.clone();
        let scope = scope.clone();
        let owned_role = role.to_string();
        let actions = actions.clone();
        let abandoned = Abandoned::default();
        let _guard = AbandonOnDrop(abandoned.clone());
        tokio::task::spawn_blocking(move || {
            store.grant_blocking(&scope, &owned_role, &actions, &abandoned)
        })
        .await
            .map_err(|e| Error::write(self.side, role, e))?
            .map_err(|e| Error::write(self.side, role, e))
    }

    async fn revoke(&self, scope: &Scope, role: &str) -> Result<()> {
        let store = self.clone();
        let scope = scope.clone();
        let owned_role = role.to_string();
        let abandoned = Abandoned::default();
        let _guard = AbandonOnDrop(abandoned.clone());
        tokio::task::spawn_blocking(move || store.revoke_blocking(&scope, &owned_role, &abandoned))
            .await
            .map_err(|e| Error::write(self.side, role, e))?
            .map_err(|e| Error::write(self.side, role, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.toml")).unwrap(), DocumentFormat::Toml);
        assert_eq!(DocumentFormat::from_path(Path::new("a.YML")).unwrap(), DocumentFormat::Yaml);
        assert!(matches!(
            DocumentFormat::from_path(Path::new("a.ini")),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_abandoned_write_leaves_document_untouched() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("pulsar.json");
        fs::write(&path, "{}").unwrap();

        let abandoned = Abandoned::default();
        drop(AbandonOnDrop(abandoned.clone()));
        let err = write_replace(&path, b"{\"changed\": {}}", &abandoned).unwrap_err();

        assert!(matches!(err, Error::Abandoned { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_role_table_keeps_duplicates_in_order() {
        let table: RoleTable =
            serde_json::from_str(r#"{"editor": ["produce"], "editor": ["consume"]}"#).unwrap();
        let raw = table.to_raw();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.entries()[1].actions, vec!["consume"]);
    }

    #[test]
    fn test_role_table_set_collapses_duplicates() {
        let mut table = RoleTable(vec![
            ("editor".into(), vec!["produce".into()]),
            ("editor".into(), vec!["consume".into()]),
        ]);
        table.set("editor", vec!["sinks".into()]);
        assert_eq!(table, RoleTable(vec![("editor".into(), vec!["sinks".into()])]));
    }

    #[test]
    fn test_lock_path_is_sidecar() {
        let store = FileStore::open(Side::Console, "/tmp/perm/console.json").unwrap();
        assert_eq!(store.lock_path(), PathBuf::from("/tmp/perm/console.json.lock"));
    }
}

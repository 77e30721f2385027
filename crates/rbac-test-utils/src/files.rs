//! [`TestFiles`]: file-backed console and broker stores in a temp directory

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Console document for the reference scenario
pub const SCENARIO_CONSOLE: &str = r#"["public/default"]
editor = ["produce", "consume"]
"#;

/// Broker document for the reference scenario
pub const SCENARIO_PULSAR: &str = r#"["public/default"]
editor = ["produce"]
legacy = ["consume"]
"#;

/// A temp directory holding `console.toml`, `pulsar.toml` and a
/// `rbac-sync.toml` config pointing at both.
///
/// ```rust,no_run
/// use rbac_test_utils::TestFiles;
///
/// let files = TestFiles::scenario("sync_to_pulsar");
/// assert!(files.config_path().exists());
/// ```
pub struct TestFiles {
    temp_dir: TempDir,
}

impl Default for TestFiles {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFiles {
    /// Empty directory, no files written yet
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("TestFiles::new: failed to create temp dir"),
        }
    }

    /// Reference scenario documents plus a config in `mode`
    pub fn scenario(mode: &str) -> Self {
        let files = Self::new();
        files.write_console(SCENARIO_CONSOLE);
        files.write_pulsar(SCENARIO_PULSAR);
        files.write_config(mode, "");
        files
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn console_path(&self) -> PathBuf {
        self.root().join("console.toml")
    }

    pub fn pulsar_path(&self) -> PathBuf {
        self.root().join("pulsar.toml")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root().join("rbac-sync.toml")
    }

    pub fn write_console(&self, content: &str) {
        fs::write(self.console_path(), content).expect("failed to write console document");
    }

    pub fn write_pulsar(&self, content: &str) {
        fs::write(self.pulsar_path(), content).expect("failed to write pulsar document");
    }

    /// Write the config with the given sync mode; `extra` is appended verbatim
    pub fn write_config(&self, mode: &str, extra: &str) {
        let content = format!(
            "[sync]\nmode = \"{mode}\"\n\n[stores.console]\npath = '{}'\n\n[stores.pulsar]\npath = '{}'\n\n{extra}",
            self.console_path().display(),
            self.pulsar_path().display(),
        );
        fs::write(self.config_path(), content).expect("failed to write config");
    }

    pub fn read_pulsar(&self) -> String {
        fs::read_to_string(self.pulsar_path()).expect("failed to read pulsar document")
    }

    pub fn read_console(&self) -> String {
        fs::read_to_string(self.console_path()).expect("failed to read console document")
    }
}

// config.rs — Executor configuration.
//
// ExecutorConfig determines where an executor keeps its state. The
// `for_project()` constructor lays everything out under `.fie/` in the
// project root. Operator preferences live in `.fie/config.toml`
// (FileConfig); a missing file means defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::EstateError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    pub project_root: PathBuf,

    /// Directory for EstateStore (one JSON file per principal).
    pub estates_dir: PathBuf,

    /// Path to the hash-chained audit log.
    pub audit_log: PathBuf,

    /// Path to the event notification log.
    pub events_log: PathBuf,

    pub config_file: PathBuf,
}

impl ExecutorConfig {
    /// Standard `.fie/` layout for a project.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().to_path_buf();
        let fie_dir = root.join(".fie");
        Self {
            project_root: root,
            estates_dir: fie_dir.join("estates"),
            audit_log: fie_dir.join("audit.jsonl"),
            events_log: fie_dir.join("events.jsonl"),
            config_file: fie_dir.join("config.toml"),
        }
    }
}

/// Contents of `.fie/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cli: CliConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive. `RUST_LOG` wins if set.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit one JSON object per log line instead of plain text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Identity used when `--as` is not given.
    pub default_caller: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, EstateError> {
        let content = fs::read_to_string(path).map_err(|source| EstateError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| EstateError::InvalidConfig {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Load the file, falling back to defaults if it is missing. A file that
    /// exists but does not parse is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self, EstateError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn for_project_uses_fie_dir() {
        let config = ExecutorConfig::for_project("/tmp/estate-project");
        assert_eq!(config.estates_dir, PathBuf::from("/tmp/estate-project/.fie/estates"));
        assert_eq!(config.audit_log, PathBuf::from("/tmp/estate-project/.fie/audit.jsonl"));
        assert_eq!(config.events_log, PathBuf::from("/tmp/estate-project/.fie/events.jsonl"));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = FileConfig::load_or_default(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.logging.filter, "info");
        assert!(config.cli.default_caller.is_none());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cli]\ndefault_caller = \"alice\"\n").unwrap();
        let config = FileConfig::load_or_default(&path).unwrap();
        assert_eq!(config.cli.default_caller.as_deref(), Some("alice"));
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[logging\nfilter = 3").unwrap();
        assert!(matches!(
            FileConfig::load_or_default(&path),
            Err(EstateError::InvalidConfig { .. })
        ));
    }
}

//! # Configuration
//!
//! Settings for the server and CLI, resolved in this order (later wins):
//! 1. Built-in defaults
//! 2. TOML file (`--config`)
//! 3. Environment (`COURSETRACK_COMPLETION_ENABLED`)
//! 4. Command-line flags
//!
//! ```toml
//! completion_tracking_enabled = true
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [storage]
//! database = "coursetrack.db"
//! backend = "redb"
//! ```

use clap::ValueEnum;
use coursetrack_core::{FeatureFlags, TrackerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment override for the completion-tracking switch.
pub const COMPLETION_ENABLED_ENV: &str = "COURSETRACK_COMPLETION_ENABLED";

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// MODEL
// =============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Host switch for completion tracking. When off, dashboards show the
    /// settings notice instead of counts.
    #[serde(default = "default_enabled")]
    pub completion_tracking_enabled: bool,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database")]
    pub database: PathBuf,

    #[serde(default)]
    pub backend: Backend,
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// ACID redb database
    #[default]
    Redb,
    /// Binary snapshot file loaded into memory
    File,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redb => write!(f, "redb"),
            Self::File => write!(f, "file"),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database() -> PathBuf {
    PathBuf::from("coursetrack.db")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            backend: Backend::default(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            completion_tracking_enabled: default_enabled(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl TrackerConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, TrackerError> {
        toml::from_str(text).map_err(|e| TrackerError::Serialization(format!("Config: {}", e)))
    }

    /// Read a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, TrackerError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            TrackerError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(TrackerError::Io(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            TrackerError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Defaults, then the file if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, TrackerError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_value(std::env::var(COMPLETION_ENABLED_ENV).ok().as_deref());
        Ok(config)
    }

    /// Apply the value of `COURSETRACK_COMPLETION_ENABLED`, if any.
    ///
    /// Accepts `1/0`, `true/false`, `yes/no`, `on/off`; anything else is
    /// ignored with a warning.
    pub fn apply_env_value(&mut self, value: Option<&str>) {
        let Some(raw) = value else {
            return;
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => self.completion_tracking_enabled = true,
            "0" | "false" | "no" | "off" => self.completion_tracking_enabled = false,
            other => {
                tracing::warn!(
                    "Ignoring {}='{}': expected true or false",
                    COMPLETION_ENABLED_ENV,
                    other
                );
            }
        }
    }

    /// Feature flags handed to each dashboard.
    #[must_use]
    pub fn flags(&self) -> FeatureFlags {
        FeatureFlags {
            completion_tracking_enabled: self.completion_tracking_enabled,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = TrackerConfig::from_toml_str("").expect("parse");
        assert_eq!(config, TrackerConfig::default());
        assert!(config.flags().completion_tracking_enabled);
    }

    #[test]
    fn full_document_parses() {
        let config = TrackerConfig::from_toml_str(
            r#"
            completion_tracking_enabled = false

            [server]
            host = "0.0.0.0"
            port = 9000

            [storage]
            database = "/var/lib/coursetrack/data.db"
            backend = "file"
            "#,
        )
        .expect("parse");

        assert!(!config.completion_tracking_enabled);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.backend, Backend::File);
        assert_eq!(
            config.storage.database,
            PathBuf::from("/var/lib/coursetrack/data.db")
        );
    }

    #[test]
    fn unknown_backend_rejected() {
        let err = TrackerConfig::from_toml_str("[storage]\nbackend = \"sqlite\"")
            .expect_err("bad backend");
        assert!(matches!(err, TrackerError::Serialization(_)));
    }

    #[test]
    fn env_value_overrides_flag() {
        let mut config = TrackerConfig::default();
        config.apply_env_value(Some("off"));
        assert!(!config.completion_tracking_enabled);
        config.apply_env_value(Some("TRUE"));
        assert!(config.completion_tracking_enabled);
        config.apply_env_value(Some("maybe"));
        assert!(config.completion_tracking_enabled);
        config.apply_env_value(None);
        assert!(config.completion_tracking_enabled);
    }

    #[test]
    fn file_roundtrip() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("coursetrack.toml");
        std::fs::write(&path, "[server]\nport = 7070\n").expect("write");

        let config = TrackerConfig::from_file(&path).expect("load");
        assert_eq!(config.server.port, 7070);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = TrackerConfig::from_file(Path::new("/nonexistent/coursetrack.toml"))
            .expect_err("missing");
        assert!(matches!(err, TrackerError::Io(_)));
    }
}

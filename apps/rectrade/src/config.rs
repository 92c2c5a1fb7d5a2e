//! # Application Configuration
//!
//! Optional TOML file with storage and ledger policy settings:
//!
//! ```toml
//! [storage]
//! backend = "redb"      # or "memory"
//! path = "rectrade.db"
//!
//! [ledger]
//! require_execution_before_confirm = false
//! enforce_supplier_match = true
//! ```
//!
//! Every section and key is optional. CLI flags override the file.

use clap::ValueEnum;
use rectrade_core::{LedgerConfig, RecError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// File read when `--config` is not given, if present.
pub const DEFAULT_CONFIG_FILE: &str = "rectrade.toml";

/// Default ledger database path.
pub const DEFAULT_DATABASE: &str = "rectrade.db";

/// Maximum config file size (64 KB).
const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

/// Storage backend kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Disk-backed redb database.
    #[default]
    Redb,
    /// Volatile in-memory map, discarded at exit.
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redb => f.write_str("redb"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: BackendKind,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            path: PathBuf::from(DEFAULT_DATABASE),
        }
    }
}

/// Whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub ledger: LedgerConfig,
}

impl AppConfig {
    /// Parse TOML text.
    pub fn parse(content: &str) -> Result<Self, RecError> {
        toml::from_str(content)
            .map_err(|e| RecError::InvalidInput(format!("invalid configuration: {}", e)))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RecError> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| {
            RecError::Storage(format!("cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(RecError::InvalidInput(format!(
                "config file {} bytes exceeds maximum {}",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            RecError::Storage(format!("cannot read config '{}': {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Resolve the effective configuration.
    ///
    /// An explicit path must exist; otherwise `rectrade.toml` is used when
    /// present, and the defaults when not.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, RecError> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                tracing::debug!(path = DEFAULT_CONFIG_FILE, "loading default config file");
                Self::load(DEFAULT_CONFIG_FILE)
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply CLI overrides.
    #[must_use]
    pub fn with_overrides(
        mut self,
        database: Option<PathBuf>,
        backend: Option<BackendKind>,
    ) -> Self {
        if let Some(path) = database {
            self.storage.path = path;
        }
        if let Some(kind) = backend {
            self.storage.backend = kind;
        }
        self
    }
}

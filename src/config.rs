//! Kernel configuration
//!
//! Memory geometry and the audit log location. Loaded from JSON; every
//! field is optional in the file and falls back to the defaults below.

use crate::kernel::memory::{DEFAULT_PAGE_SIZE_MB, DEFAULT_TOTAL_MEMORY_MB};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default audit log location
pub const DEFAULT_LOG_FILE: &str = "logs/system.log";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Kernel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Size of the simulated memory
    pub total_memory_mb: u32,

    /// Page size; memory is split into `total_memory_mb / page_size_mb` pages
    pub page_size_mb: u32,

    /// Audit log file (None disables the file sink)
    pub log_file: Option<PathBuf>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            total_memory_mb: DEFAULT_TOTAL_MEMORY_MB,
            page_size_mb: DEFAULT_PAGE_SIZE_MB,
            log_file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
        }
    }
}

impl KernelConfig {
    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: KernelConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size_mb == 0 {
            return Err(ConfigError::Invalid("page_size_mb must be positive".into()));
        }
        if self.total_memory_mb == 0 {
            return Err(ConfigError::Invalid("total_memory_mb must be positive".into()));
        }
        if self.page_size_mb > self.total_memory_mb {
            return Err(ConfigError::Invalid(format!(
                "page_size_mb ({}) exceeds total_memory_mb ({})",
                self.page_size_mb, self.total_memory_mb
            )));
        }
        Ok(())
    }

    /// Number of pages this configuration yields
    pub fn page_count(&self) -> u32 {
        self.total_memory_mb / self.page_size_mb.max(1)
    }
}

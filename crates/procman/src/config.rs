//! Manager settings and process registration files
//!
//! A registration file is YAML:
//!
//! ```yaml
//! version: "1"
//! settings:
//!   stop_timeout_ms: 5000
//! processes:
//!   node-1:
//!     executable: /usr/local/bin/node
//!     args: ["--http-port", "9650"]
//!     stdout_log: /tmp/node-1.log
//! ```

use crate::manager::ProcessManager;
use crate::metadata::ProcessMetadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// The registration file format version this crate understands
pub const SUPPORTED_VERSION: &str = "1";

const DEFAULT_STOP_TIMEOUT_MS: u64 = 10_000;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Settings for the lifecycle controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Milliseconds to wait for a graceful stop before killing; `None` waits forever
    pub stop_timeout_ms: Option<u64>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            stop_timeout_ms: Some(DEFAULT_STOP_TIMEOUT_MS),
        }
    }
}

impl ManagerConfig {
    /// Graceful stop timeout
    pub fn stop_timeout(&self) -> Option<Duration> {
        self.stop_timeout_ms.map(Duration::from_millis)
    }

    /// Set the graceful stop timeout, truncated to whole milliseconds
    pub fn with_stop_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stop_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }
}

/// Root of a registration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessFile {
    /// Format version
    pub version: String,

    /// Controller settings
    #[serde(default)]
    pub settings: ManagerConfig,

    /// Processes to register, by name
    #[serde(default)]
    pub processes: BTreeMap<String, ProcessMetadata>,
}

impl ProcessFile {
    /// Check the file for problems serde cannot catch
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != SUPPORTED_VERSION {
            return Err(ConfigError::ValidationError(format!(
                "Unsupported version '{}', expected '{}'",
                self.version, SUPPORTED_VERSION
            )));
        }

        for (name, metadata) in &self.processes {
            if name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "Process names must not be empty".to_string(),
                ));
            }
            if metadata.executable.as_os_str().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "Process '{}' has no executable",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Register every process with `manager`, stopping at the first duplicate
    pub async fn register_all(&self, manager: &ProcessManager) -> crate::Result<()> {
        for (name, metadata) in &self.processes {
            manager.register(name.clone(), metadata.clone()).await?;
        }
        Ok(())
    }
}

/// Parse and validate a registration file from a string
pub fn parse_str(content: &str) -> Result<ProcessFile, ConfigError> {
    let file: ProcessFile = serde_yaml::from_str(content)?;
    file.validate()?;
    Ok(file)
}

/// Read, parse and validate a registration file
pub fn load_file(path: impl AsRef<Path>) -> Result<ProcessFile, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_str(&content)
}

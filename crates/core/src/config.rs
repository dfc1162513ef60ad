//! Configuration system for binding generation and deployment

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::types::Lang;

/// Main configuration for abibind
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AbibindConfig {
    /// Binding generation settings
    pub bind: BindConfig,
    /// Deployment settings
    pub deploy: DeployConfig,
}

/// Settings for generating bindings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BindConfig {
    /// Package (Go) or module (Rust) name of the generated file
    pub package: String,
    /// Target language
    pub lang: Lang,
    /// Explicit renames applied to ABI member names before normalization
    pub aliases: BTreeMap<String, String>,
    /// Output file; stdout when absent
    pub output: Option<PathBuf>,
    /// Fully qualified names of libraries that bytecode may link against
    pub libraries: Vec<String>,
}

/// Settings for deploying linked contracts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// JSON-RPC endpoint
    pub rpc_url: String,
    /// How often to poll for receipts (in milliseconds)
    pub poll_interval_ms: u64,
    /// Already deployed contracts, keyed by link pattern
    pub overrides: BTreeMap<String, String>,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            package: "bindings".to_string(),
            lang: Lang::default(),
            aliases: BTreeMap::new(),
            output: None,
            libraries: Vec::new(),
        }
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            poll_interval_ms: 1000,
            overrides: BTreeMap::new(),
        }
    }
}

impl AbibindConfig {
    /// Parse a configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AbibindConfig =
            toml::from_str(content).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading configuration");
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind.validate()?;
        self.deploy.validate()
    }
}

impl BindConfig {
    /// Validate the binding settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_identifier(&self.package) {
            return Err(ConfigError::InvalidPackage(self.package.clone()));
        }

        for (from, to) in &self.aliases {
            if from.is_empty() || !is_identifier(to) {
                return Err(ConfigError::InvalidAlias {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }

        if let Some(empty) = self.libraries.iter().find(|name| name.trim().is_empty()) {
            return Err(ConfigError::InvalidLibrary(empty.clone()));
        }

        Ok(())
    }
}

impl DeployConfig {
    /// Validate the deployment settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        const SCHEMES: [&str; 4] = ["http://", "https://", "ws://", "wss://"];
        if !SCHEMES.iter().any(|scheme| self.rpc_url.starts_with(scheme)) {
            return Err(ConfigError::InvalidRpcUrl(self.rpc_url.clone()));
        }

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }

        for (pattern, address) in &self.overrides {
            if !is_address(address) {
                return Err(ConfigError::InvalidOverride {
                    pattern: pattern.clone(),
                    address: address.clone(),
                });
            }
        }

        Ok(())
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_address(s: &str) -> bool {
    let hex = s.strip_prefix("0x").unwrap_or(s);
    hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {reason}")]
    Unreadable { path: String, reason: String },
    #[error("Malformed config: {0}")]
    Malformed(String),
    #[error("Invalid package name '{0}'")]
    InvalidPackage(String),
    #[error("Invalid alias '{from}' -> '{to}'")]
    InvalidAlias { from: String, to: String },
    #[error("Invalid library name '{0}'")]
    InvalidLibrary(String),
    #[error("Invalid RPC URL '{0}'")]
    InvalidRpcUrl(String),
    #[error("Invalid poll interval: must be greater than 0")]
    InvalidPollInterval,
    #[error("Invalid override address for '{pattern}': '{address}'")]
    InvalidOverride { pattern: String, address: String },
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::Config(err.to_string())
    }
}

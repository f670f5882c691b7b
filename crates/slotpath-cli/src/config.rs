//! Configuration file and environment handling
//!
//! Values are layered: `slotpath.toml` (or `--config`), then `SLOTPATH_*`
//! environment variables (a `.env` file is loaded first), then command-line
//! flags.

use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "slotpath.toml";

pub const ENV_RPC_URL: &str = "SLOTPATH_RPC_URL";
pub const ENV_CONTRACT: &str = "SLOTPATH_CONTRACT";
pub const ENV_BLOCK: &str = "SLOTPATH_BLOCK";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// JSON-RPC endpoint used by `read`
    pub rpc_url: Option<String>,
    /// Deployed contract address used by `read`
    pub contract: Option<String>,
    /// Block number or tag used by `read`
    pub block: Option<String>,
    /// Default output format for resolve commands
    pub format: Option<OutputFormat>,
}

impl Config {
    /// Load from an explicit file, or from `slotpath.toml` in the working
    /// directory if one exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `SLOTPATH_*` variables from the process environment
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any variable lookup
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_RPC_URL) {
            self.rpc_url = Some(url);
        }
        if let Some(contract) = lookup(ENV_CONTRACT) {
            self.contract = Some(contract);
        }
        if let Some(block) = lookup(ENV_BLOCK) {
            self.block = Some(block);
        }
        self
    }

    pub fn output_format(&self, flag: Option<OutputFormat>) -> OutputFormat {
        flag.or(self.format).unwrap_or_default()
    }
}

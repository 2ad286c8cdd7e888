//! Configuration loading and schema.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration, loaded from `config.toml` in the workspace dir.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub registry: RegistryConfig,
    pub delivery: DeliveryConfig,
    pub gateway: GatewayConfig,

    /// Directory holding config and registry state. Not serialized; derived
    /// from `--config-dir` or the default location at load time.
    #[serde(skip)]
    pub workspace_dir: PathBuf,
}

/// Which registry backend to use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// "sqlite" (persistent, default) or "memory" (volatile).
    pub backend: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
        }
    }
}

/// Timeouts for the outbound delivery client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Bind address for the invocation gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8089,
        }
    }
}

impl Config {
    /// Default workspace directory: `~/.echorelay`.
    pub fn default_workspace_dir() -> PathBuf {
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".echorelay"))
            .unwrap_or_else(|| PathBuf::from(".echorelay"))
    }

    /// Load config from `<dir>/config.toml`, falling back to defaults when
    /// the file does not exist.
    pub fn load(config_dir: Option<&str>) -> Result<Self> {
        let workspace_dir = match config_dir {
            Some(dir) => PathBuf::from(dir),
            None => Self::default_workspace_dir(),
        };
        Self::load_from(&workspace_dir)
    }

    pub fn load_from(workspace_dir: &Path) -> Result<Self> {
        let path = workspace_dir.join("config.toml");
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("invalid TOML in {}", path.display()))?
        } else {
            Config::default()
        };
        config.workspace_dir = workspace_dir.to_path_buf();
        Ok(config)
    }

    /// Write the current config to `<workspace>/config.toml`.
    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.workspace_dir).with_context(|| {
            format!(
                "failed to create workspace dir {}",
                self.workspace_dir.display()
            )
        })?;
        let path = self.workspace_dir.join("config.toml");
        let raw = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(&path, raw).with_context(|| format!("failed to write {}", path.display()))
    }
}

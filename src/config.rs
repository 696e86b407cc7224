//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.pullwatch.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Registry settings.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Destination directory for CSV series files.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Destination directory for rendered chart pages.
    #[serde(default = "default_render_dir")]
    pub render_dir: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Number of concurrent pull-count fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            render_dir: default_render_dir(),
            verbose: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_render_dir() -> String {
    "./render".to_string()
}

fn default_concurrency() -> usize {
    4
}

/// Registry API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the repositories API.
    #[serde(default = "default_url_base")]
    pub url_base: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url_base: default_url_base(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_url_base() -> String {
    crate::registry::DEFAULT_URL_BASE.to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output path of the index page.
    #[serde(default = "default_index_file")]
    pub index_file: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            index_file: default_index_file(),
        }
    }
}

fn default_index_file() -> String {
    "index.html".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".pullwatch.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data_dir) = args.data_dir {
            self.general.data_dir = data_dir.display().to_string();
        }
        if let Some(ref render_dir) = args.render_dir {
            self.general.render_dir = render_dir.display().to_string();
        }
        if let Some(ref index) = args.index {
            self.report.index_file = index.display().to_string();
        }

        if let Some(ref url_base) = args.registry_url {
            self.registry.url_base = url_base.clone();
        }
        if let Some(timeout) = args.timeout {
            self.registry.timeout_seconds = timeout;
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

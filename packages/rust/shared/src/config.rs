//! Application configuration for rstindex.
//!
//! User config lives at `~/.rstindex/rstindex.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RstIndexError};
use crate::types::{AutodocFlags, IndexFile};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "rstindex.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".rstindex";

// ---------------------------------------------------------------------------
// Config structs (matching rstindex.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Options applied to every `automodule` directive.
    #[serde(default)]
    pub automodule: AutodocFlags,

    /// Package scanning policy.
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default output directory for generated pages.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// `:maxdepth:` of the root `modules.rst` toctree.
    #[serde(default = "default_toc_maxdepth")]
    pub toc_maxdepth: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            toc_maxdepth: default_toc_maxdepth(),
        }
    }
}

fn default_output_dir() -> String {
    "docs/api".into()
}
fn default_toc_maxdepth() -> u32 {
    4
}

/// `[discovery]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Include modules and packages whose name starts with `_`.
    #[serde(default)]
    pub include_private: bool,

    /// Regex patterns matched against dotted names; matches are skipped.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

// ---------------------------------------------------------------------------
// Build options (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime build configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Directory the pages are written into.
    pub output_dir: PathBuf,
    /// `:maxdepth:` of the root toctree.
    pub toc_maxdepth: u32,
    /// Directive options for packages without their own override.
    pub automodule: AutodocFlags,
    /// Remove pages from a previous build that are no longer produced.
    pub prune: bool,
    /// Tool version recorded in the manifest.
    pub tool_version: String,
}

impl From<&AppConfig> for BuildOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            output_dir: PathBuf::from(&config.defaults.output_dir),
            toc_maxdepth: config.defaults.toc_maxdepth,
            automodule: config.automodule,
            prune: false,
            tool_version: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.rstindex/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RstIndexError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.rstindex/rstindex.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RstIndexError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        RstIndexError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RstIndexError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RstIndexError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RstIndexError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject settings that would only fail later in the build.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.defaults.toc_maxdepth == 0 {
        return Err(RstIndexError::config("defaults.toc_maxdepth must be at least 1"));
    }

    for pattern in &config.discovery.exclude_patterns {
        Regex::new(pattern).map_err(|e| {
            RstIndexError::config(format!("invalid exclude pattern '{pattern}': {e}"))
        })?;
    }

    Ok(())
}

/// Load a hand-authored index file.
pub fn load_index_file(path: &Path) -> Result<IndexFile> {
    let content = std::fs::read_to_string(path).map_err(|e| RstIndexError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        RstIndexError::config(format!("failed to parse index {}: {e}", path.display()))
    })
}

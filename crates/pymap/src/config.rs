//! Configuration for pymap.
//!
//! Loads settings from `.pymap.toml` in the scan root.
//! Uses figment for layered configuration with provenance tracking:
//! defaults, then the TOML file, then `PYMAP_`-prefixed environment
//! variables.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default directories to exclude from scanning.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    "__pycache__",
    ".git",
    ".venv",
    "venv",
    ".mypy_cache",
    ".pytest_cache",
    "node_modules",
    ".idea",
    "dist",
    "build",
];

/// Pymap configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Additional directories to exclude from scanning (merged with defaults).
    #[serde(default)]
    pub exclude_dirs: Vec<String>,

    /// Maximum recursion depth for tree walks (default: 500).
    #[serde(default = "default_recursion_depth")]
    pub max_recursion_depth: usize,

    /// Whether to respect .gitignore files when scanning (default: true).
    #[serde(default = "default_respect_gitignore")]
    pub respect_gitignore: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude_dirs: Vec::new(),
            max_recursion_depth: default_recursion_depth(),
            respect_gitignore: default_respect_gitignore(),
        }
    }
}

fn default_recursion_depth() -> usize {
    500
}

fn default_respect_gitignore() -> bool {
    true
}

impl Config {
    /// Load configuration from `.pymap.toml` in the given root directory.
    ///
    /// Returns default config if the file doesn't exist.
    /// Reports parse errors with file, line, and key information, then falls
    /// back to defaults so a bad config never blocks a run.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(".pymap.toml");

        // Build layered config: defaults <- toml file <- env
        let figment = Figment::from(Serialized::defaults(Config::default()));

        // Only add TOML provider if file exists
        let figment = if config_path.exists() {
            figment.merge(Toml::file(&config_path))
        } else {
            figment
        };

        let figment = figment.merge(Env::prefixed("PYMAP_"));

        match figment.extract() {
            Ok(config) => {
                if config_path.exists() {
                    tracing::info!("Loaded config from {:?}", config_path);
                }
                config
            }
            Err(e) => {
                // Figment provides detailed error messages with provenance
                tracing::warn!("Config error: {}", e);
                Self::default()
            }
        }
    }

    /// Get all directories to exclude (defaults + user-configured).
    pub fn excluded_dirs(&self) -> Vec<&str> {
        let mut dirs: Vec<&str> = DEFAULT_EXCLUDE_DIRS.to_vec();
        for dir in &self.exclude_dirs {
            if !dirs.contains(&dir.as_str()) {
                dirs.push(dir.as_str());
            }
        }
        dirs
    }
}

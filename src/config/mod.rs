//! Global configuration for the scaffold CLI.
//!
//! A small optional TOML file (`~/.scaffold/config.toml`, overridable with
//! the `SCAFFOLD_CONFIG` environment variable) carrying machine-level
//! settings: an HTTP proxy and a cache directory override. A missing file
//! is simply the default configuration.
//!
//! The CLI reads this once at startup - together with the conventional
//! `HTTP_PROXY`/`http_proxy` variables as a proxy fallback - and passes the
//! resulting plain values down into the pipeline. Nothing below the CLI
//! layer consults the environment.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::ScaffoldError;

/// Contents of the global config file. All fields optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Proxy URL applied to every HTTP request
    pub proxy: Option<String>,
    /// Overrides the platform cache directory
    pub cache_dir: Option<PathBuf>,
}

impl GlobalConfig {
    /// The config file location: `SCAFFOLD_CONFIG` when set, otherwise
    /// `~/.scaffold/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("SCAFFOLD_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|home| home.join(".scaffold").join("config.toml"))
    }

    /// Load the config from its default location.
    ///
    /// A missing file yields the default config; an unreadable or
    /// malformed file is a [`ScaffoldError::ConfigError`] - silently
    /// ignoring a config the user wrote would be worse than failing.
    pub fn load() -> Result<Self, ScaffoldError> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load the config from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ScaffoldError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ScaffoldError::ConfigError {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let config: Self = toml::from_str(&contents).map_err(|e| ScaffoldError::ConfigError {
            message: format!("invalid config {}: {e}", path.display()),
        })?;
        debug!(path = %path.display(), "loaded global config");
        Ok(config)
    }

    /// Resolve the effective proxy: the config file wins, the conventional
    /// environment variables are the fallback.
    #[must_use]
    pub fn effective_proxy(&self) -> Option<String> {
        self.proxy.clone().or_else(|| {
            std::env::var("http_proxy")
                .or_else(|_| std::env::var("HTTP_PROXY"))
                .ok()
                .filter(|v| !v.is_empty())
        })
    }
}

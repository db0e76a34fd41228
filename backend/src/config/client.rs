//! Client settings file support.
//!
//! This module reads connection settings for the P2 service and the SIMBAD
//! catalog from an optional `p2gravity.toml`:
//!
//! ```toml
//! [p2]
//! environment = "demo"
//! username = "52052"
//! timeout_secs = 30
//!
//! [simbad]
//! url = "https://simbad.cds.unistra.fr/simbad/sim-tap/sync"
//! timeout_secs = 20
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigurationError;
use crate::p2::P2Environment;

/// Default SIMBAD TAP synchronous endpoint.
pub const SIMBAD_TAP_URL: &str = "https://simbad.cds.unistra.fr/simbad/sim-tap/sync";

/// Client settings from file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub p2: P2Settings,
    #[serde(default)]
    pub simbad: SimbadSettings,
}

/// P2 service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct P2Settings {
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default = "default_p2_timeout")]
    pub timeout_secs: u64,
}

/// Catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimbadSettings {
    #[serde(default = "default_simbad_url")]
    pub url: String,
    #[serde(default = "default_simbad_timeout")]
    pub timeout_secs: u64,
}

fn default_environment() -> String {
    "production".to_string()
}

fn default_p2_timeout() -> u64 {
    30
}

fn default_simbad_url() -> String {
    SIMBAD_TAP_URL.to_string()
}

fn default_simbad_timeout() -> u64 {
    20
}

impl Default for P2Settings {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            username: None,
            timeout_secs: default_p2_timeout(),
        }
    }
}

impl Default for SimbadSettings {
    fn default() -> Self {
        Self {
            url: default_simbad_url(),
            timeout_secs: default_simbad_timeout(),
        }
    }
}

impl ClientConfig {
    /// Load client settings from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the settings file
    ///
    /// # Returns
    /// * `Ok(ClientConfig)` if successful
    /// * `Err(ConfigurationError)` if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigurationError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| {
            ConfigurationError::Parse(format!("Failed to parse client settings: {}", e))
        })
    }

    /// Load client settings from the default location.
    ///
    /// Searches for `p2gravity.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    ///
    /// Falls back to built-in defaults when no file exists.
    pub fn from_default_location() -> Result<Self, ConfigurationError> {
        let search_paths = [
            PathBuf::from("p2gravity.toml"),
            PathBuf::from("backend/p2gravity.toml"),
            PathBuf::from("../p2gravity.toml"),
        ];

        for path in search_paths.iter() {
            if path.exists() {
                log::debug!("Loading client settings from {}", path.display());
                return Self::from_file(path);
            }
        }

        Ok(Self::default())
    }

    /// Selected P2 environment.
    ///
    /// `P2_ENVIRONMENT` takes precedence over the file.
    pub fn environment(&self) -> Result<P2Environment, ConfigurationError> {
        if let Some(env) = P2Environment::from_env() {
            return Ok(env);
        }
        P2Environment::from_str(&self.p2.environment)
            .map_err(|e| ConfigurationError::invalid("p2gravity.toml", "p2.environment", e))
    }

    pub fn p2_timeout(&self) -> Duration {
        Duration::from_secs(self.p2.timeout_secs)
    }

    pub fn simbad_timeout(&self) -> Duration {
        Duration::from_secs(self.simbad.timeout_secs)
    }
}

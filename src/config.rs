//! Settings for phototrack.
//!
//! Everything has a sensible default, so the config file is optional:
//! a `phototrack.yaml` next to the photos (or passed with `--config`)
//! only needs the keys it wants to change, e.g. a self-hosted Nominatim
//! endpoint or a different rate limit.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the reverse-geocoding service
    pub geocoder_url: String,
    /// User-Agent sent with geocoding requests (Nominatim requires one)
    pub user_agent: String,
    /// Minimum delay after every live geocoding call, in seconds
    pub rate_limit_secs: f64,
    /// Delay after a failed geocoding call, in seconds
    pub error_backoff_secs: f64,
    /// Creator string written into the GPX document
    pub gpx_creator: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geocoder_url: "https://nominatim.openstreetmap.org/".to_string(),
            user_agent: format!("phototrack/{}", env!("CARGO_PKG_VERSION")),
            rate_limit_secs: 1.1,
            error_backoff_secs: 2.0,
            gpx_creator: "phototrack".to_string(),
        }
    }
}

impl Config {
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config = serde_yaml::from_str(&yaml)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        Ok(config)
    }

    /// Loads the config when the file exists, defaults otherwise. An
    /// explicitly passed path must exist.
    pub fn load_or_default(config_arg: &Option<PathBuf>) -> Result<Self> {
        match config_arg {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_path = PathBuf::from("phototrack.yaml");
                if default_path.exists() {
                    Self::load_from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn rate_limit(&self) -> Duration {
        Duration::from_secs_f64(self.rate_limit_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs_f64(self.error_backoff_secs)
    }
}

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const CONFIG_FILE: &str = "medrelay.yaml";

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Service configuration, read from `medrelay.yaml` in the working directory.
/// Every field has a default, so a missing file or a partial file both work;
/// CLI flags and environment variables override whatever is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("medrelay.db")
}

fn default_port() -> u16 {
    8000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("sample_data")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            port: default_port(),
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    /// Load the config file from `dir`, or the defaults if it doesn't exist.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

use crate::error::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Runtime configuration, loaded from `config.toml` when present.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory containing the raw source export files.
    pub data_dir: String,
    /// Directory the CSV/JSON side-channel exports are written to.
    pub output_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: "data/sources".to_string(),
            output_dir: "data/processed".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `config.toml`, falling back to defaults if the
    /// file does not exist.
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";
        if !Path::new(config_path).exists() {
            info!("No config.toml found, using default configuration");
            return Ok(Self::default());
        }
        let config_content = fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }

    pub fn toast_export_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("toast_pos_export.json")
    }

    pub fn doordash_orders_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("doordash_orders.json")
    }

    pub fn square_orders_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("square").join("orders.json")
    }

    pub fn square_catalog_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("square").join("catalog.json")
    }

    pub fn square_locations_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("square").join("locations.json")
    }

    pub fn square_payments_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("square").join("payments.json")
    }
}

mod schema;

pub use schema::Config;

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

pub const API_KEY_ENV: &str = "HOUSE_SCOUT_RAPIDAPI_KEY";

/// Get the config directory path (~/.config/house-scout/)
pub fn get_config_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Could not determine home directory");
    home.join(".config").join("house-scout")
}

/// Get the default config file path (~/.config/house-scout/config.yaml)
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.yaml")
}

/// Where the SQLite databases live unless the config says otherwise.
pub fn get_data_dir(config: &Config) -> PathBuf {
    if let Some(dir) = &config.data_dir {
        return dir.clone();
    }
    dirs::data_local_dir()
        .expect("Could not determine data directory")
        .join("house-scout")
}

/// Load configuration from a YAML file.
///
/// A missing file is not an error: the catalog and scoring commands work
/// without any configuration, so defaults are returned. The environment
/// variable HOUSE_SCOUT_RAPIDAPI_KEY overrides the file's key either way.
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let explicit = path.is_some();
    let config_path = path.unwrap_or_else(get_config_path);

    let mut config = if config_path.exists() {
        let config_content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        serde_saphyr::from_str(&config_content).with_context(|| {
            format!(
                "Failed to parse config: invalid YAML in {}",
                config_path.display()
            )
        })?
    } else if explicit {
        anyhow::bail!("Config file not found at {}", config_path.display());
    } else {
        Config::default()
    };

    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if !key.trim().is_empty() {
            config.rapidapi_key = Some(key);
        }
    }

    Ok(config)
}

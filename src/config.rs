// src/config.rs
use directories::ProjectDirs;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the two store files live. Defaults are plain filenames
/// resolved against the working directory.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub accounts_file: PathBuf,
    pub devices_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            accounts_file: PathBuf::from("accounts.json"),
            devices_file: PathBuf::from("devices.json"),
        }
    }
}

fn get_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "ARemiPro", "ARemiPro")
        .map(|proj_dirs| proj_dirs.config_dir().join("config.toml"))
}

fn save_default_config(config_path: &Path, config: &Config) -> Result<(), String> {
    if let Some(parent_dir) = config_path.parent() {
        if !parent_dir.exists() {
            fs::create_dir_all(parent_dir)
                .map_err(|e| format!("Failed to create config directory {:?}: {}", parent_dir, e))?;
        }
    }
    let toml_string = toml::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize default config to TOML: {}", e))?;
    fs::write(config_path, toml_string)
        .map_err(|e| format!("Failed to write default config to {:?}: {}", config_path, e))?;
    info!("Saved default configuration to {:?}", config_path);
    Ok(())
}

/// Loads the config file, creating it with defaults on first run. Any
/// read or parse failure falls back to the defaults with a warning; a
/// broken config file must not keep the application from starting.
pub fn load_config() -> Config {
    let Some(config_path) = get_config_path() else {
        warn!("Could not determine config directory. Using default configuration.");
        return Config::default();
    };

    if !config_path.exists() {
        info!(
            "Config file not found at {:?}. Creating and using default configuration.",
            config_path
        );
        let default_config = Config::default();
        if let Err(e) = save_default_config(&config_path, &default_config) {
            warn!("Failed to save default configuration: {}", e);
        }
        return default_config;
    }

    match fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(loaded_config) => {
                info!("Configuration loaded from {:?}.", config_path);
                loaded_config
            }
            Err(e) => {
                warn!(
                    "Failed to parse config file at {:?}: {}. Using default configuration.",
                    config_path, e
                );
                Config::default()
            }
        },
        Err(e) => {
            warn!(
                "Failed to read config file at {:?}: {}. Using default configuration.",
                config_path, e
            );
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.accounts_file, PathBuf::from("accounts.json"));
        assert_eq!(config.devices_file, PathBuf::from("devices.json"));
    }

    #[test]
    fn test_save_and_reload_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nested").join("config.toml");

        let default_config = Config::default();
        save_default_config(&config_path, &default_config).unwrap();
        assert!(config_path.exists());

        let content = fs::read_to_string(&config_path).unwrap();
        let loaded: Config = toml::from_str(&content).unwrap();
        assert_eq!(loaded.accounts_file, default_config.accounts_file);
        assert_eq!(loaded.devices_file, default_config.devices_file);
    }

    #[test]
    fn test_invalid_toml_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("invalid.toml");
        fs::write(&config_path, "accounts_file = [this is not toml").unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        let result: Result<Config, _> = toml::from_str(&content);
        assert!(result.is_err());
        // load_config handles this by warning and returning defaults.
    }

    #[test]
    fn test_custom_paths_load() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(
            &config_path,
            "accounts_file = \"/data/users.json\"\ndevices_file = \"/data/inventory.json\"\n",
        )
        .unwrap();

        let loaded: Config = toml::from_str(&fs::read_to_string(&config_path).unwrap()).unwrap();
        assert_eq!(loaded.accounts_file, PathBuf::from("/data/users.json"));
        assert_eq!(loaded.devices_file, PathBuf::from("/data/inventory.json"));
    }
}
